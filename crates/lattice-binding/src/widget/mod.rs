//! Thin widget glue driven by the scheduler.
//!
//! Widgets read values through [`PropertyReference`]s each tick and push the
//! derived state to host-provided sinks. They are `Rc`-owned: `enable`
//! registers the widget with its [`CallbackScheduler`] and `disable` removes
//! it. While enabled the scheduler holds a strong reference, so a widget must
//! be disabled before it can be dropped.
//!
//! Every widget invalidates its property references on enable and reports
//! invalid configuration once, then degrades to a cleared display (or a
//! `false` condition) until reconfigured.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::accessor::PropertyReference;
use crate::logging::{WarnOnce, targets};
use crate::scheduler::{CallbackScheduler, Phase, TickCallback};

mod condition;
mod image;
mod repeat;
mod text;

pub use condition::ConditionWidget;
pub use image::ImageSwapper;
pub use repeat::RepeatTrigger;
pub use text::TextFormatter;

/// Default priority of visual widgets. Condition widgets run earlier.
pub const DEFAULT_PRIORITY: i32 = 0;

/// A host widget that shows one of several assets (sprites, icons).
pub trait AssetDisplay {
    /// Whether the widget is currently visible. Inactive displays are not
    /// updated.
    fn is_active(&self) -> bool;
    /// Show the asset at `index`, or nothing.
    fn set_displayed_asset(&self, index: Option<usize>);
}

/// A host widget that shows a line of text.
pub trait TextDisplay {
    /// Whether the widget is currently visible. Inactive displays are not
    /// updated.
    fn is_active(&self) -> bool;
    /// Replace the displayed text.
    fn set_displayed_text(&self, text: &str);
}

/// A monotonic time source.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// [`Clock`] backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Start a clock at zero.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// [`Clock`] advanced by hand, for hosts with their own frame time.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
}

impl ManualClock {
    /// Create a clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    /// Set the current time.
    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Scheduler registration state shared by all widgets.
pub(crate) struct TickBinding {
    scheduler: Rc<CallbackScheduler>,
    phase: Phase,
    priority: Cell<i32>,
    enabled: Cell<bool>,
}

impl TickBinding {
    pub(crate) fn new(scheduler: Rc<CallbackScheduler>, phase: Phase, priority: i32) -> Self {
        Self {
            scheduler,
            phase,
            priority: Cell::new(priority),
            enabled: Cell::new(false),
        }
    }

    pub(crate) fn attach(&self, callback: &Rc<dyn TickCallback>) {
        self.scheduler
            .register(self.phase, self.priority.get(), callback);
        self.enabled.set(true);
    }

    pub(crate) fn detach(&self, callback: &Rc<dyn TickCallback>) {
        self.scheduler.remove(self.phase, self.priority.get(), callback);
        self.enabled.set(false);
    }

    /// Change the priority, moving an active registration along.
    pub(crate) fn set_priority(&self, priority: i32, callback: &Rc<dyn TickCallback>) {
        if self.enabled.get() {
            self.scheduler.remove(self.phase, self.priority.get(), callback);
            self.scheduler.register(self.phase, priority, callback);
        }
        self.priority.set(priority);
    }

    pub(crate) fn priority(&self) -> i32 {
        self.priority.get()
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.get()
    }
}

/// Invalidate `reference` and warn once if it does not resolve.
///
/// Returns true if the reference is valid.
pub(crate) fn setup_reference(
    widget: &str,
    role: &str,
    reference: &PropertyReference,
    warned: &RefCell<WarnOnce>,
) -> bool {
    reference.invalidate();
    let Some(reason) = reference.invalid_reason() else {
        return true;
    };
    let key = format!("{role}:{}:{reason}", reference.describe());
    if warned.borrow_mut().first(key) {
        tracing::warn!(
            target: targets::WIDGET,
            widget,
            role,
            property = %reference.describe(),
            %reason,
            "widget property is not usable"
        );
    }
    false
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyObject;
    use crate::value::ValueKinds;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_millis(250));
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_millis(500));
        clock.set(Duration::ZERO);
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn test_setup_reference_warns_once() {
        let target = PropertyObject::new("hud", "Hud");
        target.add_value("label", "x");
        let warned = RefCell::new(WarnOnce::new());

        let bad = PropertyReference::with_target(target.clone(), "label", ValueKinds::BOOLEAN);
        assert!(!setup_reference("icon", "property", &bad, &warned));
        assert!(!setup_reference("icon", "property", &bad, &warned));
        assert_eq!(warned.borrow().len(), 1);

        let good = PropertyReference::with_target(target, "label", ValueKinds::STRING);
        assert!(setup_reference("icon", "property", &good, &warned));
    }

    #[test]
    fn test_tick_binding_moves_registration() {
        let scheduler = Rc::new(CallbackScheduler::new());
        let callback: Rc<dyn TickCallback> = Rc::new(|| -> crate::Result<()> { Ok(()) });
        let binding = TickBinding::new(scheduler.clone(), Phase::Update, 0);

        binding.set_priority(3, &callback);
        assert!(scheduler.is_empty());

        binding.attach(&callback);
        binding.set_priority(5, &callback);
        assert!(scheduler.contains(Phase::Update, 5, &callback));
        assert!(!scheduler.contains(Phase::Update, 3, &callback));
        assert_eq!(binding.priority(), 5);

        binding.detach(&callback);
        assert!(!binding.is_enabled());
        assert!(scheduler.is_empty());
    }
}
