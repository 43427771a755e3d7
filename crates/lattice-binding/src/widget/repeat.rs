use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::accessor::PropertyReference;
use crate::error::Result;
use crate::logging::{WarnOnce, targets};
use crate::preferences::{PreferenceStore, RepeatTiming};
use crate::scheduler::{CallbackScheduler, Phase, TickCallback};
use crate::signal::Signal;

use super::{Clock, DEFAULT_PRIORITY, TickBinding, setup_reference};

/// Fires repeatedly while a Boolean "held" property stays true.
///
/// [`fired`](Self::fired) is emitted with the repeat count: `0` on the tick
/// the property becomes true, then `1, 2, ...` after [`RepeatTiming::delay`]
/// and every [`RepeatTiming::interval`] after that. At most one emission
/// happens per tick.
pub struct RepeatTrigger {
    name: String,
    held: RefCell<PropertyReference>,
    timing: Cell<RepeatTiming>,
    clock: Rc<dyn Clock>,
    next_fire: Cell<Option<Duration>>,
    count: Cell<u32>,
    fired: Signal<u32>,
    warned: RefCell<WarnOnce>,
    tick: TickBinding,
}

impl RepeatTrigger {
    /// Create a disabled trigger.
    pub fn new(
        name: impl Into<String>,
        scheduler: Rc<CallbackScheduler>,
        held: PropertyReference,
        timing: RepeatTiming,
        clock: Rc<dyn Clock>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            held: RefCell::new(held),
            timing: Cell::new(timing),
            clock,
            next_fire: Cell::new(None),
            count: Cell::new(0),
            fired: Signal::new(),
            warned: RefCell::new(WarnOnce::new()),
            tick: TickBinding::new(scheduler, Phase::Update, DEFAULT_PRIORITY),
        })
    }

    /// Create a disabled trigger with timing read from `store`.
    pub fn from_preferences(
        name: impl Into<String>,
        scheduler: Rc<CallbackScheduler>,
        held: PropertyReference,
        store: &(impl PreferenceStore + ?Sized),
        clock: Rc<dyn Clock>,
    ) -> Rc<Self> {
        Self::new(name, scheduler, held, RepeatTiming::from_store(store), clock)
    }

    /// Emitted with the repeat count each time the trigger fires.
    pub fn fired(&self) -> &Signal<u32> {
        &self.fired
    }

    /// The current timing.
    pub fn timing(&self) -> RepeatTiming {
        self.timing.get()
    }

    /// Replace the timing. Takes effect from the next repeat.
    pub fn set_timing(&self, timing: RepeatTiming) {
        self.timing.set(timing);
    }

    /// Returns true while the held property is true and the trigger is armed.
    pub fn is_repeating(&self) -> bool {
        self.next_fire.get().is_some()
    }

    /// Run setup again, for example after the target's members changed.
    pub fn refresh(&self) {
        setup_reference(&self.name, "held", &self.held.borrow(), &self.warned);
    }

    /// Returns true while registered with the scheduler.
    pub fn is_enabled(&self) -> bool {
        self.tick.is_enabled()
    }

    /// Set up the property and start polling each tick.
    pub fn enable(self: &Rc<Self>) {
        self.refresh();
        self.release();
        let callback: Rc<dyn TickCallback> = self.clone();
        self.tick.attach(&callback);
    }

    /// Stop polling. A held input must be released and pressed again.
    pub fn disable(self: &Rc<Self>) {
        let callback: Rc<dyn TickCallback> = self.clone();
        self.tick.detach(&callback);
        self.release();
    }

    /// Poll the held property once.
    pub fn update(&self) {
        let held = self.held.borrow().try_get::<bool>().unwrap_or(false);
        if !held {
            self.release();
            return;
        }

        let now = self.clock.now();
        let timing = self.timing.get();
        match self.next_fire.get() {
            None => {
                self.next_fire
                    .set(Some(now.saturating_add(timing.delay_duration())));
                self.fire();
            }
            Some(due) if now >= due => {
                let interval = timing.interval_duration();
                let next = due.saturating_add(interval);
                self.next_fire.set(Some(if next > now {
                    next
                } else {
                    now.saturating_add(interval)
                }));
                self.fire();
            }
            Some(_) => {}
        }
    }

    fn fire(&self) {
        let count = self.count.get();
        self.count.set(count.saturating_add(1));
        tracing::trace!(target: targets::WIDGET, widget = %self.name, count, "repeat fired");
        self.fired.emit(count);
    }

    fn release(&self) {
        self.next_fire.set(None);
        self.count.set(0);
    }
}

impl TickCallback for RepeatTrigger {
    fn on_tick(&self) -> Result<()> {
        self.update();
        Ok(())
    }
}

impl fmt::Debug for RepeatTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeatTrigger")
            .field("name", &self.name)
            .field("held", &*self.held.borrow())
            .field("timing", &self.timing.get())
            .field("next_fire", &self.next_fire.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::Preferences;
    use crate::property::PropertyObject;
    use crate::value::ValueKinds;
    use crate::widget::ManualClock;

    struct Harness {
        scheduler: Rc<CallbackScheduler>,
        clock: Rc<ManualClock>,
        target: Rc<PropertyObject>,
        fired: Rc<RefCell<Vec<(u128, u32)>>>,
        trigger: Rc<RepeatTrigger>,
    }

    impl Harness {
        fn new() -> Self {
            let scheduler = Rc::new(CallbackScheduler::new());
            let clock = Rc::new(ManualClock::new());
            let target = PropertyObject::new("pad", "Gamepad");
            target.add_value("down", false);

            let prefs = Preferences::new();
            prefs.set_float(RepeatTiming::DELAY_KEY, 0.5);
            prefs.set_float(RepeatTiming::INTERVAL_KEY, 0.1);
            let trigger = RepeatTrigger::from_preferences(
                "scroll",
                scheduler.clone(),
                PropertyReference::with_target(target.clone(), "down", ValueKinds::BOOLEAN),
                &prefs,
                clock.clone(),
            );

            let fired = Rc::new(RefCell::new(Vec::new()));
            let log = fired.clone();
            let time = clock.clone();
            trigger
                .fired()
                .connect(move |count| log.borrow_mut().push((time.now().as_millis(), *count)));
            trigger.enable();

            Self {
                scheduler,
                clock,
                target,
                fired,
                trigger,
            }
        }

        fn tick_at(&self, millis: u64) {
            self.clock.set(Duration::from_millis(millis));
            self.scheduler.tick();
        }

        fn fired(&self) -> Vec<(u128, u32)> {
            self.fired.borrow().clone()
        }
    }

    #[test]
    fn test_press_delay_then_interval() {
        let h = Harness::new();
        h.tick_at(0);
        assert!(h.fired().is_empty());

        h.target.set("down", true).unwrap();
        for millis in [100, 300, 599, 600, 650, 700, 799, 800] {
            h.tick_at(millis);
        }
        assert_eq!(h.fired(), vec![(100, 0), (600, 1), (700, 2), (800, 3)]);
        assert!(h.trigger.is_repeating());
    }

    #[test]
    fn test_release_resets() {
        let h = Harness::new();
        h.target.set("down", true).unwrap();
        h.tick_at(0);
        h.tick_at(500);
        h.target.set("down", false).unwrap();
        h.tick_at(550);
        assert!(!h.trigger.is_repeating());

        h.target.set("down", true).unwrap();
        h.tick_at(560);
        h.tick_at(1000);
        assert_eq!(h.fired(), vec![(0, 0), (500, 1), (560, 0)]);
    }

    #[test]
    fn test_long_frame_fires_once() {
        let h = Harness::new();
        h.target.set("down", true).unwrap();
        h.tick_at(0);
        h.tick_at(2000);
        h.tick_at(2050);
        h.tick_at(2100);
        assert_eq!(h.fired(), vec![(0, 0), (2000, 1), (2100, 2)]);
    }

    #[test]
    fn test_disable_releases() {
        let h = Harness::new();
        h.target.set("down", true).unwrap();
        h.tick_at(0);
        h.trigger.disable();
        assert!(!h.trigger.is_repeating());
        h.tick_at(600);
        assert_eq!(h.fired(), vec![(0, 0)]);
    }

    #[test]
    fn test_oversized_timing_falls_back_to_defaults() {
        let scheduler = Rc::new(CallbackScheduler::new());
        let clock = Rc::new(ManualClock::new());
        let target = PropertyObject::new("pad", "Gamepad");
        target.add_value("down", true);

        let prefs = Preferences::from_toml_str("[input.repeat]\ndelay = 1e20\n").unwrap();
        let trigger = RepeatTrigger::from_preferences(
            "scroll",
            scheduler.clone(),
            PropertyReference::with_target(target.clone(), "down", ValueKinds::BOOLEAN),
            &prefs,
            clock.clone(),
        );
        assert_eq!(trigger.timing(), RepeatTiming::default());

        let fired = Rc::new(Cell::new(0));
        let count = fired.clone();
        trigger.fired().connect(move |_| count.set(count.get() + 1));
        trigger.enable();

        let report = scheduler.tick();
        assert_eq!(report.failed, 0);
        clock.set(Duration::from_millis(500));
        scheduler.tick();
        assert_eq!(fired.get(), 2);
        trigger.disable();
    }

    #[test]
    fn test_oversized_timing_set_directly_does_not_panic() {
        let scheduler = Rc::new(CallbackScheduler::new());
        let clock = Rc::new(ManualClock::new());
        let target = PropertyObject::new("pad", "Gamepad");
        target.add_value("down", true);
        let trigger = RepeatTrigger::new(
            "scroll",
            scheduler.clone(),
            PropertyReference::with_target(target.clone(), "down", ValueKinds::BOOLEAN),
            RepeatTiming {
                delay: 1e20,
                interval: f64::MAX,
            },
            clock.clone(),
        );
        trigger.enable();

        assert_eq!(scheduler.tick().failed, 0);
        clock.set(RepeatTiming::default().delay_duration());
        assert_eq!(scheduler.tick().failed, 0);
        assert!(trigger.is_repeating());
        trigger.disable();
    }
}
