use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::accessor::PropertyReference;
use crate::condition::Condition;
use crate::error::Result;
use crate::logging::{WarnOnce, targets};
use crate::scheduler::{CallbackScheduler, Phase, TickCallback};
use crate::signal::Signal;

use super::{TickBinding, setup_reference};

/// Evaluates a [`Condition`] every tick and publishes transitions.
///
/// When the result changes, the optional Boolean output property is written
/// and [`changed`](Self::changed) is emitted with the *previous* value. Runs
/// at priority [`ConditionWidget::DEFAULT_PRIORITY`] so that visual widgets
/// reading its output see the value of the same tick.
pub struct ConditionWidget {
    name: String,
    condition: RefCell<Condition>,
    output: RefCell<Option<PropertyReference>>,
    value: Cell<bool>,
    changed: Signal<bool>,
    warned: RefCell<WarnOnce>,
    tick: TickBinding,
}

impl ConditionWidget {
    /// Priority used unless changed with [`set_priority`](Self::set_priority).
    pub const DEFAULT_PRIORITY: i32 = -10;

    /// Create a disabled widget.
    pub fn new(
        name: impl Into<String>,
        scheduler: Rc<CallbackScheduler>,
        condition: Condition,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            condition: RefCell::new(condition),
            output: RefCell::new(None),
            value: Cell::new(false),
            changed: Signal::new(),
            warned: RefCell::new(WarnOnce::new()),
            tick: TickBinding::new(scheduler, Phase::Update, Self::DEFAULT_PRIORITY),
        })
    }

    /// The widget's name, used as the configuration context in warnings.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The last evaluated result.
    pub fn value(&self) -> bool {
        self.value.get()
    }

    /// Emitted with the previous value whenever the result flips.
    pub fn changed(&self) -> &Signal<bool> {
        &self.changed
    }

    /// Set the Boolean property the result is written to.
    pub fn set_output(&self, output: Option<PropertyReference>) {
        *self.output.borrow_mut() = output;
        if self.tick.is_enabled() {
            self.setup_output();
        }
    }

    /// Replace the condition. Re-runs setup when enabled.
    pub fn set_condition(&self, condition: Condition) {
        *self.condition.borrow_mut() = condition;
        if self.tick.is_enabled() {
            self.condition.borrow_mut().setup(&self.name);
        }
    }

    /// Edit the condition in place. Re-runs setup when enabled.
    pub fn edit_condition<R>(&self, edit: impl FnOnce(&mut Condition) -> R) -> R {
        let result = edit(&mut self.condition.borrow_mut());
        if self.tick.is_enabled() {
            self.condition.borrow_mut().setup(&self.name);
        }
        result
    }

    /// Run setup again, for example after the target's members changed.
    pub fn refresh(&self) {
        self.condition.borrow_mut().setup(&self.name);
        self.setup_output();
    }

    /// The scheduling priority.
    pub fn priority(&self) -> i32 {
        self.tick.priority()
    }

    /// Change the scheduling priority.
    pub fn set_priority(self: &Rc<Self>, priority: i32) {
        let callback: Rc<dyn TickCallback> = self.clone();
        self.tick.set_priority(priority, &callback);
    }

    /// Returns true while registered with the scheduler.
    pub fn is_enabled(&self) -> bool {
        self.tick.is_enabled()
    }

    /// Set up every reference and start evaluating each tick.
    pub fn enable(self: &Rc<Self>) {
        self.refresh();
        let callback: Rc<dyn TickCallback> = self.clone();
        self.tick.attach(&callback);
    }

    /// Stop evaluating. The last value is kept.
    pub fn disable(self: &Rc<Self>) {
        let callback: Rc<dyn TickCallback> = self.clone();
        self.tick.detach(&callback);
    }

    /// Evaluate once, publishing a transition if there is one. Returns the
    /// new value.
    pub fn evaluate(&self) -> bool {
        let value = self.condition.borrow().evaluate();
        let previous = self.value.replace(value);
        if value != previous {
            if let Some(output) = &*self.output.borrow() {
                output.set_value(value);
            }
            tracing::trace!(target: targets::WIDGET, widget = %self.name, value, "condition changed");
            self.changed.emit(previous);
        }
        value
    }

    fn setup_output(&self) {
        if let Some(output) = &*self.output.borrow() {
            setup_reference(&self.name, "output", output, &self.warned);
        }
    }
}

impl TickCallback for ConditionWidget {
    fn on_tick(&self) -> Result<()> {
        self.evaluate();
        Ok(())
    }
}

impl fmt::Debug for ConditionWidget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionWidget")
            .field("name", &self.name)
            .field("value", &self.value.get())
            .field("enabled", &self.tick.is_enabled())
            .field("priority", &self.tick.priority())
            .finish()
    }
}
