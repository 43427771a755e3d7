use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::accessor::PropertyReference;
use crate::error::Result;
use crate::format::format_value;
use crate::logging::WarnOnce;
use crate::scheduler::{CallbackScheduler, Phase, TickCallback};

use super::{DEFAULT_PRIORITY, TextDisplay, TickBinding, setup_reference};

/// Shows a property as text: `prefix + formatted value + suffix`.
///
/// The value is formatted with [`format_value`] and the configured format
/// code. An unreadable property shows an empty string, without prefix or
/// suffix.
pub struct TextFormatter {
    name: String,
    property: RefCell<PropertyReference>,
    display: Rc<dyn TextDisplay>,
    format: RefCell<String>,
    prefix: RefCell<String>,
    suffix: RefCell<String>,
    shown: RefCell<Option<String>>,
    warned: RefCell<WarnOnce>,
    tick: TickBinding,
}

impl TextFormatter {
    /// Create a disabled widget with no format, prefix or suffix.
    pub fn new(
        name: impl Into<String>,
        scheduler: Rc<CallbackScheduler>,
        property: PropertyReference,
        display: Rc<dyn TextDisplay>,
    ) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            property: RefCell::new(property),
            display,
            format: RefCell::new(String::new()),
            prefix: RefCell::new(String::new()),
            suffix: RefCell::new(String::new()),
            shown: RefCell::new(None),
            warned: RefCell::new(WarnOnce::new()),
            tick: TickBinding::new(scheduler, Phase::Update, DEFAULT_PRIORITY),
        })
    }

    /// Set the format code, such as `"F2"` or `"N0"`.
    pub fn set_format(&self, format: impl Into<String>) {
        *self.format.borrow_mut() = format.into();
    }

    /// Set the text shown before the value.
    pub fn set_prefix(&self, prefix: impl Into<String>) {
        *self.prefix.borrow_mut() = prefix.into();
    }

    /// Set the text shown after the value.
    pub fn set_suffix(&self, suffix: impl Into<String>) {
        *self.suffix.borrow_mut() = suffix.into();
    }

    /// Replace the property. Re-runs setup when enabled.
    pub fn set_property(&self, property: PropertyReference) {
        *self.property.borrow_mut() = property;
        if self.tick.is_enabled() {
            self.refresh();
        }
    }

    /// The text last pushed to the display.
    pub fn shown(&self) -> Option<String> {
        self.shown.borrow().clone()
    }

    /// Run setup again, for example after the target's members changed.
    pub fn refresh(&self) {
        setup_reference(&self.name, "property", &self.property.borrow(), &self.warned);
    }

    /// Returns true while registered with the scheduler.
    pub fn is_enabled(&self) -> bool {
        self.tick.is_enabled()
    }

    /// Set up the property and start updating each tick. The next tick
    /// always pushes to the display.
    pub fn enable(self: &Rc<Self>) {
        self.refresh();
        self.shown.replace(None);
        let callback: Rc<dyn TickCallback> = self.clone();
        self.tick.attach(&callback);
    }

    /// Stop updating.
    pub fn disable(self: &Rc<Self>) {
        let callback: Rc<dyn TickCallback> = self.clone();
        self.tick.detach(&callback);
    }

    /// The text the property currently produces.
    pub fn text(&self) -> String {
        let Some(value) = self.property.borrow().try_get_value() else {
            return String::new();
        };
        format!(
            "{}{}{}",
            self.prefix.borrow(),
            format_value(Some(&value), &self.format.borrow()),
            self.suffix.borrow()
        )
    }

    /// Push the current text to the display if it changed.
    pub fn update(&self) {
        if !self.display.is_active() {
            return;
        }
        let text = self.text();
        if self.shown.borrow().as_deref() == Some(text.as_str()) {
            return;
        }
        self.display.set_displayed_text(&text);
        self.shown.replace(Some(text));
    }
}

impl TickCallback for TextFormatter {
    fn on_tick(&self) -> Result<()> {
        self.update();
        Ok(())
    }
}

impl fmt::Debug for TextFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextFormatter")
            .field("name", &self.name)
            .field("property", &*self.property.borrow())
            .field("format", &*self.format.borrow())
            .field("shown", &*self.shown.borrow())
            .finish()
    }
}
