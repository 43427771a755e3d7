use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::accessor::PropertyReference;
use crate::error::Result;
use crate::logging::WarnOnce;
use crate::scheduler::{CallbackScheduler, Phase, TickCallback};
use crate::value::{PropertyValue, ValueKinds};

use super::{AssetDisplay, DEFAULT_PRIORITY, TickBinding, setup_reference};

/// Chooses one of `asset_count` assets from a Boolean, Int32 or Enum property.
///
/// `false`/`true` select assets 0 and 1, an enum selects by the ordinal of its
/// variant (not its numeric value) and an integer selects directly. An
/// out-of-range selection, or an unreadable property, clears the display.
pub struct ImageSwapper {
    name: String,
    property: RefCell<PropertyReference>,
    display: Rc<dyn AssetDisplay>,
    asset_count: Cell<usize>,
    shown: Cell<Option<Option<usize>>>,
    warned: RefCell<WarnOnce>,
    tick: TickBinding,
}

impl ImageSwapper {
    /// Kinds the property may resolve to.
    pub const ACCEPTED: ValueKinds = ValueKinds::BOOLEAN
        .union(ValueKinds::INT32)
        .union(ValueKinds::ENUM);

    /// Create a disabled widget. The property's accepted kinds are narrowed
    /// to [`ACCEPTED`](Self::ACCEPTED).
    pub fn new(
        name: impl Into<String>,
        scheduler: Rc<CallbackScheduler>,
        mut property: PropertyReference,
        display: Rc<dyn AssetDisplay>,
        asset_count: usize,
    ) -> Rc<Self> {
        property.set_accepted_kinds(property.accepted_kinds() & Self::ACCEPTED);
        Rc::new(Self {
            name: name.into(),
            property: RefCell::new(property),
            display,
            asset_count: Cell::new(asset_count),
            shown: Cell::new(None),
            warned: RefCell::new(WarnOnce::new()),
            tick: TickBinding::new(scheduler, Phase::Update, DEFAULT_PRIORITY),
        })
    }

    /// Replace the property. Re-runs setup when enabled.
    pub fn set_property(&self, mut property: PropertyReference) {
        property.set_accepted_kinds(property.accepted_kinds() & Self::ACCEPTED);
        *self.property.borrow_mut() = property;
        self.shown.set(None);
        if self.tick.is_enabled() {
            self.refresh();
        }
    }

    /// Change the number of available assets.
    pub fn set_asset_count(&self, asset_count: usize) {
        self.asset_count.set(asset_count);
    }

    /// The asset index last pushed to the display, if any push happened.
    pub fn shown(&self) -> Option<Option<usize>> {
        self.shown.get()
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
        self.shown.set(None);
        let callback: Rc<dyn TickCallback> = self.clone();
        self.tick.attach(&callback);
    }

    /// Stop updating.
    pub fn disable(self: &Rc<Self>) {
        let callback: Rc<dyn TickCallback> = self.clone();
        self.tick.detach(&callback);
    }

    /// The asset index the property currently selects.
    pub fn selected_index(&self) -> Option<usize> {
        let index = match self.property.borrow().try_get_value()? {
            PropertyValue::Boolean(value) => usize::from(value),
            PropertyValue::Int32(value) => usize::try_from(value).ok()?,
            PropertyValue::Enum(value) => value.ordinal()?,
            _ => return None,
        };
        (index < self.asset_count.get()).then_some(index)
    }

    /// Push the current selection to the display if it changed.
    pub fn update(&self) {
        if !self.display.is_active() {
            return;
        }
        let index = self.selected_index();
        if self.shown.get() != Some(index) {
            self.shown.set(Some(index));
            self.display.set_displayed_asset(index);
        }
    }
}

impl TickCallback for ImageSwapper {
    fn on_tick(&self) -> Result<()> {
        self.update();
        Ok(())
    }
}

impl fmt::Debug for ImageSwapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSwapper")
            .field("name", &self.name)
            .field("property", &*self.property.borrow())
            .field("asset_count", &self.asset_count.get())
            .field("shown", &self.shown.get())
            .finish()
    }
}
