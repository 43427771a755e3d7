//! Target objects and the members they expose.
//!
//! A target is anything implementing [`PropertyTarget`]: it has a type name
//! and resolves member paths to [`Member`] handles. Handles are what a
//! [`crate::PropertyReference`] caches after resolution, so a resolved
//! reference keeps reading the member it found even if the target later
//! removes or replaces it. Invalidate the reference to pick up such changes.
//!
//! [`PropertyObject`] is the stock target: a named object with value slots,
//! computed members and nested child objects.
//!
//! # Example
//!
//! ```
//! use lattice_binding::property::PropertyObject;
//!
//! let player = PropertyObject::new("player", "Player");
//! player.add_value("health", 100);
//! let audio = PropertyObject::new("audio", "AudioSettings");
//! audio.add_value("muted", false);
//! player.add_child("audio", audio);
//!
//! assert_eq!(player.get("audio.muted").and_then(|v| v.as_bool()), Some(false));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use parking_lot::RwLock;

use crate::error::PropertyError;
use crate::signal::Signal;
use crate::value::{PropertyValue, ValueKind};

/// A value cell that reports whether writes changed it.
///
/// `set()` compares the new value with the current one and returns whether the
/// value actually changed, so callers only notify on real transitions.
///
/// ```
/// use lattice_binding::property::Property;
///
/// let prop = Property::new(42);
/// assert!(!prop.set(42));
/// assert!(prop.set(100));
/// assert_eq!(prop.get(), 100);
/// ```
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Set the value without change detection.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }

    /// Set the value, returning the old value if it changed.
    pub fn replace(&self, value: T) -> Option<T> {
        let mut current = self.value.write();
        if *current != value {
            Some(std::mem::replace(&mut *current, value))
        } else {
            None
        }
    }
}

impl<T: Clone + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}

/// A readable (and possibly writable) value exposed by a target.
pub trait Member {
    /// The kind of value this member holds. Must not change over its lifetime.
    fn kind(&self) -> ValueKind;

    /// Read the current value.
    fn get(&self) -> PropertyValue;

    /// Write a value. Returns `Ok(true)` if the stored value changed.
    fn set(&self, value: PropertyValue) -> Result<bool, PropertyError>;

    /// Returns true if [`set`](Self::set) always fails.
    fn is_read_only(&self) -> bool {
        false
    }
}

/// Something that exposes members by path.
pub trait PropertyTarget {
    /// The target's current type name.
    fn type_name(&self) -> String;

    /// Resolve a member path.
    fn find_member(&self, path: &str) -> Option<Rc<dyn Member>>;
}

/// A stored value of a fixed kind.
pub struct PropertySlot {
    name: String,
    kind: ValueKind,
    value: Property<PropertyValue>,
    read_only: bool,
}

impl PropertySlot {
    /// Create a writable slot holding `initial`. The slot's kind is the
    /// initial value's kind.
    pub fn new(name: impl Into<String>, initial: impl Into<PropertyValue>) -> Self {
        let initial = initial.into();
        Self {
            name: name.into(),
            kind: initial.kind(),
            value: Property::new(initial),
            read_only: false,
        }
    }

    /// Create a slot that rejects writes through [`Member::set`].
    pub fn read_only(name: impl Into<String>, initial: impl Into<PropertyValue>) -> Self {
        Self {
            read_only: true,
            ..Self::new(name, initial)
        }
    }

    /// The slot's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the value from the owning side, bypassing the read-only flag.
    pub fn store(&self, value: impl Into<PropertyValue>) -> Result<bool, PropertyError> {
        let value = value.into();
        self.check_kind(&value)?;
        Ok(self.value.set(value))
    }

    fn check_kind(&self, value: &PropertyValue) -> Result<(), PropertyError> {
        if value.kind() != self.kind {
            return Err(PropertyError::TypeMismatch {
                expected: self.kind,
                got: value.kind(),
            });
        }
        if let (PropertyValue::Enum(current), PropertyValue::Enum(new)) =
            (&self.value.get(), value)
        {
            if !current.same_type(new) {
                return Err(PropertyError::UnknownVariant {
                    enum_name: current.enum_type().name().to_string(),
                    variant: new.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Member for PropertySlot {
    fn kind(&self) -> ValueKind {
        self.kind
    }

    fn get(&self) -> PropertyValue {
        self.value.get()
    }

    fn set(&self, value: PropertyValue) -> Result<bool, PropertyError> {
        if self.read_only {
            return Err(PropertyError::ReadOnly {
                path: self.name.clone(),
            });
        }
        self.check_kind(&value)?;
        Ok(self.value.set(value))
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl fmt::Debug for PropertySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySlot")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &self.value.get())
            .field("read_only", &self.read_only)
            .finish()
    }
}

type Getter = Box<dyn Fn() -> PropertyValue>;
type Setter = Box<dyn Fn(PropertyValue) -> Result<bool, PropertyError>>;

/// A member backed by closures, for values derived from other state.
pub struct ComputedMember {
    kind: ValueKind,
    getter: Getter,
    setter: Option<Setter>,
}

impl ComputedMember {
    /// A read-only computed member.
    pub fn new<G>(kind: ValueKind, getter: G) -> Self
    where
        G: Fn() -> PropertyValue + 'static,
    {
        Self {
            kind,
            getter: Box::new(getter),
            setter: None,
        }
    }

    /// Attach a setter.
    pub fn with_setter<S>(mut self, setter: S) -> Self
    where
        S: Fn(PropertyValue) -> Result<bool, PropertyError> + 'static,
    {
        self.setter = Some(Box::new(setter));
        self
    }
}

impl Member for ComputedMember {
    fn kind(&self) -> ValueKind {
        self.kind
    }

    fn get(&self) -> PropertyValue {
        (self.getter)()
    }

    fn set(&self, value: PropertyValue) -> Result<bool, PropertyError> {
        let Some(setter) = &self.setter else {
            return Err(PropertyError::ReadOnly {
                path: String::from("<computed>"),
            });
        };
        if value.kind() != self.kind {
            return Err(PropertyError::TypeMismatch {
                expected: self.kind,
                got: value.kind(),
            });
        }
        setter(value)
    }

    fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }
}

/// A named, typed object exposing members and child objects.
///
/// Paths use `.` or `/` separators; every segment but the last names a child
/// object. Structural edits emit [`structure_changed`](Self::structure_changed)
/// with the affected path so that bound widgets can re-run their setup.
pub struct PropertyObject {
    name: String,
    type_name: RefCell<String>,
    members: RefCell<HashMap<String, Rc<dyn Member>>>,
    children: RefCell<HashMap<String, Rc<PropertyObject>>>,
    structure_changed: Signal<String>,
}

impl PropertyObject {
    /// Create an empty object.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            name: name.into(),
            type_name: RefCell::new(type_name.into()),
            members: RefCell::new(HashMap::new()),
            children: RefCell::new(HashMap::new()),
            structure_changed: Signal::new(),
        })
    }

    /// The object's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Emitted with a path after members, children or the type change.
    pub fn structure_changed(&self) -> &Signal<String> {
        &self.structure_changed
    }

    /// Change the type name.
    pub fn set_type_name(&self, type_name: impl Into<String>) {
        *self.type_name.borrow_mut() = type_name.into();
        self.structure_changed.emit(String::new());
    }

    /// Add (or replace) a writable value slot and return it.
    pub fn add_value(
        &self,
        name: impl Into<String>,
        initial: impl Into<PropertyValue>,
    ) -> Rc<PropertySlot> {
        let name = name.into();
        let slot = Rc::new(PropertySlot::new(name.clone(), initial));
        self.add_member(name, slot.clone());
        slot
    }

    /// Add (or replace) an arbitrary member.
    pub fn add_member(&self, name: impl Into<String>, member: Rc<dyn Member>) {
        let name = name.into();
        self.members.borrow_mut().insert(name.clone(), member);
        self.structure_changed.emit(name);
    }

    /// Remove a member.
    pub fn remove_member(&self, name: &str) -> Option<Rc<dyn Member>> {
        let removed = self.members.borrow_mut().remove(name);
        if removed.is_some() {
            self.structure_changed.emit(name.to_string());
        }
        removed
    }

    /// Attach (or replace) a child object.
    pub fn add_child(&self, name: impl Into<String>, child: Rc<PropertyObject>) {
        let name = name.into();
        self.children.borrow_mut().insert(name.clone(), child);
        self.structure_changed.emit(name);
    }

    /// Detach a child object.
    pub fn remove_child(&self, name: &str) -> Option<Rc<PropertyObject>> {
        let removed = self.children.borrow_mut().remove(name);
        if removed.is_some() {
            self.structure_changed.emit(name.to_string());
        }
        removed
    }

    /// Look up a direct child.
    pub fn child(&self, name: &str) -> Option<Rc<PropertyObject>> {
        self.children.borrow().get(name).cloned()
    }

    /// Names of the direct members.
    pub fn member_names(&self) -> Vec<String> {
        self.members.borrow().keys().cloned().collect()
    }

    /// Read a value by path.
    pub fn get(&self, path: &str) -> Option<PropertyValue> {
        self.find_member(path).map(|m| m.get())
    }

    /// Write a value by path.
    pub fn set(&self, path: &str, value: impl Into<PropertyValue>) -> Result<bool, PropertyError> {
        let member = self.find_member(path).ok_or_else(|| PropertyError::NotFound {
            path: path.to_string(),
        })?;
        member.set(value.into())
    }

    fn parse_path(path: &str) -> Vec<&str> {
        path.split(['.', '/']).filter(|s| !s.is_empty()).collect()
    }

    fn resolve(&self, parts: &[&str]) -> Option<Rc<dyn Member>> {
        match parts {
            [] => None,
            [last] => self.members.borrow().get(*last).cloned(),
            [first, rest @ ..] => {
                let child = self.children.borrow().get(*first).cloned()?;
                child.resolve(rest)
            }
        }
    }
}

impl PropertyTarget for PropertyObject {
    fn type_name(&self) -> String {
        self.type_name.borrow().clone()
    }

    fn find_member(&self, path: &str) -> Option<Rc<dyn Member>> {
        self.resolve(&Self::parse_path(path))
    }
}

impl fmt::Debug for PropertyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyObject")
            .field("name", &self.name)
            .field("type_name", &*self.type_name.borrow())
            .field("members", &self.members.borrow().len())
            .field("children", &self.children.borrow().len())
            .finish()
    }
}
