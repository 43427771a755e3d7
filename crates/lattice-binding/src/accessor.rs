//! Late-bound, typed references to a property on a target object.
//!
//! A [`PropertyReference`] names a target, a member path on that target and the
//! set of value kinds its owner can consume. Resolving the path is assumed to
//! be far more expensive than reading a cached member handle, so resolution is
//! lazy and cached:
//!
//! ```text
//!              invalidate()                  first query
//!   (any) ─────────────────► Unresolved ─────────────────► Valid(kind, member)
//!                                         └──────────────► Invalid(reason)
//! ```
//!
//! The cached state is never refreshed implicitly. Owners call
//! [`invalidate`](PropertyReference::invalidate) whenever the target, its type
//! or its member set may have changed (typically on enable and on external
//! change notifications) and then query as often as they like.
//!
//! All queries degrade to `None`/`false` on an empty, invalid or mistyped
//! reference. None of them panic or return errors.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::comparison::Comparison;
use crate::logging::targets;
use crate::property::{Member, PropertyTarget};
use crate::value::{PropertyType, PropertyValue, ValueKind, ValueKinds};

/// Why a reference failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// No target or no path is configured.
    Empty,
    /// The path does not resolve on the target.
    MissingMember,
    /// The member's kind is not in the accepted set.
    KindNotAccepted(ValueKind),
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::Empty => write!(f, "no target or path configured"),
            InvalidReason::MissingMember => write!(f, "path does not resolve"),
            InvalidReason::KindNotAccepted(kind) => write!(f, "{kind} values are not accepted"),
        }
    }
}

enum Resolution {
    Unresolved,
    Invalid(InvalidReason),
    Valid {
        kind: ValueKind,
        member: Rc<dyn Member>,
    },
}

/// A reference to a member path on a target, with an accepted kind mask.
pub struct PropertyReference {
    target: Option<Rc<dyn PropertyTarget>>,
    path: String,
    accepted: ValueKinds,
    resolution: RefCell<Resolution>,
}

impl PropertyReference {
    /// Create an empty reference accepting `accepted`.
    pub fn new(accepted: ValueKinds) -> Self {
        Self {
            target: None,
            path: String::new(),
            accepted,
            resolution: RefCell::new(Resolution::Unresolved),
        }
    }

    /// Create a reference to `path` on `target`.
    pub fn with_target(
        target: Rc<dyn PropertyTarget>,
        path: impl Into<String>,
        accepted: ValueKinds,
    ) -> Self {
        Self {
            target: Some(target),
            path: path.into(),
            accepted,
            resolution: RefCell::new(Resolution::Unresolved),
        }
    }

    /// Replace the target. The reference becomes unresolved.
    pub fn set_target(&mut self, target: Option<Rc<dyn PropertyTarget>>) {
        self.target = target;
        self.invalidate();
    }

    /// Replace the member path. The reference becomes unresolved.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
        self.invalidate();
    }

    /// Replace the accepted kinds. The reference becomes unresolved.
    pub fn set_accepted_kinds(&mut self, accepted: ValueKinds) {
        self.accepted = accepted;
        self.invalidate();
    }

    /// The configured target.
    pub fn target(&self) -> Option<&Rc<dyn PropertyTarget>> {
        self.target.as_ref()
    }

    /// The configured member path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The kinds the owner accepts.
    pub fn accepted_kinds(&self) -> ValueKinds {
        self.accepted
    }

    /// Returns true if no target or no path is configured.
    pub fn is_empty(&self) -> bool {
        self.target.is_none() || self.path.trim().is_empty()
    }

    /// Drop the cached resolution. The next query resolves again.
    pub fn invalidate(&self) {
        *self.resolution.borrow_mut() = Resolution::Unresolved;
    }

    /// Returns true if a resolution is cached.
    pub fn is_resolved(&self) -> bool {
        !matches!(*self.resolution.borrow(), Resolution::Unresolved)
    }

    /// Returns true if the reference is non-empty, resolves, and its kind is
    /// accepted.
    pub fn is_valid(&self) -> bool {
        self.resolved().is_some()
    }

    /// The reason the reference is invalid, or `None` if it is valid.
    pub fn invalid_reason(&self) -> Option<InvalidReason> {
        self.ensure_resolved();
        match &*self.resolution.borrow() {
            Resolution::Invalid(reason) => Some(*reason),
            _ => None,
        }
    }

    /// The resolved value kind, or `None` if not valid.
    pub fn value_kind(&self) -> Option<ValueKind> {
        self.resolved().map(|(kind, _)| kind)
    }

    /// Read the current value.
    pub fn try_get_value(&self) -> Option<PropertyValue> {
        let (kind, member) = self.resolved()?;
        let value = member.get();
        if value.kind() != kind {
            tracing::debug!(
                target: targets::ACCESSOR,
                reference = %self.describe(),
                expected = %kind,
                got = %value.kind(),
                "member produced a value of the wrong kind"
            );
            return None;
        }
        Some(value)
    }

    /// Read the current value as `T`. Returns `None` if `T` does not match
    /// the resolved kind.
    pub fn try_get<T: PropertyType>(&self) -> Option<T> {
        if self.value_kind()? != T::KIND {
            return None;
        }
        T::from_value(&self.try_get_value()?)
    }

    /// Write a typed value through to the target.
    ///
    /// Returns `true` if the value was written and changed. Does nothing when
    /// the reference is not valid or `T` does not match the resolved kind.
    pub fn set_value<T: PropertyType>(&self, value: T) -> bool {
        self.set_property_value(value.into_value())
    }

    /// Write an untyped value through to the target. Same rules as
    /// [`set_value`](Self::set_value).
    pub fn set_property_value(&self, value: PropertyValue) -> bool {
        let Some((kind, member)) = self.resolved() else {
            return false;
        };
        if value.kind() != kind {
            return false;
        }
        match member.set(value) {
            Ok(changed) => changed,
            Err(err) => {
                tracing::debug!(
                    target: targets::ACCESSOR,
                    reference = %self.describe(),
                    error = %err,
                    "write rejected by target"
                );
                false
            }
        }
    }

    /// Position of the current enum value among its declared variants.
    ///
    /// `None` if the reference is not valid, not an enum, or the value is not
    /// a declared variant.
    pub fn enum_value_index(&self) -> Option<usize> {
        self.try_get::<crate::value::EnumValue>()?.ordinal()
    }

    /// Apply `comparison` to the current value.
    ///
    /// `None` if the value cannot be read or the comparison does not apply to
    /// the resolved kind.
    pub fn try_test(&self, comparison: &Comparison) -> Option<bool> {
        let value = self.try_get_value()?;
        comparison.test(&value)
    }

    /// A human-readable description of the configuration, for diagnostics.
    pub fn describe(&self) -> String {
        match &self.target {
            None => String::from("<no target>"),
            Some(target) if self.path.trim().is_empty() => {
                format!("{}.<no path>", target.type_name())
            }
            Some(target) => format!("{}.{}", target.type_name(), self.path),
        }
    }

    fn ensure_resolved(&self) {
        let unresolved = matches!(*self.resolution.borrow(), Resolution::Unresolved);
        if unresolved {
            let resolution = self.resolve();
            *self.resolution.borrow_mut() = resolution;
        }
    }

    fn resolved(&self) -> Option<(ValueKind, Rc<dyn Member>)> {
        self.ensure_resolved();
        match &*self.resolution.borrow() {
            Resolution::Valid { kind, member } => Some((*kind, Rc::clone(member))),
            _ => None,
        }
    }

    fn resolve(&self) -> Resolution {
        let target = match &self.target {
            Some(target) if !self.path.trim().is_empty() => target,
            _ => return Resolution::Invalid(InvalidReason::Empty),
        };
        let Some(member) = target.find_member(&self.path) else {
            tracing::trace!(target: targets::ACCESSOR, reference = %self.describe(), "path did not resolve");
            return Resolution::Invalid(InvalidReason::MissingMember);
        };
        let kind = member.kind();
        if !self.accepted.accepts(kind) {
            tracing::trace!(target: targets::ACCESSOR, reference = %self.describe(), %kind, "kind not accepted");
            return Resolution::Invalid(InvalidReason::KindNotAccepted(kind));
        }
        tracing::trace!(target: targets::ACCESSOR, reference = %self.describe(), %kind, "resolved");
        Resolution::Valid { kind, member }
    }
}

impl Default for PropertyReference {
    fn default() -> Self {
        Self::new(ValueKinds::EVERYTHING)
    }
}

impl Clone for PropertyReference {
    /// Clones the configuration. The clone starts unresolved.
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            path: self.path.clone(),
            accepted: self.accepted,
            resolution: RefCell::new(Resolution::Unresolved),
        }
    }
}

impl fmt::Debug for PropertyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.resolution.borrow() {
            Resolution::Unresolved => String::from("Unresolved"),
            Resolution::Invalid(reason) => format!("Invalid({reason})"),
            Resolution::Valid { kind, .. } => format!("Valid({kind})"),
        };
        f.debug_struct("PropertyReference")
            .field("path", &self.path)
            .field("accepted", &self.accepted)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyObject;
    use crate::value::{EnumType, EnumValue};

    fn settings() -> Rc<PropertyObject> {
        let object = PropertyObject::new("settings", "Settings");
        object.add_value("enabled", true);
        object.add_value("count", 3);
        object.add_value("title", "Options");
        let quality = EnumType::new("Quality", [("Low", 10), ("Medium", 20), ("High", 40)]);
        object.add_value("quality", EnumValue::new(&quality, 40));
        object
    }

    #[test]
    fn test_empty_reference() {
        let reference = PropertyReference::new(ValueKinds::EVERYTHING);
        reference.invalidate();
        assert!(reference.is_empty());
        assert!(!reference.is_valid());
        assert_eq!(reference.invalid_reason(), Some(InvalidReason::Empty));
        assert_eq!(reference.try_get_value(), None);
        assert!(!reference.set_value(1));
        assert_eq!(reference.describe(), "<no target>");
    }

    #[test]
    fn test_target_without_path_is_empty() {
        let reference = PropertyReference::with_target(settings(), "  ", ValueKinds::EVERYTHING);
        assert!(reference.is_empty());
        assert!(!reference.is_valid());
    }

    #[test]
    fn test_resolution_is_lazy_and_cached() {
        let reference = PropertyReference::with_target(settings(), "count", ValueKinds::INT32);
        assert!(!reference.is_resolved());
        assert!(reference.is_valid());
        assert!(reference.is_resolved());
        assert_eq!(reference.value_kind(), Some(ValueKind::Int32));
        reference.invalidate();
        reference.invalidate();
        assert!(!reference.is_resolved());
    }

    #[test]
    fn test_try_get_kind_mismatch() {
        let reference =
            PropertyReference::with_target(settings(), "enabled", ValueKinds::EVERYTHING);
        assert_eq!(reference.try_get::<i32>(), None);
        assert_eq!(reference.try_get::<bool>(), Some(true));
    }

    #[test]
    fn test_kind_not_accepted() {
        let reference = PropertyReference::with_target(settings(), "title", ValueKinds::NUMERIC);
        assert!(!reference.is_valid());
        assert_eq!(
            reference.invalid_reason(),
            Some(InvalidReason::KindNotAccepted(ValueKind::String))
        );
        assert_eq!(reference.try_get::<String>(), None);
    }

    #[test]
    fn test_set_value_writes_through() {
        let target = settings();
        let reference =
            PropertyReference::with_target(target.clone(), "count", ValueKinds::EVERYTHING);
        assert!(reference.set_value(9));
        assert!(!reference.set_value(9));
        assert!(!reference.set_value(true));
        assert_eq!(target.get("count"), Some(PropertyValue::Int32(9)));
    }

    #[test]
    fn test_enum_value_index() {
        let reference =
            PropertyReference::with_target(settings(), "quality", ValueKinds::EVERYTHING);
        assert_eq!(reference.enum_value_index(), Some(2));

        let not_enum = PropertyReference::with_target(settings(), "count", ValueKinds::EVERYTHING);
        assert_eq!(not_enum.enum_value_index(), None);
    }

    #[test]
    fn test_try_test() {
        let reference = PropertyReference::with_target(settings(), "count", ValueKinds::EVERYTHING);
        assert_eq!(reference.try_test(&Comparison::Greater(2.into())), Some(true));
        assert_eq!(reference.try_test(&Comparison::IsTrue), None);

        let missing = PropertyReference::with_target(settings(), "nope", ValueKinds::EVERYTHING);
        assert_eq!(missing.try_test(&Comparison::IsTrue), None);
    }

    #[test]
    fn test_cached_member_survives_until_invalidate() {
        let target = settings();
        let reference =
            PropertyReference::with_target(target.clone(), "count", ValueKinds::EVERYTHING);
        assert_eq!(reference.try_get::<i32>(), Some(3));

        target.remove_member("count");
        target.add_value("count", "three");
        assert_eq!(reference.try_get::<i32>(), Some(3));

        reference.invalidate();
        assert_eq!(reference.try_get::<i32>(), None);
        assert_eq!(reference.try_get::<String>(), Some("three".to_string()));
    }

    #[test]
    fn test_reconfiguration_resets_resolution() {
        let mut reference =
            PropertyReference::with_target(settings(), "count", ValueKinds::EVERYTHING);
        assert!(reference.is_valid());
        reference.set_path("title");
        assert!(!reference.is_resolved());
        assert_eq!(reference.value_kind(), Some(ValueKind::String));
        reference.set_target(None);
        assert!(!reference.is_valid());
        assert_eq!(reference.clone().path(), "title");
    }
}
