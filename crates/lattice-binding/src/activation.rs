//! Exclusive ownership of a shared input-capture resource.
//!
//! Several UI layers may want to capture the same input actions (a menu, a
//! dialog on top of it, a text prompt on top of that). An [`ActivationStack`]
//! guarantees that only the most recently activated layer that is still
//! active has its capture enabled:
//!
//! - [`activate`](ActivationStack::activate) disables the current top, moves
//!   the owner to the top and enables it.
//! - [`deactivate`](ActivationStack::deactivate) removes the owner from
//!   wherever it sits. Only if it was on top is its capture disabled and the
//!   new top re-enabled; removing a lower entry leaves the active owner alone.
//!
//! Deactivating an owner that is not on the stack is a silent no-op, since
//! independent widgets can be torn down in any order.
//!
//! The stack is single-threaded, like [`crate::CallbackScheduler`]. Create
//! one per host loop and share it with `Rc`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use static_assertions::assert_not_impl_any;

use crate::logging::targets;

/// A resource that can be switched between capturing and idle.
///
/// Both methods must be idempotent.
pub trait CaptureResource {
    /// Start capturing.
    fn enable_capture(&self);
    /// Stop capturing.
    fn disable_capture(&self);
}

fn same_owner(a: &Rc<dyn CaptureResource>, b: &Rc<dyn CaptureResource>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Last-in-wins ownership stack over capture resources.
#[derive(Default)]
pub struct ActivationStack {
    entries: RefCell<Vec<Rc<dyn CaptureResource>>>,
}

assert_not_impl_any!(ActivationStack: Send, Sync);

impl ActivationStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `owner` the exclusive holder.
    ///
    /// No-op if it already is. Otherwise the previous top is disabled, any
    /// older entry for `owner` is dropped, and `owner` is pushed and enabled.
    pub fn activate(&self, owner: &Rc<dyn CaptureResource>) {
        let previous = {
            let mut entries = self.entries.borrow_mut();
            if entries.last().is_some_and(|top| same_owner(top, owner)) {
                return;
            }
            let previous = entries.last().cloned();
            entries.retain(|entry| !same_owner(entry, owner));
            entries.push(Rc::clone(owner));
            previous
        };

        if let Some(previous) = previous {
            previous.disable_capture();
        }
        owner.enable_capture();
        tracing::debug!(target: targets::ACTIVATION, depth = self.len(), "owner activated");
    }

    /// Remove `owner` from the stack.
    ///
    /// Returns `false` (and does nothing) if it was not on the stack. When the
    /// owner was on top, its capture is disabled and the new top, if any, is
    /// enabled again.
    pub fn deactivate(&self, owner: &Rc<dyn CaptureResource>) -> bool {
        let (was_top, new_top) = {
            let mut entries = self.entries.borrow_mut();
            let Some(position) = entries.iter().position(|entry| same_owner(entry, owner)) else {
                return false;
            };
            let was_top = position + 1 == entries.len();
            entries.remove(position);
            (was_top, if was_top { entries.last().cloned() } else { None })
        };

        if was_top {
            owner.disable_capture();
            if let Some(top) = new_top {
                top.enable_capture();
            }
        }
        tracing::debug!(target: targets::ACTIVATION, was_top, depth = self.len(), "owner deactivated");
        true
    }

    /// The current exclusive holder.
    pub fn current_top(&self) -> Option<Rc<dyn CaptureResource>> {
        self.entries.borrow().last().cloned()
    }

    /// Returns true if `owner` is anywhere on the stack.
    pub fn contains(&self, owner: &Rc<dyn CaptureResource>) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|entry| same_owner(entry, owner))
    }

    /// Returns true if `owner` is the current holder.
    pub fn is_top(&self, owner: &Rc<dyn CaptureResource>) -> bool {
        self.entries
            .borrow()
            .last()
            .is_some_and(|top| same_owner(top, owner))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns true if nothing is active.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl fmt::Debug for ActivationStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationStack")
            .field("depth", &self.len())
            .finish()
    }
}

/// The host service that owns named input actions.
pub trait InputActionHost {
    /// Enable an action by name.
    fn enable_action(&self, name: &str);
    /// Disable an action by name.
    fn disable_action(&self, name: &str);
}

/// A capture resource made of named input actions on a host.
///
/// Enabling turns every listed action on, disabling turns them off. Repeated
/// calls in the same direction do nothing, and a layer without a host or
/// without actions never touches anything.
pub struct InputActionLayer {
    name: String,
    host: Option<Rc<dyn InputActionHost>>,
    actions: Vec<String>,
    capturing: Cell<bool>,
}

impl InputActionLayer {
    /// Create a layer over `actions` on `host`.
    pub fn new<I, S>(name: impl Into<String>, host: Option<Rc<dyn InputActionHost>>, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            host,
            actions: actions.into_iter().map(Into::into).collect(),
            capturing: Cell::new(false),
        }
    }

    /// The layer's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The actions this layer captures.
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Returns true while capture is enabled.
    pub fn is_capturing(&self) -> bool {
        self.capturing.get()
    }
}

impl CaptureResource for InputActionLayer {
    fn enable_capture(&self) {
        if self.capturing.replace(true) {
            return;
        }
        let Some(host) = &self.host else {
            return;
        };
        tracing::trace!(target: targets::ACTIVATION, layer = %self.name, "enabling input actions");
        for action in &self.actions {
            host.enable_action(action);
        }
    }

    fn disable_capture(&self) {
        if !self.capturing.replace(false) {
            return;
        }
        let Some(host) = &self.host else {
            return;
        };
        tracing::trace!(target: targets::ACTIVATION, layer = %self.name, "disabling input actions");
        for action in &self.actions {
            host.disable_action(action);
        }
    }
}

impl fmt::Debug for InputActionLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputActionLayer")
            .field("name", &self.name)
            .field("actions", &self.actions)
            .field("capturing", &self.capturing.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[derive(Default)]
    struct ActionHost {
        enabled: RefCell<BTreeSet<String>>,
        calls: Cell<usize>,
    }

    impl ActionHost {
        fn is_enabled(&self, name: &str) -> bool {
            self.enabled.borrow().contains(name)
        }
    }

    impl InputActionHost for ActionHost {
        fn enable_action(&self, name: &str) {
            self.calls.set(self.calls.get() + 1);
            self.enabled.borrow_mut().insert(name.to_string());
        }

        fn disable_action(&self, name: &str) {
            self.calls.set(self.calls.get() + 1);
            self.enabled.borrow_mut().remove(name);
        }
    }

    fn layer(name: &str, host: &Rc<ActionHost>) -> (Rc<InputActionLayer>, Rc<dyn CaptureResource>) {
        let host: Rc<dyn InputActionHost> = host.clone();
        let layer = Rc::new(InputActionLayer::new(
            name,
            Some(host),
            [format!("{name}/submit"), format!("{name}/cancel")],
        ));
        let owner: Rc<dyn CaptureResource> = layer.clone();
        (layer, owner)
    }

    #[test]
    fn test_deactivating_top_restores_previous() {
        let host = Rc::new(ActionHost::default());
        let stack = ActivationStack::new();
        let (a, a_owner) = layer("a", &host);
        let (b, b_owner) = layer("b", &host);

        stack.activate(&a_owner);
        assert!(a.is_capturing());
        stack.activate(&b_owner);
        assert!(!a.is_capturing());
        assert!(b.is_capturing());

        assert!(stack.deactivate(&b_owner));
        assert!(a.is_capturing());
        assert!(!b.is_capturing());
        assert!(host.is_enabled("a/submit"));
        assert!(!host.is_enabled("b/submit"));
        assert!(stack.is_top(&a_owner));
    }

    #[test]
    fn test_deactivating_lower_entry_leaves_top_alone() {
        let host = Rc::new(ActionHost::default());
        let stack = ActivationStack::new();
        let (a, a_owner) = layer("a", &host);
        let (b, b_owner) = layer("b", &host);

        stack.activate(&a_owner);
        stack.activate(&b_owner);
        let calls = host.calls.get();

        assert!(stack.deactivate(&a_owner));
        assert_eq!(host.calls.get(), calls);
        assert!(b.is_capturing());
        assert!(!a.is_capturing());
        assert_eq!(stack.len(), 1);
        assert!(stack.is_top(&b_owner));
        assert!(!stack.contains(&a_owner));
    }

    #[test]
    fn test_activate_top_is_noop() {
        let host = Rc::new(ActionHost::default());
        let stack = ActivationStack::new();
        let (_a, a_owner) = layer("a", &host);

        stack.activate(&a_owner);
        let calls = host.calls.get();
        stack.activate(&a_owner);
        assert_eq!(host.calls.get(), calls);
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_reactivating_moves_entry_to_top() {
        let host = Rc::new(ActionHost::default());
        let stack = ActivationStack::new();
        let (a, a_owner) = layer("a", &host);
        let (b, b_owner) = layer("b", &host);

        stack.activate(&a_owner);
        stack.activate(&b_owner);
        stack.activate(&a_owner);
        assert_eq!(stack.len(), 2);
        assert!(a.is_capturing());
        assert!(!b.is_capturing());

        stack.deactivate(&a_owner);
        assert!(b.is_capturing());
        assert!(stack.is_top(&b_owner));
    }

    #[test]
    fn test_deactivate_unknown_is_noop() {
        let host = Rc::new(ActionHost::default());
        let stack = ActivationStack::new();
        let (_a, a_owner) = layer("a", &host);

        assert!(!stack.deactivate(&a_owner));
        assert_eq!(host.calls.get(), 0);
        assert!(stack.current_top().is_none());
    }

    #[test]
    fn test_layer_is_idempotent_and_tolerates_missing_host() {
        let host = Rc::new(ActionHost::default());
        let (a, _) = layer("a", &host);
        a.enable_capture();
        a.enable_capture();
        assert_eq!(host.calls.get(), 2);
        a.disable_capture();
        a.disable_capture();
        assert_eq!(host.calls.get(), 4);

        let orphan = InputActionLayer::new("orphan", None, ["x"]);
        orphan.enable_capture();
        assert!(orphan.is_capturing());
        orphan.disable_capture();
        assert!(!orphan.is_capturing());
    }
}
