//! Observer lists for change notification.
//!
//! A [`Signal`] holds a set of connected slots and invokes them synchronously,
//! in connection order, on [`Signal::emit`]. Condition widgets use it to
//! report transitions, [`crate::property::PropertyObject`] uses it to announce
//! structural changes, and the preference store to announce edited keys.
//!
//! Signals live on the thread that runs the host loop, like the scheduler and
//! the widgets, so slots may capture `Rc` handles to other widgets.
//!
//! # Example
//!
//! ```
//! use lattice_binding::Signal;
//!
//! let changed = Signal::<bool>::new();
//! let id = changed.connect(|previous| println!("was {previous}"));
//! changed.emit(false);
//! changed.disconnect(id);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use slotmap::{SlotMap, new_key_type};
use static_assertions::assert_not_impl_any;

use crate::logging::targets;

new_key_type! {
    /// Identifies one connection made with [`Signal::connect`].
    pub struct ConnectionId;
}

type Slot<Args> = Rc<dyn Fn(&Args)>;

/// A list of slots invoked with a shared argument.
pub struct Signal<Args> {
    connections: RefCell<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: Cell<bool>,
}

assert_not_impl_any!(Signal<()>: Send, Sync);

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Create a signal with no connections.
    pub fn new() -> Self {
        Self {
            connections: RefCell::new(SlotMap::with_key()),
            blocked: Cell::new(false),
        }
    }

    /// Connect a slot. Returns an id for [`disconnect`](Self::disconnect).
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + 'static,
    {
        self.connections.borrow_mut().insert(Rc::new(slot))
    }

    /// Disconnect a slot. Returns `false` if it was not connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.borrow_mut().remove(id).is_some()
    }

    /// Disconnect every slot.
    pub fn disconnect_all(&self) {
        self.connections.borrow_mut().clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.borrow().len()
    }

    /// Suppress or re-enable emission.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.set(blocked);
    }

    /// Check if emission is currently suppressed.
    pub fn is_blocked(&self) -> bool {
        self.blocked.get()
    }

    /// Invoke every connected slot with `args`.
    ///
    /// Slots run after the connection list is released, so a slot may connect
    /// or disconnect on the same signal. Such changes apply to the next emit.
    #[tracing::instrument(skip_all, target = "lattice_binding::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        let slots: Vec<Slot<Args>> = self.connections.borrow().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = slots.len(), "emitting signal");
        for slot in slots {
            slot(&args);
        }
    }

    /// Connect a slot that is disconnected when the returned guard drops.
    pub fn connect_scoped<F>(self: &Rc<Self>, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard {
            signal: Rc::downgrade(self),
            id,
        }
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connections.borrow().len())
            .field("blocked", &self.blocked.get())
            .finish()
    }
}

/// Disconnects its slot when dropped.
pub struct ConnectionGuard<Args: 'static> {
    signal: Weak<Signal<Args>>,
    id: ConnectionId,
}

impl<Args: 'static> ConnectionGuard<Args> {
    /// The id of the guarded connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args: 'static> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(signal) = self.signal.upgrade() {
            signal.disconnect(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_connect_emit() {
        let signal = Signal::<i32>::new();
        let received = Rc::new(RefCell::new(Vec::new()));

        let received_clone = received.clone();
        signal.connect(move |&value| {
            received_clone.borrow_mut().push(value);
        });

        signal.emit(1);
        signal.emit(2);
        assert_eq!(*received.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_signal_disconnect() {
        let signal = Signal::<()>::new();
        let count = Rc::new(Cell::new(0));

        let count_clone = count.clone();
        let id = signal.connect(move |_| {
            count_clone.set(count_clone.get() + 1);
        });

        signal.emit(());
        assert!(signal.disconnect(id));
        assert!(!signal.disconnect(id));
        signal.emit(());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_signal_blocked() {
        let signal = Signal::<()>::new();
        let count = Rc::new(Cell::new(0));

        let count_clone = count.clone();
        signal.connect(move |_| {
            count_clone.set(count_clone.get() + 1);
        });

        signal.set_blocked(true);
        signal.emit(());
        signal.set_blocked(false);
        signal.emit(());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_slot_may_disconnect_during_emit() {
        let signal = Rc::new(Signal::<()>::new());
        let weak = Rc::downgrade(&signal);
        signal.connect(move |_| {
            if let Some(signal) = weak.upgrade() {
                signal.disconnect_all();
            }
        });

        signal.emit(());
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_slot_may_connect_during_emit() {
        let signal = Rc::new(Signal::<u32>::new());
        let weak = Rc::downgrade(&signal);
        signal.connect(move |_| {
            if let Some(signal) = weak.upgrade() {
                signal.connect(|_| {});
            }
        });

        signal.emit(1);
        assert_eq!(signal.connection_count(), 2);
    }

    #[test]
    fn test_connection_guard() {
        let signal = Rc::new(Signal::<i32>::new());
        let last = Rc::new(Cell::new(0));

        {
            let last_clone = last.clone();
            let _guard = signal.connect_scoped(move |&v| last_clone.set(v));
            signal.emit(42);
        }
        signal.emit(43);
        assert_eq!(last.get(), 42);
        assert_eq!(signal.connection_count(), 0);
    }
}
