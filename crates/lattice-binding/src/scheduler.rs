//! Frame-driven dispatch of per-tick callbacks.
//!
//! Instead of every widget running its own update loop, widgets register a
//! [`TickCallback`] with a [`CallbackScheduler`] while they are enabled. The
//! host calls [`CallbackScheduler::dispatch`] (or [`tick`](CallbackScheduler::tick))
//! once per frame at its yield point, and every registered callback of that
//! phase runs once, synchronously, in ascending priority order. Callbacks with
//! equal priority run in registration order.
//!
//! # Ownership
//!
//! The scheduler is single-threaded by construction: it is neither `Send` nor
//! `Sync`, so it lives on the thread that owns the host loop. Create one per
//! loop (or per test) and hand widgets an `Rc` to it.
//!
//! # Failures
//!
//! A callback that returns an error or panics is logged and skipped; the
//! remaining callbacks of the tick still run and the failing callback stays
//! registered.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use lattice_binding::{CallbackScheduler, Phase, TickCallback};
//!
//! let scheduler = CallbackScheduler::new();
//! let callback: Rc<dyn TickCallback> = Rc::new(|| -> lattice_binding::Result<()> {
//!     println!("tick");
//!     Ok(())
//! });
//!
//! scheduler.register(Phase::Update, 0, &callback);
//! let report = scheduler.dispatch(Phase::Update);
//! assert_eq!(report.invoked, 1);
//! ```

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use static_assertions::assert_not_impl_any;

use crate::error::{BindingError, Result};
use crate::logging::{PerfSpan, span_names, targets};

/// A dispatch phase. The host may dispatch each phase at a different point of
/// its frame; [`CallbackScheduler::tick`] runs them in [`Phase::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Main per-frame update.
    Update,
    /// After all `Update` callbacks.
    LateUpdate,
    /// At the end of the frame, after rendering has been scheduled.
    EndOfFrame,
}

impl Phase {
    /// Every phase, in dispatch order.
    pub const ALL: [Phase; 3] = [Phase::Update, Phase::LateUpdate, Phase::EndOfFrame];

    fn index(self) -> usize {
        match self {
            Phase::Update => 0,
            Phase::LateUpdate => 1,
            Phase::EndOfFrame => 2,
        }
    }
}

/// Something invoked once per tick while registered.
pub trait TickCallback {
    /// Run one tick.
    fn on_tick(&self) -> Result<()>;
}

impl<F> TickCallback for F
where
    F: Fn() -> Result<()>,
{
    fn on_tick(&self) -> Result<()> {
        self()
    }
}

/// Counts from one dispatch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Callbacks that ran to completion.
    pub invoked: usize,
    /// Callbacks that returned an error or panicked.
    pub failed: usize,
}

impl DispatchReport {
    fn merge(self, other: DispatchReport) -> DispatchReport {
        DispatchReport {
            invoked: self.invoked + other.invoked,
            failed: self.failed + other.failed,
        }
    }
}

struct Registration {
    priority: i32,
    callback: Rc<dyn TickCallback>,
}

impl Registration {
    fn matches(&self, priority: i32, callback: &Rc<dyn TickCallback>) -> bool {
        self.priority == priority && same_callback(&self.callback, callback)
    }
}

fn same_callback(a: &Rc<dyn TickCallback>, b: &Rc<dyn TickCallback>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

/// Ordered registry of per-tick callbacks, keyed by (phase, priority, identity).
pub struct CallbackScheduler {
    phases: RefCell<[Vec<Registration>; 3]>,
    revision: Cell<u64>,
}

assert_not_impl_any!(CallbackScheduler: Send, Sync);

impl CallbackScheduler {
    /// Create a scheduler with no registrations.
    pub fn new() -> Self {
        Self {
            phases: RefCell::new([Vec::new(), Vec::new(), Vec::new()]),
            revision: Cell::new(0),
        }
    }

    /// Register `callback` in `phase` at `priority` (lower runs first).
    ///
    /// Returns `false` if the same callback is already registered with the
    /// same phase and priority; the call is then a no-op.
    pub fn register(&self, phase: Phase, priority: i32, callback: &Rc<dyn TickCallback>) -> bool {
        let mut phases = self.phases.borrow_mut();
        let list = &mut phases[phase.index()];
        if list.iter().any(|r| r.matches(priority, callback)) {
            return false;
        }
        let position = list.partition_point(|r| r.priority <= priority);
        list.insert(
            position,
            Registration {
                priority,
                callback: Rc::clone(callback),
            },
        );
        self.bump_revision();
        tracing::trace!(target: targets::SCHEDULER, ?phase, priority, "callback registered");
        true
    }

    /// Remove a registration. Returns `false` if it was not registered.
    pub fn remove(&self, phase: Phase, priority: i32, callback: &Rc<dyn TickCallback>) -> bool {
        let mut phases = self.phases.borrow_mut();
        let list = &mut phases[phase.index()];
        let Some(position) = list.iter().position(|r| r.matches(priority, callback)) else {
            return false;
        };
        list.remove(position);
        self.bump_revision();
        tracing::trace!(target: targets::SCHEDULER, ?phase, priority, "callback removed");
        true
    }

    /// Returns true if the registration exists.
    pub fn contains(&self, phase: Phase, priority: i32, callback: &Rc<dyn TickCallback>) -> bool {
        self.phases.borrow()[phase.index()]
            .iter()
            .any(|r| r.matches(priority, callback))
    }

    /// Number of registrations in `phase`.
    pub fn len(&self, phase: Phase) -> usize {
        self.phases.borrow()[phase.index()].len()
    }

    /// Returns true if no phase has registrations.
    pub fn is_empty(&self) -> bool {
        self.phases.borrow().iter().all(Vec::is_empty)
    }

    /// Invoke every callback registered in `phase`, in order.
    ///
    /// Callbacks registered during the pass first run on the next pass.
    /// Callbacks removed during the pass are skipped if they have not run yet.
    pub fn dispatch(&self, phase: Phase) -> DispatchReport {
        let snapshot: Vec<(i32, Rc<dyn TickCallback>)> = self.phases.borrow()[phase.index()]
            .iter()
            .map(|r| (r.priority, Rc::clone(&r.callback)))
            .collect();
        if snapshot.is_empty() {
            return DispatchReport::default();
        }

        let span = tracing::trace_span!(target: targets::SCHEDULER, span_names::DISPATCH, ?phase, count = snapshot.len());
        let _entered = span.enter();

        let start_revision = self.revision.get();
        let mut report = DispatchReport::default();
        for (priority, callback) in snapshot {
            if self.revision.get() != start_revision && !self.contains(phase, priority, &callback) {
                continue;
            }
            match invoke(callback.as_ref()) {
                Ok(()) => report.invoked += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::error!(
                        target: targets::SCHEDULER,
                        ?phase,
                        priority,
                        error = %err,
                        "scheduled callback failed"
                    );
                }
            }
        }
        report
    }

    /// Dispatch every phase in [`Phase::ALL`] order.
    pub fn tick(&self) -> DispatchReport {
        let _perf = PerfSpan::new("tick");
        Phase::ALL
            .into_iter()
            .fold(DispatchReport::default(), |report, phase| {
                report.merge(self.dispatch(phase))
            })
    }

    fn bump_revision(&self) {
        self.revision.set(self.revision.get().wrapping_add(1));
    }
}

impl Default for CallbackScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CallbackScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phases = self.phases.borrow();
        f.debug_struct("CallbackScheduler")
            .field("update", &phases[0].len())
            .field("late_update", &phases[1].len())
            .field("end_of_frame", &phases[2].len())
            .finish()
    }
}

fn invoke(callback: &dyn TickCallback) -> Result<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| callback.on_tick())) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| String::from("non-string panic payload"));
            Err(BindingError::Panic(message))
        }
    }
}
