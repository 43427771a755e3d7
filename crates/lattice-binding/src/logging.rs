//! Logging facilities for the binding layer.
//!
//! Everything is reported through the `tracing` crate. The crate never
//! installs a subscriber; to see logs, install one in the host application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("lattice_binding=debug")
//!     .init();
//! ```
//!
//! Per-subsystem targets are listed in [`targets`], so a filter such as
//! `lattice_binding::scheduler=trace` shows dispatch passes only.

use std::collections::HashSet;

/// Span names used for tracing.
pub mod span_names {
    /// One scheduler dispatch pass.
    pub const DISPATCH: &str = "dispatch";
    /// Performance measurement span.
    pub const PERF: &str = "perf";
}

/// Target names for log filtering.
pub mod targets {
    /// Property reference resolution.
    pub const ACCESSOR: &str = "lattice_binding::accessor";
    /// Condition setup and evaluation.
    pub const CONDITION: &str = "lattice_binding::condition";
    /// Callback dispatch.
    pub const SCHEDULER: &str = "lattice_binding::scheduler";
    /// Activation stack.
    pub const ACTIVATION: &str = "lattice_binding::activation";
    /// Signal emission.
    pub const SIGNAL: &str = "lattice_binding::signal";
    /// Widget glue.
    pub const WIDGET: &str = "lattice_binding::widget";
    /// Preference store.
    pub const PREFERENCES: &str = "lattice_binding::preferences";
    /// Performance spans.
    pub const PERF: &str = "lattice_binding::perf";
}

/// Remembers which configuration problems were already reported.
///
/// Configuration warnings are logged once per distinct key, not once per
/// tick or per setup call.
#[derive(Debug, Clone, Default)]
pub struct WarnOnce {
    seen: HashSet<String>,
}

impl WarnOnce {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time `key` is seen.
    pub fn first(&mut self, key: impl Into<String>) -> bool {
        self.seen.insert(key.into())
    }

    /// Forget everything reported so far.
    pub fn reset(&mut self) {
        self.seen.clear();
    }

    /// Number of distinct keys reported.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Returns true if nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for timing an operation with a subscriber that records span
/// durations.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a span for `operation`.
    pub fn new(operation: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, span_names::PERF, operation);
        Self {
            _span: span.entered(),
        }
    }
}
