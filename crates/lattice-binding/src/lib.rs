//! Reactive property binding for UI widgets.
//!
//! This crate computes *what* a widget should display and *when* to recompute
//! it, without per-widget polling loops:
//!
//! - **Property references**: late-bound, typed, lazily resolved handles to a
//!   member of a target object
//! - **Conditions**: an order-dependent tri-state AND/OR fold over property
//!   comparisons
//! - **Scheduler**: one ordered dispatch point per tick for every widget
//! - **Activation stack**: last-in-wins exclusive ownership of input capture
//! - **Widgets**: condition, image swap, text formatting and key-repeat glue
//!
//! Rendering, layout and input delivery belong to the host and are reached
//! through small traits ([`widget::AssetDisplay`], [`widget::TextDisplay`],
//! [`CaptureResource`], [`InputActionHost`]).
//!
//! # Binding Example
//!
//! ```
//! use std::rc::Rc;
//! use lattice_binding::property::PropertyObject;
//! use lattice_binding::{
//!     CallbackScheduler, Comparison, Condition, ConditionWidget, Expression, Logic,
//!     PropertyReference, ValueKinds,
//! };
//!
//! let door = PropertyObject::new("door", "Door");
//! door.add_value("open", false);
//!
//! let scheduler = Rc::new(CallbackScheduler::new());
//! let condition = Condition::from_expressions([Expression::new(
//!     Logic::Or,
//!     Comparison::IsTrue,
//!     PropertyReference::with_target(door.clone(), "open", ValueKinds::BOOLEAN),
//! )]);
//! let widget = ConditionWidget::new("door", scheduler.clone(), condition);
//! widget.enable();
//!
//! door.set("open", true).unwrap();
//! scheduler.tick();
//! assert!(widget.value());
//! widget.disable();
//! ```
//!
//! # Property Example
//!
//! ```
//! use lattice_binding::property::Property;
//!
//! let value = Property::new(0);
//! assert!(value.set(1));
//! assert!(!value.set(1));
//! ```

pub mod accessor;
pub mod activation;
pub mod comparison;
pub mod condition;
mod error;
pub mod format;
pub mod logging;
pub mod preferences;
pub mod property;
pub mod scheduler;
pub mod signal;
pub mod value;
pub mod widget;

pub use accessor::{InvalidReason, PropertyReference};
pub use activation::{ActivationStack, CaptureResource, InputActionHost, InputActionLayer};
pub use comparison::Comparison;
pub use condition::{Condition, Expression, Logic, SetupReport, TriState};
pub use error::{BindingError, PropertyError, Result};
pub use format::format_value;
pub use logging::{PerfSpan, WarnOnce};
pub use preferences::{PreferenceStore, Preferences, RepeatTiming};
pub use property::{Member, Property, PropertyObject, PropertyTarget};
pub use scheduler::{CallbackScheduler, DispatchReport, Phase, TickCallback};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
pub use value::{EnumType, EnumValue, PropertyType, PropertyValue, ValueKind, ValueKinds};
pub use widget::{ConditionWidget, ImageSwapper, RepeatTrigger, TextFormatter};
