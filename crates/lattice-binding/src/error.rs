//! Error types for the binding layer.
//!
//! Almost nothing in this crate is fatal. Query operations degrade to
//! `None`/`false` instead of returning errors; the types here are used by
//! fallible writes on targets, by scheduled callbacks, and by the preference
//! store's persistence helpers.

use std::path::PathBuf;

use crate::value::ValueKind;

/// Errors raised by target objects and their members.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// The member path does not resolve on the target.
    #[error("Property '{path}' not found")]
    NotFound {
        /// The path that failed to resolve.
        path: String,
    },

    /// The value kind did not match the member's kind.
    #[error("Property type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// The kind the member holds.
        expected: ValueKind,
        /// The kind that was supplied.
        got: ValueKind,
    },

    /// The member is read-only.
    #[error("Property '{path}' is read-only")]
    ReadOnly {
        /// The path of the read-only member.
        path: String,
    },

    /// An enum value was not one of the declared variants.
    #[error("'{variant}' is not a variant of enum {enum_name}")]
    UnknownVariant {
        /// The enum's type name.
        enum_name: String,
        /// The offending variant (name or numeric value).
        variant: String,
    },
}

/// The main error type of the binding layer.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// Property-related error.
    #[error("Property error: {0}")]
    Property(#[from] PropertyError),

    /// A scheduled callback reported a failure.
    #[error("Callback failed: {0}")]
    Callback(String),

    /// A scheduled callback panicked during dispatch.
    #[error("Callback panicked: {0}")]
    Panic(String),

    /// Reading or writing a preferences file failed.
    #[error("Failed to access preferences '{path}': {source}")]
    Preferences {
        /// The file that was accessed.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A preferences document could not be parsed.
    #[error("Invalid preferences document: {0}")]
    ParsePreferences(#[from] toml::de::Error),

    /// Preferences could not be serialized.
    #[error("Failed to serialize preferences: {0}")]
    SerializePreferences(#[from] toml::ser::Error),
}

impl BindingError {
    /// Create a callback failure from any displayable message.
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback(message.into())
    }

    /// Create a preferences I/O error.
    pub fn preferences(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Preferences {
            path: path.into(),
            source,
        }
    }
}

/// A specialized Result type for binding operations.
pub type Result<T> = std::result::Result<T, BindingError>;
