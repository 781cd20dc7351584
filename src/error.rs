//! Error types for configuration loading.

use thiserror::Error;

/// Errors produced while loading or validating a [`Tuning`](crate::Tuning).
///
/// Runtime problems (missing spawn origin, undiscoverable hand anchor) are not
/// errors: they are logged and the loop degrades instead.
#[derive(Debug, Error)]
pub enum CatchError {
    /// Tuning file could not be read.
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),

    /// Tuning file is not valid JSON for [`Tuning`](crate::Tuning).
    #[error("failed to parse tuning: {0}")]
    Json(#[from] serde_json::Error),

    /// A tuning value is out of range.
    #[error("invalid tuning value `{field}`: {reason}")]
    InvalidTuning {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl CatchError {
    /// Creates an invalid tuning error.
    #[must_use]
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidTuning {
            field,
            reason: reason.into(),
        }
    }
}

/// Result alias for configuration operations.
pub type Result<T> = std::result::Result<T, CatchError>;
