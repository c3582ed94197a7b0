//! Shared primitives for all Rust crates in the RBAC inspector.

#![forbid(unsafe_code)]

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result type used across inspector crates.
pub type AppResult<T> = Result<T, AppError>;

/// Identifier of one registered watch multiplexer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchId(Uuid);

impl WatchId {
    /// Creates a random watch identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for WatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for WatchId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Common application error categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Backend rejected or could not serve a request.
    #[error("connection error: {0}")]
    Connection(String),

    /// A backend payload could not be projected into the canonical model.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Schema revision outside of the supported set.
    #[error("unsupported version: {0}")]
    UnsupportedVersion(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Prefixes the error message with a context tag, keeping the category.
    #[must_use]
    pub fn with_context(self, context: impl Display) -> Self {
        match self {
            Self::Validation(message) => Self::Validation(format!("{context}: {message}")),
            Self::NotFound(message) => Self::NotFound(format!("{context}: {message}")),
            Self::Connection(message) => Self::Connection(format!("{context}: {message}")),
            Self::Conversion(message) => Self::Conversion(format!("{context}: {message}")),
            Self::UnsupportedVersion(message) => {
                Self::UnsupportedVersion(format!("{context}: {message}"))
            }
            Self::Internal(message) => Self::Internal(format!("{context}: {message}")),
        }
    }
}
