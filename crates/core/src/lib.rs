//! Shared primitives for all Rust crates in Tessera.

#![forbid(unsafe_code)]

/// Typed identifiers for accounts and catalog objects.
pub mod ids;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ids::{AccountId, PermissionGroupId, PermissionId, RoleId};

/// Result type used across Tessera crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input or violated invariant; rejected before any evaluation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A role mutation would grant more authority than the actor holds.
    #[error("rank exceeded: actor rank {actor_rank} cannot grant rank {requested_rank}")]
    RankExceeded {
        /// Highest rank held by the acting account.
        actor_rank: u32,
        /// Rank the actor attempted to assign or create.
        requested_rank: u32,
    },

    /// Evaluation concluded that the principal may not perform the action.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The permission store or the object storage backend could not be queried.
    #[error("query failure: {0}")]
    QueryFailure(String),

    /// Enumeration or batch size exceeded configured bounds.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns whether the caller can resolve the error by correcting its input.
    #[must_use]
    pub fn is_caller_correctable(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::RankExceeded { .. } | Self::NotFound(_) | Self::Conflict(_)
        )
    }
}
