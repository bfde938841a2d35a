//! Error types for the access policy.

use thiserror::Error;

use skypermit_core::UserId;

/// An access check failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("access denied for user {actor}: {reason}")]
pub struct AccessDenied {
    pub actor: UserId,
    pub reason: String,
}

impl AccessDenied {
    pub fn new(actor: UserId, reason: impl Into<String>) -> Self {
        Self {
            actor,
            reason: reason.into(),
        }
    }
}

/// Result type for access checks.
pub type Result<T> = std::result::Result<T, AccessDenied>;
