//! Errors surfaced by the core.

use thiserror::Error;
use uuid::Uuid;

/// Failures of registry, log store and poll operations. Nothing here is retried.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("channel not found: {0}")]
    ChannelNotFound(Uuid),

    #[error("application not found: {0}")]
    ApplicationNotFound(Uuid),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn is_unique_violation(&self) -> bool {
        match self {
            CoreError::StoreUnavailable(e) => e
                .as_database_error()
                .is_some_and(|d| d.is_unique_violation()),
            _ => false,
        }
    }
}
