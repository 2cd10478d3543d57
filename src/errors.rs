//! Error types for the round-table service.

use thiserror::Error;

/// Errors surfaced by the orchestration core.
///
/// Request-scoped operations translate these into structured HTTP failures at
/// the route boundary; the round-table loop converts every variant into a
/// logged warning followed by a cooldown.
#[derive(Debug, Error)]
pub enum GameError {
    /// A required input was missing or malformed.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The game-end credential was missing or did not match.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// A referenced record does not exist.
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// A ledger store operation failed.
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// A gateway call failed or returned an unexpected empty result.
    #[error("Gateway error: {message}")]
    Gateway { message: String },
}

impl GameError {
    /// Shorthand for a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a missing-record failure.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Shorthand for a gateway failure.
    pub fn gateway(message: impl Into<String>) -> Self {
        Self::Gateway {
            message: message.into(),
        }
    }

    /// Shorthand for a persistence failure.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for GameError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Persistence {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for GameError {
    fn from(err: reqwest::Error) -> Self {
        Self::Gateway {
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for GameError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Persistence {
            message: format!("blocking task failed: {}", err),
        }
    }
}
