//! Error taxonomy for the review scheduler.
//!
//! Callers can tell "nothing changed" failures from "retry advisable" ones
//! through [`ReviewError::is_unchanged`] and [`ReviewError::is_retryable`].

use rusqlite::ErrorCode;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("invalid quality rating: {0} (expected an integer from 0 to 5)")]
    InvalidQuality(String),

    #[error("card not found: {0}")]
    CardNotFound(Uuid),

    #[error("card {0} was reviewed elsewhere since it was fetched; reload due cards and retry")]
    StaleCard(Uuid),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("cannot {action} while session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: String,
    },

    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReviewError>;

impl ReviewError {
    /// The same request may succeed if repeated after re-fetching.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StaleCard(_) | Self::UpstreamUnavailable(_))
    }

    /// The request was rejected before any card state was touched.
    pub fn is_unchanged(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuality(_) | Self::CardNotFound(_) | Self::InvalidTransition { .. }
        )
    }
}

impl From<rusqlite::Error> for ReviewError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(
                ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::CannotOpen
                | ErrorCode::SystemIoFailure
                | ErrorCode::NotADatabase,
            ) => Self::UpstreamUnavailable(err.to_string()),
            _ => Self::Database(err),
        }
    }
}
