use thiserror::Error;

use crate::store::RecordId;
use crate::validation::FieldErrors;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The backend answered with `success: false` at the top level.
    #[error("{message}")]
    Backend { message: String },

    /// At least one entry of a bulk write failed. The whole call is treated as failed.
    #[error("{message}")]
    BulkWrite { message: String },

    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: RecordId },

    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("unmapped {kind} label: {label:?}")]
    UnmappedLabel { kind: &'static str, label: String },

    #[error("malformed {entity} record: {reason}")]
    Decode { entity: &'static str, reason: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    pub fn backend(message: Option<String>, default: impl Into<String>) -> Self {
        Self::Backend {
            message: non_empty(message).unwrap_or_else(|| default.into()),
        }
    }

    pub fn bulk(message: Option<String>, default: impl Into<String>) -> Self {
        Self::BulkWrite {
            message: non_empty(message).unwrap_or_else(|| default.into()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

fn non_empty(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.trim().is_empty())
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Transport(value.to_string())
    }
}
