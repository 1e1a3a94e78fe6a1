use thiserror::Error;

use super::entry::EntryStatus;
use crate::storage::BlobError;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Blob store error: {0}")]
    Blob(#[from] BlobError),

    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    #[error("Content blob missing for entry {0}")]
    ContentMissing(String),

    #[error("Content for entry {0} is not valid UTF-8")]
    ContentEncoding(String),

    #[error("Upsert for {0} requires content")]
    MissingContent(String),

    #[error("Invalid status transition for entry {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        id: String,
        from: EntryStatus,
        to: EntryStatus,
    },

    #[error("Metadata writer lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, WalError>;
