//! Downstream apply interface for the index services.
//!
//! The WAL core never knows how a change becomes an embedding or a graph
//! mutation; it only pushes changes through [`IndexBackend`]. Implementations
//! must be idempotent: recovery replays the same entry until it succeeds, so
//! the same logical change can arrive more than once.

mod graph;
pub mod mock; // Expose for tests (MockIndexBackend)
mod vector;

pub use graph::GraphIndexClient;
pub use vector::VectorIndexClient;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::wal::Operation;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("index returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{backend}: {message}")]
    Backend { backend: String, message: String },
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IndexError::Timeout
        } else {
            IndexError::Request(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// One downstream index service.
///
/// `apply` realizes a single logical file change: `content` carries the file
/// text for upserts and is `None` for deletes. Calls must be safe to repeat.
#[async_trait]
pub trait IndexBackend: Send + Sync {
    /// Backend name for logs and error messages
    fn name(&self) -> &'static str;

    async fn apply(
        &self,
        user_id: &str,
        path: &str,
        operation: Operation,
        content: Option<&str>,
    ) -> Result<()>;
}

/// Ordered fan-out over every configured index backend.
///
/// A change only counts as applied once all backends accepted it; the first
/// failure aborts the fan-out and fails the change, leaving the entry for
/// recovery to replay against all backends again (idempotency makes the
/// partial re-application harmless).
pub struct DownstreamIndexes {
    backends: Vec<Arc<dyn IndexBackend>>,
}

impl DownstreamIndexes {
    pub fn new(backends: Vec<Arc<dyn IndexBackend>>) -> Self {
        Self { backends }
    }

    pub async fn apply(
        &self,
        user_id: &str,
        path: &str,
        operation: Operation,
        content: Option<&str>,
    ) -> Result<()> {
        for backend in &self.backends {
            if let Err(err) = backend.apply(user_id, path, operation, content).await {
                warn!(backend = backend.name(), path, error = %err, "Downstream apply failed");
                return Err(IndexError::Backend {
                    backend: backend.name().to_string(),
                    message: err.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Map a non-2xx response into an [`IndexError::Status`]
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(IndexError::Status {
        status: status.as_u16(),
        body,
    })
}
