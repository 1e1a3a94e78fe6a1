//! API models for the change ingestion and admin endpoints.
//!
//! This module defines the external API contract:
//! - Ingestion via `POST /internal/v1/changes/apply` accepts an
//!   [`ApplyChangesRequest`] payload and returns per-file outcomes
//! - `GET /admin/wal/stats` returns [`StatsResponse`]
//! - `POST /admin/jobs/recovery` and `POST /admin/jobs/cleanup` return
//!   [`JobTriggerResponse`] with run statistics
//!
//! A complete ingestion payload example (as JSON):
//!
//! ```json
//! {
//!   "changes": [
//!     {
//!       "path": "src/parser.py",
//!       "operation": "upsert",
//!       "content": "def parse():\n    ..."
//!     },
//!     {
//!       "path": "src/legacy.py",
//!       "operation": "delete"
//!     }
//!   ]
//! }
//! ```
//!
//! The caller identity travels in the `X-Indexwal-User` header rather than
//! the body, so one batch always belongs to exactly one user.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::applier::{BatchCounts, ChangeOutcome};
use crate::observability::MetricsSnapshot;
use crate::wal::{Operation, WalStats};

#[derive(Debug, Deserialize)]
pub struct ApplyChangesRequest {
    pub changes: Vec<ChangeItem>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeItem {
    pub path: String,
    pub operation: Operation,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplyChangesResponse {
    /// False when at least one change was rejected
    pub ok: bool,
    pub per_file: Vec<ChangeOutcome>,
    pub counts: BatchCounts,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub wal: WalStats,
    pub counters: MetricsSnapshot,
}

#[derive(Debug, Serialize)]
pub struct JobTriggerResponse<T> {
    /// False when a run was already in progress and this trigger was skipped
    pub triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<T>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}
