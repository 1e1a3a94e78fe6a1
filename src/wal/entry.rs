//! Metadata record types for the write-ahead log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Logical operation recorded for one file change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create or update the indexed representation of a file
    Upsert,
    /// Remove the indexed representation of a file
    Delete,
}

/// Entry state machine.
///
/// Allowed transitions: `pending -> success`, `pending -> failed`,
/// `failed -> success` (recovery), `failed -> failed` (retry still failing).
/// `success` is terminal; successful entries are only ever removed by
/// cleanup, never re-marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Success,
    Failed,
}

/// One logged file-change intent.
///
/// Serialized as a single flat JSON line in the metadata log. Content is
/// stored out-of-line in the blob arena so status scans never read payloads;
/// `content_ref` points at the blob for `upsert` entries and is `None` for
/// `delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub operation: Operation,
    pub file: String,
    pub content_hash: Option<String>,
    pub content_ref: Option<String>,
    pub content_length: u64,
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Apply attempts that have failed so far. Diagnostic only; retries are
    /// unbounded and this counter never gates them.
    #[serde(default)]
    pub attempts: u32,
}

/// Best-effort snapshot of entry counts by status
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct WalStats {
    pub total: usize,
    pub pending: usize,
    pub success: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_line_roundtrip() {
        let entry = WalEntry {
            id: "0192f0c1-2345-7890-abcd-ef0123456789".to_string(),
            timestamp: Utc::now(),
            user_id: "user-1".to_string(),
            operation: Operation::Upsert,
            file: "src/main.py".to_string(),
            content_hash: Some("deadbeef".to_string()),
            content_ref: Some("content/0192f0c1-2345-7890-abcd-ef0123456789.txt".to_string()),
            content_length: 12,
            status: EntryStatus::Pending,
            completed_at: None,
            error: None,
            attempts: 0,
        };

        let line = serde_json::to_string(&entry).unwrap();
        let parsed: WalEntry = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.id, entry.id);
        assert_eq!(parsed.operation, Operation::Upsert);
        assert_eq!(parsed.status, EntryStatus::Pending);
    }

    #[test]
    fn test_status_and_operation_wire_names() {
        assert_eq!(
            serde_json::to_string(&Operation::Upsert).unwrap(),
            "\"upsert\""
        );
        assert_eq!(
            serde_json::to_string(&EntryStatus::Failed).unwrap(),
            "\"failed\""
        );
    }

    #[test]
    fn test_entry_without_attempts_field_parses() {
        // Logs written before the attempts counter existed must still load
        let line = r#"{"id":"a","timestamp":"2026-01-01T00:00:00Z","user_id":"u","operation":"delete","file":"gone.py","content_hash":null,"content_ref":null,"content_length":0,"status":"success","completed_at":"2026-01-01T00:00:01Z"}"#;
        let parsed: WalEntry = serde_json::from_str(line).unwrap();
        assert_eq!(parsed.attempts, 0);
        assert!(parsed.completed_at.is_some());
    }
}
