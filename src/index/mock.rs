//! Scriptable in-memory index backend for tests

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::wal::Operation;

use super::{IndexBackend, IndexError, Result};

/// A change the mock accepted, recorded for assertions
#[derive(Debug, Clone)]
pub struct AppliedChange {
    pub user_id: String,
    pub path: String,
    pub operation: Operation,
    pub content: Option<String>,
}

/// Index backend that records accepted changes and can be told to fail the
/// next N apply calls, simulating a downstream outage.
#[derive(Default)]
pub struct MockIndexBackend {
    fail_remaining: AtomicU32,
    calls: Mutex<Vec<AppliedChange>>,
}

impl MockIndexBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` apply calls with a simulated outage
    pub fn fail_next(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Changes accepted so far, in order
    pub fn applied(&self) -> Vec<AppliedChange> {
        self.calls.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl IndexBackend for MockIndexBackend {
    fn name(&self) -> &'static str {
        "mock-index"
    }

    async fn apply(
        &self,
        user_id: &str,
        path: &str,
        operation: Operation,
        content: Option<&str>,
    ) -> Result<()> {
        let should_fail = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(IndexError::Request("simulated index outage".to_string()));
        }

        self.calls.lock().expect("mock lock").push(AppliedChange {
            user_id: user_id.to_string(),
            path: path.to_string(),
            operation,
            content: content.map(str::to_string),
        });
        Ok(())
    }
}
