use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::storage::BlobStore;

use super::entry::{EntryStatus, Operation, WalEntry, WalStats};
use super::error::{Result, WalError};

const LOG_FILE: &str = "wal.jsonl";
const CONTENT_DIR: &str = "content";

/// One line in the metadata log: either a full entry record (the latest one
/// for an id wins on read) or a tombstone marking the id as purged.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum LogRecord {
    Tombstone { id: String, purged: bool },
    Entry(WalEntry),
}

/// Append-only write-ahead log for index updates.
///
/// Layout under the data directory:
/// - `wal.jsonl`: one JSON metadata record per line
/// - `content/{id}.txt`: content blob per upsert entry
///
/// Status updates append a correcting record rather than rewriting in place;
/// readers fold the log and keep the last record per id. Purged ids leave a
/// tombstone behind until [`WalStore::compact`] rewrites the log.
///
/// Metadata writes are serialized by a single writer lock. Blob writes
/// target one file per id and happen before the lock is taken, so content
/// I/O never contends with concurrent appends.
pub struct WalStore {
    log_path: PathBuf,
    blobs: BlobStore,
    writer: Mutex<File>,
}

impl WalStore {
    /// Open or create a WAL store under the given data directory
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;

        let log_path = data_dir.join(LOG_FILE);
        let blobs = BlobStore::local(data_dir.join(CONTENT_DIR))?;
        let writer = Self::open_appender(&log_path)?;

        info!(path = %log_path.display(), "Opened WAL store");
        Ok(Self {
            log_path,
            blobs,
            writer: Mutex::new(writer),
        })
    }

    fn open_appender(path: &Path) -> Result<File> {
        Ok(OpenOptions::new().create(true).append(true).open(path)?)
    }

    /// Log one intended change and return its entry id.
    ///
    /// The content blob (upserts only) is persisted first via an atomic
    /// rename; the metadata record is appended after. If the metadata append
    /// fails the blob is removed again, so a failed `append` means the
    /// change was not logged at all and the caller must surface the failure
    /// synchronously.
    pub async fn append(
        &self,
        operation: Operation,
        file: &str,
        user_id: &str,
        content: Option<&str>,
    ) -> Result<String> {
        let id = Uuid::now_v7().to_string();

        let (content_hash, content_ref, content_length) = match (operation, content) {
            (Operation::Upsert, Some(text)) => {
                let hash = format!("{:x}", Sha256::digest(text.as_bytes()));
                self.blobs.put(&id, text.as_bytes().to_vec()).await?;
                (
                    Some(hash),
                    Some(format!("{CONTENT_DIR}/{id}.txt")),
                    text.len() as u64,
                )
            }
            (Operation::Upsert, None) => return Err(WalError::MissingContent(file.to_string())),
            (Operation::Delete, _) => (None, None, 0),
        };

        let entry = WalEntry {
            id: id.clone(),
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            operation,
            file: file.to_string(),
            content_hash,
            content_ref,
            content_length,
            status: EntryStatus::Pending,
            completed_at: None,
            error: None,
            attempts: 0,
        };

        if let Err(err) = self.append_record(&LogRecord::Entry(entry)) {
            // An unreferenced blob must not outlive the failed append
            if operation == Operation::Upsert {
                let _ = self.blobs.delete(&id).await;
            }
            return Err(err);
        }

        debug!(id, file, operation = ?operation, "WAL append");
        Ok(id)
    }

    /// Resolve an entry to `success` or `failed`, setting `completed_at` and
    /// the diagnostic error. The lookup and the correcting append happen
    /// under the writer lock so concurrent marks cannot interleave.
    pub fn mark(&self, id: &str, status: EntryStatus, error: Option<String>) -> Result<()> {
        let mut writer = self.lock_writer()?;

        let mut entry = self
            .find_entry(id)?
            .ok_or_else(|| WalError::EntryNotFound(id.to_string()))?;

        // Success is terminal and pending is never a mark target
        if entry.status == EntryStatus::Success || status == EntryStatus::Pending {
            return Err(WalError::InvalidTransition {
                id: id.to_string(),
                from: entry.status,
                to: status,
            });
        }

        entry.status = status;
        entry.completed_at = Some(Utc::now());
        match status {
            EntryStatus::Success => entry.error = None,
            EntryStatus::Failed => {
                entry.attempts += 1;
                entry.error = error;
            }
            EntryStatus::Pending => unreachable!("rejected above"),
        }

        Self::write_record(&mut writer, &LogRecord::Entry(entry))?;
        debug!(id, status = ?status, "WAL mark");
        Ok(())
    }

    /// Load the persisted content for an entry. Returns `None` for `delete`
    /// entries, which never have a blob.
    pub async fn get_content(&self, id: &str) -> Result<Option<String>> {
        let entry = self
            .find_entry(id)?
            .ok_or_else(|| WalError::EntryNotFound(id.to_string()))?;

        if entry.content_ref.is_none() {
            return Ok(None);
        }

        let bytes = self.blobs.get(id).await.map_err(|err| {
            warn!(id, error = %err, "Content blob unreadable");
            WalError::ContentMissing(id.to_string())
        })?;
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|_| WalError::ContentEncoding(id.to_string()))?;
        Ok(Some(text))
    }

    /// Current metadata for one entry, if it exists
    pub fn get(&self, id: &str) -> Result<Option<WalEntry>> {
        self.find_entry(id)
    }

    /// All entries currently marked `failed`
    pub fn list_failed(&self) -> Result<Vec<WalEntry>> {
        Ok(self
            .fold()?
            .into_iter()
            .filter(|e| e.status == EntryStatus::Failed)
            .collect())
    }

    /// All `success` entries whose `completed_at` is older than `older_than`
    pub fn list_stale_success(&self, older_than: Duration) -> Result<Vec<WalEntry>> {
        let cutoff = Utc::now() - older_than;
        Ok(self
            .fold()?
            .into_iter()
            .filter(|e| {
                e.status == EntryStatus::Success
                    && e.completed_at.is_some_and(|done| done < cutoff)
            })
            .collect())
    }

    /// Remove an entry's metadata and content blob. Only called on entries
    /// already known to be `success` and past retention. The blob goes
    /// first; if the tombstone append then fails, the next cleanup run
    /// retries and the idempotent blob delete is a no-op.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let entry = self
            .find_entry(id)?
            .ok_or_else(|| WalError::EntryNotFound(id.to_string()))?;

        if entry.content_ref.is_some() {
            self.blobs.delete(id).await?;
        }

        self.append_record(&LogRecord::Tombstone {
            id: id.to_string(),
            purged: true,
        })?;
        debug!(id, file = %entry.file, "WAL entry purged");
        Ok(())
    }

    /// Rewrite the log with one record per live entry, dropping tombstones
    /// and superseded correction records. The rewrite goes to a temp file
    /// that is renamed over the log, and happens under the writer lock.
    /// Returns the number of live records kept.
    pub fn compact(&self) -> Result<usize> {
        let mut writer = self.lock_writer()?;

        let entries = self.fold()?;
        let tmp_path = self.log_path.with_extension("jsonl.tmp");
        {
            let mut out = File::create(&tmp_path)?;
            for entry in &entries {
                let mut line = serde_json::to_string(&LogRecord::Entry(entry.clone()))?;
                line.push('\n');
                out.write_all(line.as_bytes())?;
            }
            out.sync_all()?;
        }
        fs::rename(&tmp_path, &self.log_path)?;

        // The held handle points at the replaced file; reopen the appender
        *writer = Self::open_appender(&self.log_path)?;

        info!(live = entries.len(), "Compacted WAL metadata log");
        Ok(entries.len())
    }

    /// Best-effort snapshot of entry counts by status
    pub fn stats(&self) -> Result<WalStats> {
        let mut stats = WalStats::default();
        for entry in self.fold()? {
            stats.total += 1;
            match entry.status {
                EntryStatus::Pending => stats.pending += 1,
                EntryStatus::Success => stats.success += 1,
                EntryStatus::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }

    /// Whether a content blob currently exists for the entry
    pub async fn content_exists(&self, id: &str) -> Result<bool> {
        Ok(self.blobs.exists(id).await?)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, File>> {
        self.writer.lock().map_err(|_| WalError::LockPoisoned)
    }

    fn append_record(&self, record: &LogRecord) -> Result<()> {
        let mut writer = self.lock_writer()?;
        Self::write_record(&mut writer, record)
    }

    fn write_record(writer: &mut File, record: &LogRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        writer.write_all(line.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn find_entry(&self, id: &str) -> Result<Option<WalEntry>> {
        Ok(self.fold()?.into_iter().find(|e| e.id == id))
    }

    /// Fold the log into the latest live record per id, preserving first-seen
    /// order. A torn trailing line (crash mid-append) is skipped with a
    /// warning rather than poisoning every read.
    fn fold(&self) -> Result<Vec<WalEntry>> {
        let file = match File::open(&self.log_path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut order: Vec<String> = Vec::new();
        let mut latest: HashMap<String, WalEntry> = HashMap::new();

        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogRecord>(&line) {
                Ok(LogRecord::Entry(entry)) => {
                    if !latest.contains_key(&entry.id) {
                        order.push(entry.id.clone());
                    }
                    latest.insert(entry.id.clone(), entry);
                }
                Ok(LogRecord::Tombstone { id, .. }) => {
                    if latest.remove(&id).is_some() {
                        order.retain(|known| known != &id);
                    }
                }
                Err(err) => {
                    warn!(error = %err, "Skipping malformed WAL record");
                }
            }
        }

        Ok(order
            .into_iter()
            .filter_map(|id| latest.remove(&id))
            .collect())
    }
}
