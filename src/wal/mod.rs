//! Write-ahead log for index updates
//!
//! Every intended change is recorded here before it is applied to any
//! downstream index, so an accepted change survives a downstream outage and
//! can be replayed later. The module provides durable storage for:
//!
//! - Entry metadata (operation, file, owner, status, timestamps)
//! - Content blobs (the file text an upsert will be replayed with)
//!
//! ## Architecture
//!
//! The metadata log is a single line-delimited JSON file and the blob arena
//! is one file per entry id. Appends and status corrections go through a
//! single writer lock; readers fold the log so the latest record per id
//! wins. Content blobs are written before their metadata record, matching
//! the write-ahead contract.
//!
//! ## Lifecycle
//!
//! Entries are created `pending` at ingestion, resolved to `success` or
//! `failed` after the downstream apply, replayed by the recovery job while
//! `failed`, and destroyed only by the cleanup job once `success` and older
//! than the retention window.
pub mod entry;
pub mod error;
pub mod store;

pub use entry::{EntryStatus, Operation, WalEntry, WalStats};
pub use error::{Result, WalError};
pub use store::WalStore;
