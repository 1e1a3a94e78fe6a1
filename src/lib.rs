pub mod api;
pub mod applier;
pub mod config;
pub mod humanize;
pub mod index;
pub mod jobs;
pub mod observability;
pub mod storage;
pub mod wal;
