//! Persistence: job rows, the append-only log trail, and section snapshots.

pub mod models;
pub mod sections;
mod store;
pub mod sync_jobs;
pub mod sync_logs;

pub use models::{JobProgress, JobStatus, LogLevel, NewLogEntry, SyncJob};
pub use store::{PgStore, SyncStore};
