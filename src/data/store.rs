//! Gateway trait the orchestrator drives, and its PostgreSQL implementation.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{JobProgress, NewLogEntry, SyncJob};
use super::{sections, sync_jobs, sync_logs};
use crate::catalog::SectionRecord;

/// Persistence operations the sync pipeline needs. Implemented by [`PgStore`]
/// and by in-memory fakes in orchestrator tests.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// The most recently started job still in `running` status, if any.
    async fn latest_running_job(&self) -> Result<Option<SyncJob>>;

    /// Create a job in `running` status; returns the new job id.
    async fn create_job(&self, subjects: &[String]) -> Result<i64>;

    /// Write progress counters for a running job.
    async fn update_progress(&self, job_id: i64, progress: &JobProgress) -> Result<()>;

    /// Mark a running job completed. Returns false when the row was no
    /// longer in `running` status and was left untouched.
    async fn complete_job(&self, job_id: i64, sections_fetched: i32) -> Result<bool>;

    /// Mark a running job failed. Returns false when the row was no longer
    /// in `running` status and was left untouched.
    async fn fail_job(&self, job_id: i64, error_message: &str) -> Result<bool>;

    /// Append one diagnostic row to the job's log trail.
    async fn append_log(&self, job_id: i64, entry: &NewLogEntry) -> Result<()>;

    /// Upsert one batch of section records keyed by section id.
    async fn upsert_sections(&self, job_id: i64, records: &[SectionRecord]) -> Result<()>;
}

/// [`SyncStore`] over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncStore for PgStore {
    async fn latest_running_job(&self) -> Result<Option<SyncJob>> {
        sync_jobs::latest_running(&self.pool).await
    }

    async fn create_job(&self, subjects: &[String]) -> Result<i64> {
        sync_jobs::insert_running(&self.pool, subjects).await
    }

    async fn update_progress(&self, job_id: i64, progress: &JobProgress) -> Result<()> {
        sync_jobs::update_progress(&self.pool, job_id, progress).await
    }

    async fn complete_job(&self, job_id: i64, sections_fetched: i32) -> Result<bool> {
        sync_jobs::mark_completed(&self.pool, job_id, sections_fetched).await
    }

    async fn fail_job(&self, job_id: i64, error_message: &str) -> Result<bool> {
        sync_jobs::mark_failed(&self.pool, job_id, error_message).await
    }

    async fn append_log(&self, job_id: i64, entry: &NewLogEntry) -> Result<()> {
        sync_logs::insert(&self.pool, job_id, entry).await
    }

    async fn upsert_sections(&self, job_id: i64, records: &[SectionRecord]) -> Result<()> {
        sections::upsert_batch(&self.pool, job_id, records).await
    }
}
