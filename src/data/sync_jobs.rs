//! Sync job rows: creation, progress updates, and terminal status writes.

use anyhow::{Context, Result};
use sqlx::PgPool;

use super::models::{JobProgress, SyncJob};

/// Insert a new job directly in `running` status and return its id.
pub async fn insert_running(pool: &PgPool, subjects: &[String]) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO sync_jobs (status, subjects, total_subjects, started_at)
        VALUES ('running', $1, $2, NOW())
        RETURNING id
        "#,
    )
    .bind(subjects)
    .bind(subjects.len() as i32)
    .fetch_one(pool)
    .await
    .context("failed to insert sync job")?;

    Ok(id)
}

/// Fetch the most recently started job still in `running` status, if any.
/// Backs the pre-run overlap guard; the age check happens in the caller.
pub async fn latest_running(pool: &PgPool) -> Result<Option<SyncJob>> {
    let job = sqlx::query_as::<_, SyncJob>(
        r#"
        SELECT id, status, subjects, total_subjects, completed_subjects,
               current_subject, sections_fetched, error_message,
               started_at, finished_at
        FROM sync_jobs
        WHERE status = 'running'
        ORDER BY started_at DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
    .context("failed to fetch latest running sync job")?;

    Ok(job)
}

/// Update a running job's progress counters.
pub async fn update_progress(pool: &PgPool, id: i64, progress: &JobProgress) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE sync_jobs
        SET completed_subjects = $2,
            current_subject = $3,
            sections_fetched = $4
        WHERE id = $1 AND status = 'running'
        "#,
    )
    .bind(id)
    .bind(progress.completed_subjects)
    .bind(&progress.current_subject)
    .bind(progress.sections_fetched)
    .execute(pool)
    .await
    .context("failed to update sync job progress")?;

    Ok(())
}

/// Mark a running job completed. Returns false if the row was not in
/// `running` status (finished or externally cancelled), in which case
/// nothing is overwritten.
pub async fn mark_completed(pool: &PgPool, id: i64, sections_fetched: i32) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sync_jobs
        SET status = 'completed',
            sections_fetched = $2,
            current_subject = NULL,
            finished_at = NOW()
        WHERE id = $1 AND status = 'running'
        "#,
    )
    .bind(id)
    .bind(sections_fetched)
    .execute(pool)
    .await
    .context("failed to mark sync job completed")?;

    Ok(result.rows_affected() > 0)
}

/// Mark a running job failed with an error message. Returns false if the
/// row was not in `running` status.
pub async fn mark_failed(pool: &PgPool, id: i64, error_message: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE sync_jobs
        SET status = 'failed',
            error_message = $2,
            finished_at = NOW()
        WHERE id = $1 AND status = 'running'
        "#,
    )
    .bind(id)
    .bind(error_message)
    .execute(pool)
    .await
    .context("failed to mark sync job failed")?;

    Ok(result.rows_affected() > 0)
}
