//! Append-only log trail tied to sync jobs.

use anyhow::{Context, Result};
use sqlx::PgPool;

use super::models::NewLogEntry;

/// Append one log row for a job. Rows are never updated or deleted.
pub async fn insert(pool: &PgPool, job_id: i64, entry: &NewLogEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sync_logs (sync_job_id, level, message, detail, subject, operation)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(job_id)
    .bind(entry.level)
    .bind(&entry.message)
    .bind(&entry.detail)
    .bind(&entry.subject)
    .bind(&entry.operation)
    .execute(pool)
    .await
    .context("failed to insert sync log entry")?;

    Ok(())
}
