//! Section snapshot persistence: whole-row upserts keyed by section id.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::catalog::SectionRecord;

/// Upsert one batch of section records in a single statement, one array bind
/// per column, stamping every row with `job_id` and a server-side timestamp.
///
/// When a batch carries the same section id more than once, only the last
/// occurrence survives; Postgres rejects multi-row inserts that touch one
/// conflict target twice.
pub async fn upsert_batch(pool: &PgPool, job_id: i64, records: &[SectionRecord]) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }

    let section_ids: Vec<&str> = records.iter().map(|r| r.section_id.as_str()).collect();
    let course_ids: Vec<&str> = records.iter().map(|r| r.course_id.as_str()).collect();
    let subject_codes: Vec<&str> = records.iter().map(|r| r.subject_code.as_str()).collect();
    let course_numbers: Vec<&str> = records.iter().map(|r| r.course_number.as_str()).collect();
    let section_numbers: Vec<&str> = records.iter().map(|r| r.section_number.as_str()).collect();
    let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
    let available: Vec<i32> = records.iter().map(|r| r.available).collect();
    let capacity: Vec<i32> = records.iter().map(|r| r.capacity).collect();
    let enrolled: Vec<i32> = records.iter().map(|r| r.enrolled).collect();
    let waitlisted: Vec<i32> = records.iter().map(|r| r.waitlisted).collect();
    let start_dates: Vec<Option<&str>> = records.iter().map(|r| r.start_date.as_deref()).collect();
    let end_dates: Vec<Option<&str>> = records.iter().map(|r| r.end_date.as_deref()).collect();
    let locations: Vec<Option<&str>> = records.iter().map(|r| r.location.as_deref()).collect();
    let credits: Vec<Option<f64>> = records.iter().map(|r| r.credits).collect();
    let terms: Vec<Option<&str>> = records.iter().map(|r| r.term.as_deref()).collect();
    let meeting_times: Vec<serde_json::Value> = records
        .iter()
        .map(|r| serde_json::to_value(&r.meeting_times))
        .collect::<Result<_, _>>()
        .context("failed to serialize meeting times")?;
    let instructors: Vec<serde_json::Value> = records
        .iter()
        .map(|r| serde_json::to_value(&r.instructors))
        .collect::<Result<_, _>>()
        .context("failed to serialize instructors")?;

    sqlx::query(
        r#"
        INSERT INTO sections (
            section_id, course_id, subject_code, course_number, section_number,
            title, available, capacity, enrolled, waitlisted,
            start_date, end_date, location, credits, term,
            meeting_times, instructors, sync_job_id, synced_at
        )
        SELECT DISTINCT ON (data.section_id)
            data.section_id, data.course_id, data.subject_code, data.course_number,
            data.section_number, data.title, data.available, data.capacity,
            data.enrolled, data.waitlisted, data.start_date, data.end_date,
            data.location, data.credits, data.term,
            data.meeting_times, data.instructors, $18, NOW()
        FROM UNNEST(
            $1::text[], $2::text[], $3::text[], $4::text[], $5::text[],
            $6::text[], $7::int[], $8::int[], $9::int[], $10::int[],
            $11::text[], $12::text[], $13::text[], $14::float8[], $15::text[],
            $16::jsonb[], $17::jsonb[]
        ) WITH ORDINALITY AS data(
            section_id, course_id, subject_code, course_number, section_number,
            title, available, capacity, enrolled, waitlisted,
            start_date, end_date, location, credits, term,
            meeting_times, instructors, ord
        )
        ORDER BY data.section_id, data.ord DESC
        ON CONFLICT (section_id) DO UPDATE SET
            course_id = EXCLUDED.course_id,
            subject_code = EXCLUDED.subject_code,
            course_number = EXCLUDED.course_number,
            section_number = EXCLUDED.section_number,
            title = EXCLUDED.title,
            available = EXCLUDED.available,
            capacity = EXCLUDED.capacity,
            enrolled = EXCLUDED.enrolled,
            waitlisted = EXCLUDED.waitlisted,
            start_date = EXCLUDED.start_date,
            end_date = EXCLUDED.end_date,
            location = EXCLUDED.location,
            credits = EXCLUDED.credits,
            term = EXCLUDED.term,
            meeting_times = EXCLUDED.meeting_times,
            instructors = EXCLUDED.instructors,
            sync_job_id = EXCLUDED.sync_job_id,
            synced_at = EXCLUDED.synced_at
        "#,
    )
    .bind(&section_ids)
    .bind(&course_ids)
    .bind(&subject_codes)
    .bind(&course_numbers)
    .bind(&section_numbers)
    .bind(&titles)
    .bind(&available)
    .bind(&capacity)
    .bind(&enrolled)
    .bind(&waitlisted)
    .bind(&start_dates)
    .bind(&end_dates)
    .bind(&locations)
    .bind(&credits)
    .bind(&terms)
    .bind(&meeting_times)
    .bind(&instructors)
    .bind(job_id)
    .execute(pool)
    .await
    .context("failed to upsert section batch")?;

    Ok(())
}
