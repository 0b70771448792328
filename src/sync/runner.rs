//! The sync state machine: guard, create, authenticate, iterate, persist.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::catalog::{CourseCatalog, EnrollmentStats, SectionRecord, Session};
use crate::data::{JobProgress, LogLevel, NewLogEntry, SyncJob, SyncStore};

/// A `running` job younger than this blocks new invocations.
pub const GUARD_WINDOW_MINUTES: i64 = 10;

/// Section records per upsert statement.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Result of one invocation. `Failed` is an outcome, not an `Err`: the job
/// row records the failure and the caller only maps it to an exit code.
/// `Err` from [`SyncRunner::run`] is reserved for infrastructure failures
/// before a job row exists.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed { job_id: i64, sections_fetched: usize },
    Failed { job_id: i64, error: String },
    AlreadyRunning { job_id: i64 },
}

/// Whether an existing running job is recent enough to reject a new run.
///
/// Read-then-act with no lock underneath: two invocations in the same
/// instant can both pass. Accepted risk given the external cadence.
fn guard_blocks(job: &SyncJob, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(job.started_at) < chrono::Duration::minutes(GUARD_WINDOW_MINUTES)
}

/// Drives one full sync run: a single session, sequential subject and term
/// iteration, one in-memory accumulator, and a batched write phase at the
/// end. Subjects and terms are injected so tests can supply small fixtures.
pub struct SyncRunner<C, S> {
    catalog: C,
    store: S,
    subjects: Vec<String>,
    terms: Vec<String>,
    subject_delay: Duration,
}

impl<C, S> SyncRunner<C, S>
where
    C: CourseCatalog,
    S: SyncStore,
{
    pub fn new(
        catalog: C,
        store: S,
        subjects: Vec<String>,
        terms: Vec<String>,
        subject_delay: Duration,
    ) -> Self {
        Self {
            catalog,
            store,
            subjects,
            terms,
            subject_delay,
        }
    }

    /// Executes the run. Per-subject/term failures degrade the snapshot;
    /// session and persistence failures fail the whole job.
    pub async fn run(&self) -> Result<SyncOutcome> {
        if let Some(job) = self.store.latest_running_job().await? {
            if guard_blocks(&job, Utc::now()) {
                warn!(
                    job_id = job.id,
                    started_at = %job.started_at,
                    "Another sync job is already running, rejecting invocation"
                );
                return Ok(SyncOutcome::AlreadyRunning { job_id: job.id });
            }
            info!(
                job_id = job.id,
                started_at = %job.started_at,
                "Ignoring running job outside the guard window"
            );
        }

        let job_id = self.store.create_job(&self.subjects).await?;
        info!(
            job_id,
            subjects = self.subjects.len(),
            terms = self.terms.len(),
            "Sync run started"
        );
        self.log(
            job_id,
            NewLogEntry::new(LogLevel::Info, "Sync started")
                .with_detail(json!({
                    "subjects": self.subjects.len(),
                    "terms": self.terms.len(),
                }))
                .with_operation("start"),
        )
        .await;

        let session = match self.catalog.acquire_session().await {
            Ok(session) => session,
            Err(e) => {
                let err = anyhow::Error::from(e);
                let message = format!("Session initialization failed: {err:#}");
                return Ok(self.fail(job_id, "session", message).await);
            }
        };
        self.log(
            job_id,
            NewLogEntry::new(LogLevel::Info, "Session acquired").with_operation("session"),
        )
        .await;

        let mut records: Vec<SectionRecord> = Vec::new();
        let total = self.subjects.len();
        for (index, subject) in self.subjects.iter().enumerate() {
            self.write_progress(
                job_id,
                JobProgress {
                    completed_subjects: index as i32,
                    current_subject: Some(subject.clone()),
                    sections_fetched: records.len() as i32,
                },
            )
            .await;

            let mut subject_sections = 0usize;
            for term in &self.terms {
                match self.fetch_subject_term(&session, subject, term).await {
                    Ok(mut found) => {
                        debug!(
                            subject = %subject,
                            term = %term,
                            sections = found.len(),
                            "Fetched subject term"
                        );
                        subject_sections += found.len();
                        records.append(&mut found);
                    }
                    Err(e) => {
                        let err = anyhow::Error::from(e);
                        warn!(
                            subject = %subject,
                            term = %term,
                            error = ?err,
                            "Subject fetch failed, skipping term"
                        );
                        self.log(
                            job_id,
                            NewLogEntry::new(
                                LogLevel::Warning,
                                format!("Failed to fetch subject {subject} term {term}: {err:#}"),
                            )
                            .with_subject(subject.clone())
                            .with_operation("fetch")
                            .with_detail(json!({ "term": term })),
                        )
                        .await;
                    }
                }
            }

            self.log(
                job_id,
                NewLogEntry::new(LogLevel::Debug, format!("Finished subject {subject}"))
                    .with_subject(subject.clone())
                    .with_operation("fetch")
                    .with_detail(json!({ "sections": subject_sections })),
            )
            .await;
            self.write_progress(
                job_id,
                JobProgress {
                    completed_subjects: (index + 1) as i32,
                    current_subject: Some(subject.clone()),
                    sections_fetched: records.len() as i32,
                },
            )
            .await;

            if index + 1 < total {
                tokio::time::sleep(self.subject_delay).await;
            }
        }

        if !records.is_empty() {
            let batches = records.len().div_ceil(UPSERT_BATCH_SIZE);
            info!(
                job_id,
                sections = records.len(),
                batches,
                "Persisting fetched sections"
            );
            self.log(
                job_id,
                NewLogEntry::new(
                    LogLevel::Info,
                    format!(
                        "Persisting {} sections in {} batches",
                        records.len(),
                        batches
                    ),
                )
                .with_operation("persist"),
            )
            .await;

            for batch in records.chunks(UPSERT_BATCH_SIZE) {
                if let Err(e) = self.store.upsert_sections(job_id, batch).await {
                    let message = format!("Failed to persist sections: {e:#}");
                    return Ok(self.fail(job_id, "persist", message).await);
                }
            }
        }

        let fetched = records.len();
        let stats = EnrollmentStats::from_sections(&records);
        self.log(
            job_id,
            NewLogEntry::new(LogLevel::Info, "Sync completed")
                .with_detail(json!({ "sections_fetched": fetched, "stats": stats }))
                .with_operation("complete"),
        )
        .await;
        match self.store.complete_job(job_id, fetched as i32).await {
            Ok(true) => {}
            Ok(false) => warn!(job_id, "Job left running status before completion"),
            Err(e) => error!(job_id, error = ?e, "Failed to mark job completed"),
        }
        info!(job_id, sections_fetched = fetched, "Sync run completed");

        Ok(SyncOutcome::Completed {
            job_id,
            sections_fetched: fetched,
        })
    }

    /// Search one subject under one term and fetch details for every match.
    /// Any error discards the pair's partial results; the caller logs and
    /// moves on.
    async fn fetch_subject_term(
        &self,
        session: &Session,
        subject: &str,
        term: &str,
    ) -> Result<Vec<SectionRecord>, crate::catalog::CatalogError> {
        let matches = self.catalog.search(session, subject, term).await?;
        let mut records = Vec::new();
        for course in matches {
            if course.section_ids.is_empty() {
                continue;
            }
            let mut sections = self
                .catalog
                .section_details(session, &course.course_id, &course.section_ids)
                .await?;
            records.append(&mut sections);
        }
        Ok(records)
    }

    /// Marks the job failed and returns the failure outcome. Status-write
    /// errors are logged but cannot change the outcome.
    async fn fail(&self, job_id: i64, operation: &str, message: String) -> SyncOutcome {
        error!(job_id, %message, "Sync run failed");
        self.log(
            job_id,
            NewLogEntry::new(LogLevel::Error, message.clone()).with_operation(operation),
        )
        .await;
        match self.store.fail_job(job_id, &message).await {
            Ok(true) => {}
            Ok(false) => warn!(job_id, "Job left running status before failure write"),
            Err(e) => error!(job_id, error = ?e, "Failed to mark job failed"),
        }
        SyncOutcome::Failed {
            job_id,
            error: message,
        }
    }

    async fn write_progress(&self, job_id: i64, progress: JobProgress) {
        if let Err(e) = self.store.update_progress(job_id, &progress).await {
            warn!(job_id, error = ?e, "Failed to update job progress");
        }
    }

    /// Appends to the persisted log trail. Write failures are swallowed;
    /// logging never aborts the pipeline.
    async fn log(&self, job_id: i64, entry: NewLogEntry) {
        if let Err(e) = self.store.append_log(job_id, &entry).await {
            warn!(job_id, error = ?e, "Failed to write sync log entry");
        }
    }
}
