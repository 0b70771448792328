//! Row models for sync jobs and their persisted log trail.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

/// Lifecycle of a sync job.
///
/// `Cancelled` is terminal but never entered by the pipeline itself; it is
/// reserved for external administrative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "sync_job_status", rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether `next` is a legal successor state. Terminal states accept no
    /// transitions; `Cancelled` is reachable only from non-terminal states.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Pending, JobStatus::Cancelled)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
                | (JobStatus::Running, JobStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One orchestration run, as stored.
#[derive(Debug, Clone, FromRow)]
pub struct SyncJob {
    pub id: i64,
    pub status: JobStatus,
    pub subjects: Vec<String>,
    pub total_subjects: i32,
    pub completed_subjects: i32,
    pub current_subject: Option<String>,
    pub sections_fetched: i32,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Progress counters written between subjects while a job runs.
#[derive(Debug, Clone)]
pub struct JobProgress {
    pub completed_subjects: i32,
    pub current_subject: Option<String>,
    pub sections_fetched: i32,
}

/// Severity of a persisted log entry. Distinct from `tracing` levels; these
/// rows are the job's durable diagnostic trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "sync_log_level", rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// A log row to append. Built with the `with_*` helpers so call sites only
/// name the fields they carry.
#[derive(Debug, Clone)]
pub struct NewLogEntry {
    pub level: LogLevel,
    pub message: String,
    pub detail: Option<Value>,
    pub subject: Option<String>,
    pub operation: Option<String>,
}

impl NewLogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            detail: None,
            subject: None,
            operation: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }
}
