use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Newest-first log is truncated to this many entries.
pub const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Cancelled,
    Error,
}

impl JobStatus {
    /// Statuses that block a new job from starting for the same tenant.
    pub const ACTIVE: [JobStatus; 3] = [JobStatus::Pending, JobStatus::Running, JobStatus::Paused];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Error => "error",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "paused" => Some(JobStatus::Paused),
            "completed" => Some(JobStatus::Completed),
            "cancelled" => Some(JobStatus::Cancelled),
            "error" => Some(JobStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !Self::ACTIVE.contains(self)
    }
}

/// How each page's skills are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Free-text fields go through the LLM extractor.
    #[default]
    Ai,
    /// The pipe-delimited hard-skill column is imported as-is.
    Direct,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMode::Ai => "ai",
            ExtractionMode::Direct => "direct",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ai" => Some(ExtractionMode::Ai),
            "direct" => Some(ExtractionMode::Direct),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: LogSeverity,
}

impl JobLogEntry {
    pub fn new(severity: LogSeverity, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            message: message.into(),
            severity,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogSeverity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogSeverity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogSeverity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogSeverity::Error, message)
    }
}

/// Counter increments produced by one page. Always added, never assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressDelta {
    pub processed_collaborators: i32,
    pub skills_extracted: i32,
    pub skills_created: i32,
    pub users_created: i32,
    pub errors: i32,
}

/// Persisted state of one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub status: JobStatus,
    pub mode: ExtractionMode,
    pub total_collaborators: i32,
    pub total_batches: i32,
    pub current_batch_index: i32,
    pub processed_collaborators: i32,
    pub skills_extracted: i32,
    pub skills_created: i32,
    pub users_created: i32,
    pub errors: i32,
    /// Newest first, at most `MAX_LOG_ENTRIES`.
    pub logs: Vec<JobLogEntry>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BatchJob {
    pub fn new(tenant_id: Uuid, mode: ExtractionMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            status: JobStatus::Pending,
            mode,
            total_collaborators: 0,
            total_batches: 0,
            current_batch_index: 0,
            processed_collaborators: 0,
            skills_extracted: 0,
            skills_created: 0,
            users_created: 0,
            errors: 0,
            logs: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn push_log(&mut self, entry: JobLogEntry) {
        self.logs.insert(0, entry);
        self.logs.truncate(MAX_LOG_ENTRIES);
    }

    pub fn apply_progress(&mut self, delta: &ProgressDelta) {
        self.processed_collaborators += delta.processed_collaborators;
        self.skills_extracted += delta.skills_extracted;
        self.skills_created += delta.skills_created;
        self.users_created += delta.users_created;
        self.errors += delta.errors;
    }

    /// Moves to `to`, stamping completion data when `to` is terminal.
    pub fn set_status(&mut self, to: JobStatus) {
        self.status = to;
        if to.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        if to == JobStatus::Completed {
            self.current_batch_index = self.total_batches;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_newest_first_and_bounded() {
        let mut job = BatchJob::new(Uuid::new_v4(), ExtractionMode::Ai);
        for i in 0..(MAX_LOG_ENTRIES + 20) {
            job.push_log(JobLogEntry::info(format!("page {i}")));
        }
        assert_eq!(job.logs.len(), MAX_LOG_ENTRIES);
        assert_eq!(job.logs[0].message, format!("page {}", MAX_LOG_ENTRIES + 19));
        assert_eq!(job.logs[MAX_LOG_ENTRIES - 1].message, "page 20");
    }

    #[test]
    fn test_apply_progress_accumulates() {
        let mut job = BatchJob::new(Uuid::new_v4(), ExtractionMode::Ai);
        let delta = ProgressDelta {
            processed_collaborators: 25,
            skills_extracted: 40,
            skills_created: 10,
            users_created: 5,
            errors: 1,
        };
        job.apply_progress(&delta);
        job.apply_progress(&delta);
        assert_eq!(job.processed_collaborators, 50);
        assert_eq!(job.skills_extracted, 80);
        assert_eq!(job.skills_created, 20);
        assert_eq!(job.users_created, 10);
        assert_eq!(job.errors, 2);
    }

    #[test]
    fn test_completed_sets_current_batch_to_total() {
        let mut job = BatchJob::new(Uuid::new_v4(), ExtractionMode::Direct);
        job.total_batches = 4;
        job.current_batch_index = 3;
        job.set_status(JobStatus::Completed);
        assert_eq!(job.current_batch_index, 4);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_active_statuses_are_not_terminal() {
        for status in JobStatus::ACTIVE {
            assert!(!status.is_terminal());
        }
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::Error.is_terminal());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [JobStatus::Pending, JobStatus::Paused, JobStatus::Error] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("unknown"), None);
    }
}
