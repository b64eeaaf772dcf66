use std::time::Duration;

use serde::Serialize;

/// Lifecycle of a job run.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Outcome of one job run.
///
/// Only the runner builds and updates it; callers receive a finished copy.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackfillJobResult {
    job_name: String,
    status: JobStatus,
    total_items: usize,
    items_processed: usize,
    duration_seconds: f64,
    error: Option<String>,
}

impl BackfillJobResult {
    pub(crate) fn pending(job_name: &str) -> Self {
        Self {
            job_name: job_name.to_string(),
            status: JobStatus::Pending,
            total_items: 0,
            items_processed: 0,
            duration_seconds: 0.0,
            error: None,
        }
    }

    pub(crate) fn start(&mut self) {
        self.status = JobStatus::Running;
    }

    pub(crate) fn set_total(&mut self, total: usize) {
        self.total_items = total;
    }

    pub(crate) fn add_processed(&mut self, processed: usize) {
        self.items_processed += processed;
    }

    pub(crate) fn finish(mut self, status: JobStatus, elapsed: Duration) -> Self {
        self.status = status;
        self.duration_seconds = elapsed.as_secs_f64();
        self
    }

    pub(crate) fn fail(mut self, error: String, elapsed: Duration) -> Self {
        self.error = Some(error);
        self.finish(JobStatus::Failed, elapsed)
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn items_processed(&self) -> usize {
        self.items_processed
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
