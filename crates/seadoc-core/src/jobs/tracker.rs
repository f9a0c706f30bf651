//! Background job tracking.
//!
//! The tracker exclusively owns job state for the job's lifetime; callers
//! only read snapshots by id. Per-file progress is monotonic: a report lower
//! than the recorded value is ignored.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use super::types::{BackgroundJob, FileJobState, FileOutcome, FileStatus, JobStatus};

/// Tracks background jobs in memory.
#[derive(Clone, Default)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<String, BackgroundJob>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a job with all files pending. Returns the job id.
    pub async fn create_job(&self, ship_id: &str, filenames: &[String]) -> String {
        let job_id = uuid::Uuid::new_v4().to_string();
        let job = BackgroundJob {
            job_id: job_id.clone(),
            ship_id: ship_id.to_string(),
            files: filenames
                .iter()
                .enumerate()
                .map(|(index, filename)| FileJobState {
                    index,
                    filename: filename.clone(),
                    status: FileStatus::Pending,
                    progress: 0,
                    result: None,
                    deferred_upload_pending: false,
                })
                .collect(),
            overall_status: JobStatus::Pending,
            created_at: Utc::now(),
        };

        self.jobs.write().await.insert(job_id.clone(), job);
        tracing::info!(job_id = %job_id, ship_id, files = filenames.len(), "Created background job");
        job_id
    }

    /// Read a snapshot of a job.
    pub async fn snapshot(&self, job_id: &str) -> Option<BackgroundJob> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Mark the job as processing (first file about to start).
    pub async fn mark_job_processing(&self, job_id: &str) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            job.overall_status = JobStatus::Processing;
        }
    }

    /// Fail the whole job before any file started (setup error).
    pub async fn fail_job(&self, job_id: &str, error: String) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            tracing::error!(job_id, error = %error, "Job setup failed");
            job.overall_status = JobStatus::Failed { error };
        }
    }

    pub async fn mark_file_processing(&self, job_id: &str, index: usize) {
        let mut jobs = self.jobs.write().await;
        if let Some(file) = jobs.get_mut(job_id).and_then(|j| j.files.get_mut(index)) {
            file.status = FileStatus::Processing;
        }
    }

    /// Record per-file progress. Reports lower than the current value are
    /// ignored to keep progress monotonic under out-of-order reporting.
    pub async fn report_progress(&self, job_id: &str, index: usize, progress: u8) {
        let mut jobs = self.jobs.write().await;
        if let Some(file) = jobs.get_mut(job_id).and_then(|j| j.files.get_mut(index)) {
            if progress > file.progress {
                file.progress = progress.min(100);
            }
        }
    }

    /// Mark a file completed. `upload_pending` flags a deferred upload of
    /// the original file still in flight.
    pub async fn mark_file_completed(
        &self,
        job_id: &str,
        index: usize,
        outcome: FileOutcome,
        upload_pending: bool,
    ) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            if let Some(file) = job.files.get_mut(index) {
                file.status = FileStatus::Completed;
                file.progress = 100;
                file.result = Some(outcome);
                file.deferred_upload_pending = upload_pending;
            }
            recompute_overall(job);
        }
    }

    pub async fn mark_file_failed(&self, job_id: &str, index: usize, error: String) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(job_id) {
            if let Some(file) = job.files.get_mut(index) {
                file.status = FileStatus::Failed { error };
                file.result = None;
            }
            recompute_overall(job);
        }
    }

    /// Record the stored file id on a completed file's result.
    pub async fn record_uploaded_file(&self, job_id: &str, index: usize, file_id: &str) {
        let mut jobs = self.jobs.write().await;
        if let Some(file) = jobs.get_mut(job_id).and_then(|j| j.files.get_mut(index)) {
            if let Some(result) = file.result.as_mut() {
                result.file_id = Some(file_id.to_string());
            }
        }
    }

    /// Clear a file's deferred-upload flag after the upload resolved.
    ///
    /// The file stays `Completed` either way; an upload failure is recorded
    /// on the stored record, not here.
    pub async fn clear_deferred_upload(&self, job_id: &str, index: usize) {
        let mut jobs = self.jobs.write().await;
        if let Some(file) = jobs.get_mut(job_id).and_then(|j| j.files.get_mut(index)) {
            file.deferred_upload_pending = false;
        }
    }

    /// Whether every file is terminal and no deferred upload is in flight.
    pub async fn is_settled(&self, job_id: &str) -> bool {
        let jobs = self.jobs.read().await;
        jobs.get(job_id).is_some_and(|job| {
            job.files
                .iter()
                .all(|f| f.status.is_terminal() && !f.deferred_upload_pending)
        })
    }

    /// Remove a job once it is fully settled. Returns true if removed.
    pub async fn remove_settled(&self, job_id: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        let settled = jobs.get(job_id).is_some_and(|job| {
            job.files
                .iter()
                .all(|f| f.status.is_terminal() && !f.deferred_upload_pending)
        });
        if settled {
            jobs.remove(job_id);
        }
        settled
    }
}

/// Derive the overall status from per-file states. A setup failure
/// (`JobStatus::Failed`) is sticky and never recomputed.
fn recompute_overall(job: &mut BackgroundJob) {
    if matches!(job.overall_status, JobStatus::Failed { .. }) {
        return;
    }
    if job.files.iter().all(|f| f.status.is_terminal()) {
        job.overall_status = JobStatus::Completed;
    } else {
        job.overall_status = JobStatus::Processing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::merge;

    fn outcome() -> FileOutcome {
        FileOutcome {
            summary: merge::single("text", 1),
            fields: None,
            record_id: Some("rec-1".to_string()),
            duplicate_of: None,
            file_id: None,
            warning: None,
        }
    }

    #[tokio::test]
    async fn progress_is_monotonic() {
        let tracker = JobTracker::new();
        let job_id = tracker.create_job("ship-1", &["a.pdf".to_string()]).await;

        tracker.report_progress(&job_id, 0, 70).await;
        tracker.report_progress(&job_id, 0, 50).await;

        let job = tracker.snapshot(&job_id).await.unwrap();
        assert_eq!(job.files[0].progress, 70);

        tracker.report_progress(&job_id, 0, 90).await;
        let job = tracker.snapshot(&job_id).await.unwrap();
        assert_eq!(job.files[0].progress, 90);
    }

    #[tokio::test]
    async fn file_failure_is_isolated_and_overall_completes() {
        let tracker = JobTracker::new();
        let job_id = tracker
            .create_job("ship-1", &["a.pdf".to_string(), "b.pdf".to_string()])
            .await;
        tracker.mark_job_processing(&job_id).await;

        tracker
            .mark_file_failed(&job_id, 0, "bad scan".to_string())
            .await;
        let job = tracker.snapshot(&job_id).await.unwrap();
        assert_eq!(job.overall_status, JobStatus::Processing);

        tracker
            .mark_file_completed(&job_id, 1, outcome(), false)
            .await;
        let job = tracker.snapshot(&job_id).await.unwrap();
        assert_eq!(job.overall_status, JobStatus::Completed);
        assert!(matches!(job.files[0].status, FileStatus::Failed { .. }));
        assert_eq!(job.files[1].status, FileStatus::Completed);
    }

    #[tokio::test]
    async fn setup_failure_is_sticky() {
        let tracker = JobTracker::new();
        let job_id = tracker.create_job("ship-1", &["a.pdf".to_string()]).await;

        tracker.fail_job(&job_id, "owner not found".to_string()).await;
        // A straggling file update must not resurrect the job
        tracker
            .mark_file_completed(&job_id, 0, outcome(), false)
            .await;

        let job = tracker.snapshot(&job_id).await.unwrap();
        assert!(matches!(job.overall_status, JobStatus::Failed { .. }));
        // File states were not part of the setup failure
        assert_eq!(job.files[0].status, FileStatus::Completed);
    }

    #[tokio::test]
    async fn completed_file_with_pending_upload_is_not_settled() {
        let tracker = JobTracker::new();
        let job_id = tracker.create_job("ship-1", &["a.pdf".to_string()]).await;

        tracker
            .mark_file_completed(&job_id, 0, outcome(), true)
            .await;
        assert!(!tracker.is_settled(&job_id).await);
        assert!(!tracker.remove_settled(&job_id).await);

        tracker.clear_deferred_upload(&job_id, 0).await;
        assert!(tracker.is_settled(&job_id).await);
        assert!(tracker.remove_settled(&job_id).await);
        assert!(tracker.snapshot(&job_id).await.is_none());
    }

    #[tokio::test]
    async fn uploaded_file_id_lands_on_the_result() {
        let tracker = JobTracker::new();
        let job_id = tracker.create_job("ship-1", &["a.pdf".to_string()]).await;

        tracker
            .mark_file_completed(&job_id, 0, outcome(), true)
            .await;
        tracker.record_uploaded_file(&job_id, 0, "file-9").await;
        tracker.clear_deferred_upload(&job_id, 0).await;

        let job = tracker.snapshot(&job_id).await.unwrap();
        let result = job.files[0].result.as_ref().unwrap();
        assert_eq!(result.file_id.as_deref(), Some("file-9"));
        assert!(tracker.is_settled(&job_id).await);
    }

    #[tokio::test]
    async fn snapshot_of_unknown_job_is_none() {
        let tracker = JobTracker::new();
        assert!(tracker.snapshot("nope").await.is_none());
    }
}
