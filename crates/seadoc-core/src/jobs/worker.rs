//! Background job worker.
//!
//! One worker task drains the job queue and processes each job's files
//! sequentially; concurrency lives inside the per-document chunk dispatch,
//! not across files. Original-file uploads are deferred to their own tasks
//! so a slow blob store never holds up the next file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::IngestError;
use crate::jobs::tracker::JobTracker;
use crate::jobs::types::{JobRequest, QueuedFile};
use crate::pipeline::{self, Deps};

const JOB_QUEUE_DEPTH: usize = 64;

/// Handle to the running worker: queue sender plus the shared tracker.
pub struct JobWorkerHandle {
    tx: mpsc::Sender<JobRequest>,
    tracker: JobTracker,
}

impl JobWorkerHandle {
    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    pub(crate) async fn enqueue(&self, request: JobRequest) -> anyhow::Result<()> {
        self.tx
            .send(request)
            .await
            .map_err(|_| IngestError::JobSetup("job worker is not running".to_string()))?;
        Ok(())
    }
}

/// Spawn the worker task. It runs until cancelled or the queue closes.
pub(crate) fn spawn_job_worker(deps: Arc<Deps>, cancel: CancellationToken) -> JobWorkerHandle {
    let (tx, mut rx) = mpsc::channel::<JobRequest>(JOB_QUEUE_DEPTH);
    let tracker = JobTracker::new();

    let worker_tracker = tracker.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Job worker shutting down");
                    break;
                }
                request = rx.recv() => match request {
                    Some(request) => process_job(&deps, &worker_tracker, request).await,
                    None => break,
                },
            }
        }
    });

    JobWorkerHandle { tx, tracker }
}

async fn process_job(deps: &Arc<Deps>, tracker: &JobTracker, request: JobRequest) {
    let job_id = request.job_id.clone();
    tracing::info!(job_id = %job_id, files = request.files.len(), "Processing job");

    // Setup failure fails the whole job; individual files are never started.
    let job_dir = deps.cfg.work_dir.join(&job_id);
    if let Err(e) = tokio::fs::create_dir_all(&job_dir).await {
        tracing::error!(job_id = %job_id, error = %e, "Job setup failed");
        tracker
            .fail_job(&job_id, format!("job setup failed: {e}"))
            .await;
        return;
    }
    tracker.mark_job_processing(&job_id).await;

    for (index, file) in request.files.iter().enumerate() {
        tracker.mark_file_processing(&job_id, index).await;
        tracker.report_progress(&job_id, index, 10).await;

        let file_dir = job_dir.join(index.to_string());
        stage_artifact(&file_dir, file).await;

        let progress = progress_reporter(tracker.clone(), job_id.clone(), index);
        let outcome = pipeline::run_document(
            deps,
            &file.content,
            &file.filename,
            &file.content_type,
            &request.ship_id,
            request.bypass_validation,
            &progress,
        )
        .await;

        match outcome {
            Ok(outcome) => {
                let record_id = outcome.record_id.clone();
                // Duplicates reuse the existing record's file; everything
                // else gets the original uploaded, even when analysis came
                // back incomplete and no record exists to attach it to.
                let upload_pending = outcome.duplicate_of.is_none();
                tracker
                    .mark_file_completed(&job_id, index, outcome, upload_pending)
                    .await;
                if upload_pending {
                    spawn_deferred_upload(
                        deps.clone(),
                        tracker.clone(),
                        job_id.clone(),
                        index,
                        record_id,
                        request.ship_id.clone(),
                        file.clone(),
                    );
                }
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, filename = %file.filename, error = %e, "File processing failed");
                tracker
                    .mark_file_failed(&job_id, index, format!("{e:#}"))
                    .await;
            }
        }

        cleanup_dir(&file_dir).await;
    }

    // Empty by now unless a file cleanup failed; those artifacts stay for
    // inspection and this remove is allowed to fail.
    if let Err(e) = tokio::fs::remove_dir(&job_dir).await {
        tracing::debug!(job_id = %job_id, error = %e, "Job work dir not removed");
    }
}

/// Progress callback bridging the synchronous pipeline checkpoints into the
/// async tracker.
fn progress_reporter(
    tracker: JobTracker,
    job_id: String,
    index: usize,
) -> impl Fn(u8) + Send + Sync {
    move |progress| {
        let tracker = tracker.clone();
        let job_id = job_id.clone();
        tokio::spawn(async move {
            tracker.report_progress(&job_id, index, progress).await;
        });
    }
}

/// Write the input bytes under the job work dir for inspection and recovery.
/// Best-effort: processing proceeds from memory either way.
async fn stage_artifact(dir: &Path, file: &QueuedFile) {
    let name: PathBuf = Path::new(&file.filename)
        .file_name()
        .map_or_else(|| "input".into(), Into::into);
    let result: std::io::Result<()> = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(name), &file.content).await
    }
    .await;
    if let Err(e) = result {
        tracing::warn!(filename = %file.filename, error = %e, "Failed to stage work artifact");
    }
}

async fn cleanup_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        tracing::warn!(dir = %dir.display(), error = %e, "Failed to clean up work artifacts");
    }
}

/// Upload the original file once processing settles. The file itself already
/// reads `Completed`; callers watch `deferred_upload_pending` to know when
/// the upload has resolved one way or the other. `record_id` is absent for
/// incomplete analyses, where the stored file id is the only reference a
/// caller has for manual entry.
fn spawn_deferred_upload(
    deps: Arc<Deps>,
    tracker: JobTracker,
    job_id: String,
    index: usize,
    record_id: Option<String>,
    ship_id: String,
    file: QueuedFile,
) {
    tokio::spawn(async move {
        let mut metadata = HashMap::new();
        metadata.insert("filename".to_string(), file.filename.clone());
        metadata.insert("job_id".to_string(), job_id.clone());

        match deps
            .blobs
            .upload(
                &ship_id,
                &file.content,
                &file.filename,
                &file.content_type,
                &metadata,
            )
            .await
        {
            Ok(stored) => {
                if let Some(record_id) = &record_id {
                    if let Err(e) = deps.records.attach_file(record_id, &stored.file_id).await {
                        tracing::warn!(record_id = %record_id, error = %e, "Failed to attach uploaded file");
                    }
                }
                tracker
                    .record_uploaded_file(&job_id, index, &stored.file_id)
                    .await;
            }
            Err(e) => {
                tracing::warn!(filename = %file.filename, error = %e, "Deferred upload failed");
                if let Some(record_id) = &record_id {
                    if let Err(e) = deps
                        .records
                        .set_upload_error(record_id, &format!("{e:#}"))
                        .await
                    {
                        tracing::warn!(record_id = %record_id, error = %e, "Failed to record upload error");
                    }
                }
            }
        }
        tracker.clear_deferred_upload(&job_id, index).await;
    });
}
