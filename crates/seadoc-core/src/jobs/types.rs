//! Background job state types.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collab::DocumentFields;
use crate::pipeline::types::MergedSummary;

/// Status of one file within a background job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum FileStatus {
    /// Queued, not yet started.
    Pending,
    /// Currently running the slow-path pipeline.
    Processing,
    /// Structured record durably created (or duplicate detected). Terminal.
    Completed,
    /// Processing failed. Terminal.
    Failed { error: String },
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Completed | FileStatus::Failed { .. })
    }
}

/// Overall status of a background job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum JobStatus {
    Pending,
    Processing,
    /// All files reached a terminal status (individual files may have failed).
    Completed,
    /// Job-level setup failed before any file started.
    Failed { error: String },
}

/// Outcome of one successfully processed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileOutcome {
    pub summary: MergedSummary,
    /// Extracted fields, absent when analysis was incomplete.
    pub fields: Option<DocumentFields>,
    /// Created record id, absent for duplicates and incomplete analyses.
    pub record_id: Option<String>,
    /// Id of the existing record this file duplicated, if any.
    pub duplicate_of: Option<String>,
    /// Stored original file. Filled in once the deferred upload resolves,
    /// including for incomplete analyses, so manual entry can still reach
    /// the document.
    pub file_id: Option<String>,
    /// Degradation note (e.g. field extraction unavailable).
    pub warning: Option<String>,
}

/// Per-file state within a background job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileJobState {
    pub index: usize,
    pub filename: String,
    pub status: FileStatus,
    /// 0-100, monotonically non-decreasing.
    pub progress: u8,
    pub result: Option<FileOutcome>,
    /// True while the original-file upload is still in flight.
    pub deferred_upload_pending: bool,
}

/// A tracked multi-file slow-path job. Snapshots of this are what callers
/// poll; the tracker owns the live state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundJob {
    pub job_id: String,
    pub ship_id: String,
    pub files: Vec<FileJobState>,
    pub overall_status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// Handle returned to callers for polling a queued job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
}

/// A file queued for slow-path processing.
#[derive(Debug, Clone)]
pub struct QueuedFile {
    pub filename: String,
    pub content_type: String,
    pub content: Bytes,
}

/// Work item for the job worker.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub job_id: String,
    pub ship_id: String,
    pub files: Vec<QueuedFile>,
    /// Skip the duplicate check for every file in the batch.
    pub bypass_validation: bool,
}
