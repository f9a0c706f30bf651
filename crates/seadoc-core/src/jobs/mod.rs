//! Background job tracking and processing for slow-path ingestion.

mod tracker;
mod types;
mod worker;

pub use tracker::JobTracker;
pub use types::{
    BackgroundJob, FileJobState, FileOutcome, FileStatus, JobHandle, JobRequest, JobStatus,
    QueuedFile,
};
pub use worker::JobWorkerHandle;

pub(crate) use worker::spawn_job_worker;
