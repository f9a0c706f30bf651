//! Document ingestion for ship certificates.
//!
//! Uploaded certificate documents are routed between a synchronous fast path
//! for PDFs with a usable text layer and a queued slow path that splits,
//! OCRs, and merges everything else. Both paths end in structured field
//! extraction, duplicate detection, record creation, and original-file
//! storage.
//!
//! [`Ingestor`] is the entry point; callers supply the AI and storage
//! collaborators through the traits in [`collab`].

pub mod collab;
pub mod config;
pub mod dedup;
pub mod error;
pub mod jobs;
pub mod pdf;
pub mod pipeline;
pub mod quality;
pub mod route;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::PipelineConfig;
pub use error::IngestError;
pub use jobs::{BackgroundJob, JobHandle, JobStatus};
pub use pipeline::{IngestOptions, IngestOutcome, Ingestor, SyncResult};
