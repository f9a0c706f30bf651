//! Ingestion error taxonomy.
//!
//! Input errors are rejected before any pipeline stage runs and are never
//! retried. Probe and per-chunk failures deliberately do *not* appear here:
//! probe failures degrade to the slow path and chunk failures are recorded in
//! their `ChunkResult`, per the partial-failure design.

use thiserror::Error;

/// Errors surfaced to callers of the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("uploaded file is empty")]
    EmptyFile,

    #[error("file exceeds maximum size: {size} bytes (max {max})")]
    FileTooLarge { size: u64, max: u64 },

    #[error("unsupported file type: .{extension}")]
    UnsupportedFileType { extension: String },

    #[error("file content does not match its declared type")]
    InvalidMagic,

    #[error("record already exists: {record_id}")]
    DuplicateRecord { record_id: String },

    #[error("job setup failed: {0}")]
    JobSetup(String),

    #[error("extraction failed: no chunk produced text")]
    ExtractionFailed,
}

impl IngestError {
    /// True for errors detected before any pipeline stage ran.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyFile
                | Self::FileTooLarge { .. }
                | Self::UnsupportedFileType { .. }
                | Self::InvalidMagic
        )
    }
}
