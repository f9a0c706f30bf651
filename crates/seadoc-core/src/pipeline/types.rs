//! Pipeline value types.
//!
//! Every stage hands the next one a typed value; raw collaborator payloads
//! never cross a stage boundary.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Which processing route a document takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingPath {
    /// Reuse the existing digital text layer, skipping extraction.
    FastPath,
    /// Full document extraction, optionally after splitting.
    SlowPath,
}

impl std::fmt::Display for ProcessingPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingPath::FastPath => write!(f, "fast_path"),
            ProcessingPath::SlowPath => write!(f, "slow_path"),
        }
    }
}

/// Routing decision for one document. Immutable once computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathDecision {
    pub path: ProcessingPath,
    /// Human-readable explanation of why this route was chosen.
    pub reason: String,
    /// Probe result when one was available, reusable by later stages.
    pub probe: Option<crate::pdf::ProbeResult>,
    /// Whether the document must be split before dispatch.
    pub needs_split: bool,
}

/// Inclusive 1-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    pub fn page_count(&self) -> usize {
        self.end - self.start + 1
    }
}

impl std::fmt::Display for PageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// A page-bounded standalone sub-document ready for independent extraction.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position in the split sequence; the sole ordering key downstream.
    pub index: usize,
    pub pages: PageRange,
    pub content: Bytes,
    /// Content-derived id for logging and correlation.
    pub chunk_id: String,
}

/// Outcome of one dispatched (or capped) chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ChunkStatus {
    /// Extraction produced text.
    Success { text: String },
    /// Extraction failed or timed out; the index is kept so the merge can
    /// report the gap.
    Failed { error: String },
    /// Beyond the dispatch cap: never attempted, never retried.
    Skipped,
}

/// One result per chunk the coordinator was asked about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResult {
    pub chunk_index: usize,
    pub pages: PageRange,
    #[serde(flatten)]
    pub status: ChunkStatus,
}

impl ChunkResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ChunkStatus::Success { .. })
    }
}

/// The single consolidated text artifact for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedSummary {
    pub text: String,
    pub total_pages: usize,
    pub successful_chunks: usize,
    pub failed_chunks: usize,
    pub skipped_chunks: usize,
    /// Whether supplementary header/footer OCR sections were appended.
    pub ocr_merged: bool,
}

impl MergedSummary {
    /// True when no chunk produced any text.
    pub fn all_failed(&self) -> bool {
        self.successful_chunks == 0
    }
}

/// Synchronous result of a fast-path ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub summary: MergedSummary,
    /// Extracted structured fields, absent when analysis was incomplete.
    pub fields: Option<crate::collab::DocumentFields>,
    /// Created record id, absent when field extraction found nothing.
    pub record_id: Option<String>,
    /// Uploaded original file id, absent if the upload failed.
    pub file_id: Option<String>,
    /// Error text when the upload or field extraction degraded.
    pub warning: Option<String>,
}
