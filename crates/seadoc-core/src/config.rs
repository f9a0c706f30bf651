//! Pipeline configuration.
//!
//! Thresholds are configuration, not constants: a deployment tunes them per
//! document-AI provider without recompiling.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Configuration for the ingestion pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Page count at or below which a document always takes the slow path.
    pub page_threshold: usize,
    /// Minimum text-layer characters for a large document to take the fast path.
    pub char_threshold: usize,
    /// Maximum pages per chunk when splitting an oversized document.
    pub max_pages_per_chunk: usize,
    /// Hard cap on chunks dispatched for a single document.
    pub max_chunks: usize,
    /// Delay between successive chunk launches.
    #[serde(with = "duration_secs")]
    pub stagger_delay: Duration,
    /// Timeout for a single chunk extraction call.
    #[serde(with = "duration_secs")]
    pub chunk_timeout: Duration,
    /// Timeout for a text-correction call.
    #[serde(with = "duration_secs")]
    pub correction_timeout: Duration,
    /// Quality score below which AI correction runs (0-100).
    pub quality_threshold: u8,
    /// Maximum accepted input file size in bytes.
    pub max_file_bytes: u64,
    /// Directory for per-job temporary artifacts.
    pub work_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_threshold: 15,
            char_threshold: 400,
            max_pages_per_chunk: 12,
            max_chunks: 5,
            stagger_delay: Duration::from_secs(2),
            chunk_timeout: Duration::from_secs(120),
            correction_timeout: Duration::from_secs(60),
            quality_threshold: 70,
            max_file_bytes: 50 * 1024 * 1024,
            work_dir: std::env::temp_dir().join("seadoc"),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file, or use defaults.
    ///
    /// A missing or unreadable file yields defaults; a present but invalid
    /// file also yields defaults with a warning, so a bad config never blocks
    /// ingestion.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Invalid pipeline config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

/// Serde helper: durations as whole seconds in config files.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
