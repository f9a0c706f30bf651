//! Summary consolidation.
//!
//! Re-imposes strict ascending chunk order on whatever subset of chunks
//! succeeded and produces the one annotated text artifact the rest of the
//! pipeline consumes. Supplementary header/footer OCR text is appended as
//! delimited sections; it never interleaves with primary extraction text.

use crate::pipeline::types::{ChunkResult, ChunkStatus, MergedSummary};

/// Marker emitted when no chunk produced text, so downstream consumers can
/// tell "extraction failed" from an empty document.
pub const ALL_FAILED_MARKER: &str = "[extraction failed: no chunk produced text]";

const HEADER_SECTION: &str = "--- Supplementary header OCR ---";
const FOOTER_SECTION: &str = "--- Supplementary footer OCR ---";

/// Consolidate chunk results into one summary.
///
/// Successful chunks are concatenated in ascending `chunk_index` order with
/// page-range section markers; failed and skipped chunks leave an explicit
/// gap annotation at their position.
pub fn merge_chunks(results: &[ChunkResult], total_pages: usize) -> MergedSummary {
    let mut ordered: Vec<&ChunkResult> = results.iter().collect();
    ordered.sort_by_key(|r| r.chunk_index);

    let mut successful_chunks = 0;
    let mut failed_chunks = 0;
    let mut skipped_chunks = 0;
    let mut sections = Vec::with_capacity(ordered.len());

    for result in &ordered {
        match &result.status {
            ChunkStatus::Success { text } => {
                successful_chunks += 1;
                sections.push(format!("=== Pages {} ===\n{}", result.pages, text.trim_end()));
            }
            ChunkStatus::Failed { error } => {
                failed_chunks += 1;
                sections.push(format!("[pages {}: extraction failed: {}]", result.pages, error));
            }
            ChunkStatus::Skipped => {
                skipped_chunks += 1;
                sections.push(format!(
                    "[pages {}: skipped, dispatch cap reached]",
                    result.pages
                ));
            }
        }
    }

    let text = if successful_chunks == 0 {
        ALL_FAILED_MARKER.to_string()
    } else {
        sections.join("\n\n")
    };

    tracing::debug!(
        total_pages,
        successful_chunks,
        failed_chunks,
        skipped_chunks,
        "Merged chunk results"
    );

    MergedSummary {
        text,
        total_pages,
        successful_chunks,
        failed_chunks,
        skipped_chunks,
        ocr_merged: false,
    }
}

/// Build a summary from a single already-extracted text (fast path, or an
/// unsplit slow-path document).
pub fn single(text: &str, total_pages: usize) -> MergedSummary {
    MergedSummary {
        text: text.to_string(),
        total_pages,
        successful_chunks: 1,
        failed_chunks: 0,
        skipped_chunks: 0,
        ocr_merged: false,
    }
}

/// Append targeted header/footer OCR text as delimited sections.
///
/// Both the primary summary and the supplementary sections remain
/// independently recoverable from the output via the section markers.
pub fn merge_ocr(
    summary: &MergedSummary,
    header_text: Option<&str>,
    footer_text: Option<&str>,
) -> MergedSummary {
    let header = header_text.map(str::trim).filter(|t| !t.is_empty());
    let footer = footer_text.map(str::trim).filter(|t| !t.is_empty());

    if header.is_none() && footer.is_none() {
        return summary.clone();
    }

    let mut text = summary.text.clone();
    if let Some(header) = header {
        text.push_str("\n\n");
        text.push_str(HEADER_SECTION);
        text.push('\n');
        text.push_str(header);
    }
    if let Some(footer) = footer {
        text.push_str("\n\n");
        text.push_str(FOOTER_SECTION);
        text.push('\n');
        text.push_str(footer);
    }

    MergedSummary {
        text,
        ocr_merged: true,
        ..summary.clone()
    }
}
