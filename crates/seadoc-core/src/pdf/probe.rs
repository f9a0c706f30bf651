//! Text-layer probing.
//!
//! A probe inspects a document once for an extractable text layer. The result
//! is an immutable value threaded through the rest of the pipeline so later
//! stages never re-parse the same bytes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// What one probe of a document found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Whether the text layer is substantial enough to reuse.
    pub has_text_layer: bool,
    /// Total characters in the text layer.
    pub char_count: usize,
    /// Number of pages.
    pub page_count: usize,
    /// The text layer itself, kept so the fast path avoids a second pass.
    pub text_content: Option<String>,
}

/// Probe PDF bytes for an existing text layer.
///
/// `char_threshold` sets the sufficiency verdict: at or above it the text
/// layer counts as reusable. Extraction failures on individual pages are
/// tolerated (the page contributes nothing); a document that cannot be
/// parsed at all is an error the caller degrades to the slow path.
pub fn probe(bytes: &[u8], char_threshold: usize) -> Result<ProbeResult> {
    let doc = lopdf::Document::load_mem(bytes).context("Failed to parse PDF")?;

    let mut pages: Vec<u32> = doc.get_pages().keys().cloned().collect();
    pages.sort();
    let page_count = pages.len();

    let mut full_text = String::new();
    for page_num in &pages {
        let page_text = doc.extract_text(&[*page_num]).unwrap_or_default();
        full_text.push_str(&page_text);
        if !page_text.ends_with('\n') && !page_text.is_empty() {
            full_text.push('\n');
        }
    }

    let char_count = full_text.chars().filter(|c| !c.is_whitespace()).count();
    let has_text_layer = char_count >= char_threshold;

    tracing::debug!(
        page_count,
        char_count,
        has_text_layer,
        "Probed document text layer"
    );

    Ok(ProbeResult {
        has_text_layer,
        char_count,
        page_count,
        // lopdf emits a newline per page even when a page has no text
        text_content: if full_text.trim().is_empty() {
            None
        } else {
            Some(full_text)
        },
    })
}
