//! Page-aligned document splitting.
//!
//! An oversized document is split into standalone sub-PDFs the extraction
//! collaborator can consume independently. Chunk boundaries partition the
//! page range exactly once each, in ascending order.

use anyhow::{Context, Result};
use bytes::Bytes;

use crate::pipeline::types::{Chunk, PageRange};

/// Compute the page-range partition for a page count.
///
/// Ranges are 1-based inclusive, ascending, with no gaps or overlaps; each
/// spans at most `max_pages_per_chunk` pages.
pub fn plan_ranges(page_count: usize, max_pages_per_chunk: usize) -> Vec<PageRange> {
    let max = max_pages_per_chunk.max(1);
    let mut ranges = Vec::new();
    let mut start = 1;
    while start <= page_count {
        let end = (start + max - 1).min(page_count);
        ranges.push(PageRange { start, end });
        start = end + 1;
    }
    ranges
}

/// True iff `split` would produce more than one chunk.
pub fn needs_splitting(bytes: &[u8], max_pages_per_chunk: usize) -> Result<bool> {
    let doc = lopdf::Document::load_mem(bytes).context("Failed to parse PDF")?;
    Ok(doc.get_pages().len() > max_pages_per_chunk.max(1))
}

/// Split PDF bytes into ordered, page-ranged chunks.
///
/// Each chunk is serialized as a structurally valid standalone PDF containing
/// only its page range.
pub fn split(bytes: &[u8], max_pages_per_chunk: usize) -> Result<Vec<Chunk>> {
    let doc = lopdf::Document::load_mem(bytes).context("Failed to parse PDF")?;
    let page_count = doc.get_pages().len();
    if page_count == 0 {
        anyhow::bail!("Document has no pages");
    }

    let ranges = plan_ranges(page_count, max_pages_per_chunk);
    let mut chunks = Vec::with_capacity(ranges.len());

    for (index, pages) in ranges.into_iter().enumerate() {
        let content = extract_page_range(&doc, pages, page_count)
            .with_context(|| format!("Failed to extract pages {}", pages))?;

        let chunk_id = format!(
            "{}-{}",
            index,
            &blake3::hash(&content).to_hex().as_str()[..12]
        );

        chunks.push(Chunk {
            index,
            pages,
            content: Bytes::from(content),
            chunk_id,
        });
    }

    tracing::debug!(
        page_count,
        chunk_count = chunks.len(),
        max_pages_per_chunk,
        "Split document into chunks"
    );

    Ok(chunks)
}

/// Serialize a standalone sub-document containing only `range`.
fn extract_page_range(
    doc: &lopdf::Document,
    range: PageRange,
    page_count: usize,
) -> Result<Vec<u8>> {
    let mut sub = doc.clone();

    let delete: Vec<u32> = (1..=page_count as u32)
        .filter(|p| (*p as usize) < range.start || (*p as usize) > range.end)
        .collect();
    if !delete.is_empty() {
        sub.delete_pages(&delete);
    }
    sub.prune_objects();
    sub.renumber_objects();

    let mut buffer = Vec::new();
    sub.save_to(&mut buffer)
        .context("Failed to serialize sub-document")?;
    Ok(buffer)
}
