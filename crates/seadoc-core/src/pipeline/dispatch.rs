//! Parallel chunk dispatch.
//!
//! Chunks are launched in index order through a fixed-period ticker so the
//! external extraction service sees staggered admission, then run
//! concurrently. A hard cap bounds how many chunks one document may dispatch;
//! capped chunks are recorded as skipped, never attempted. Every dispatched
//! chunk resolves to a `ChunkResult` - a failure or timeout in one chunk
//! never cancels its siblings.

use std::sync::Arc;

use futures::future::join_all;

use crate::collab::TextExtractor;
use crate::config::PipelineConfig;
use crate::pipeline::types::{Chunk, ChunkResult, ChunkStatus};

/// Dispatch chunks to the extraction collaborator.
///
/// Returns one result per input chunk, ordered by `chunk_index` regardless
/// of completion order.
pub async fn dispatch(
    chunks: &[Chunk],
    extractor: Arc<dyn TextExtractor>,
    filename: &str,
    content_type: &str,
    cfg: &PipelineConfig,
) -> Vec<ChunkResult> {
    let attempted = chunks.len().min(cfg.max_chunks);

    tracing::info!(
        filename,
        total_chunks = chunks.len(),
        attempted,
        skipped = chunks.len() - attempted,
        "Dispatching chunks"
    );

    // Fixed-period ticker: the first tick is immediate, every later launch
    // waits out the stagger delay. Launch order is index order.
    let mut ticker = tokio::time::interval(cfg.stagger_delay);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut handles = Vec::with_capacity(attempted);
    for chunk in &chunks[..attempted] {
        ticker.tick().await;

        let extractor = extractor.clone();
        let content = chunk.content.clone();
        // Undecorated filename for a whole-document chunk, .partN for splits
        let chunk_filename = if chunks.len() == 1 {
            filename.to_string()
        } else {
            format!("{}.part{}.pdf", filename, chunk.index)
        };
        let content_type = content_type.to_string();
        let chunk_id = chunk.chunk_id.clone();
        let index = chunk.index;
        let pages = chunk.pages;
        let timeout = cfg.chunk_timeout;

        tracing::debug!(chunk_id = %chunk_id, pages = %pages, "Launching chunk extraction");

        handles.push(tokio::spawn(async move {
            let status = match tokio::time::timeout(
                timeout,
                extractor.extract(&content, &chunk_filename, &content_type),
            )
            .await
            {
                Ok(Ok(extraction)) if extraction.success => ChunkStatus::Success {
                    text: extraction.text,
                },
                Ok(Ok(_)) => ChunkStatus::Failed {
                    error: "extraction reported no text".to_string(),
                },
                Ok(Err(e)) => ChunkStatus::Failed {
                    error: format!("{e:#}"),
                },
                Err(_) => ChunkStatus::Failed {
                    error: format!("extraction timed out after {timeout:?}"),
                },
            };

            if let ChunkStatus::Failed { error } = &status {
                tracing::warn!(chunk_id = %chunk_id, error = %error, "Chunk extraction failed");
            }

            ChunkResult {
                chunk_index: index,
                pages,
                status,
            }
        }));
    }

    let mut results: Vec<ChunkResult> = join_all(handles)
        .await
        .into_iter()
        .zip(&chunks[..attempted])
        .map(|(joined, chunk)| match joined {
            Ok(result) => result,
            // A panicking extractor still yields a failed result for its index.
            Err(e) => ChunkResult {
                chunk_index: chunk.index,
                pages: chunk.pages,
                status: ChunkStatus::Failed {
                    error: format!("extraction task panicked: {e}"),
                },
            },
        })
        .collect();

    for chunk in &chunks[attempted..] {
        results.push(ChunkResult {
            chunk_index: chunk.index,
            pages: chunk.pages,
            status: ChunkStatus::Skipped,
        });
    }

    // Completion order is unconstrained; consumers rely on index order.
    results.sort_by_key(|r| r.chunk_index);
    results
}
