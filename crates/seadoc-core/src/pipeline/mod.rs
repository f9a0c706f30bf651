//! Document ingestion pipeline.
//!
//! Architecture:
//!
//! ```text
//! ingest()
//!    │ validate_input
//!    ▼
//! route::decide()
//!    │
//!    ├── FAST_PATH (synchronous) ──► quality gate ─► field extraction
//!    │                               ─► duplicate check ─► create record
//!    │                               ─► synchronous upload ─► SyncResult
//!    │
//!    └── SLOW_PATH (queued) ───────► JobHandle, then per file:
//!                                    probe ─► split ─► dispatch ─► merge
//!                                    ─► quality gate ─► field extraction
//!                                    ─► duplicate check ─► create record
//!                                    ─► deferred upload (fire-and-forget,
//!                                       observable via the job tracker)
//! ```
//!
//! `run_document` is the shared slow-path core driven by the job worker; the
//! fast path runs inline because its result is returned to the caller.

pub mod dispatch;
pub mod merge;
pub mod types;

pub use types::{
    Chunk, ChunkResult, ChunkStatus, MergedSummary, PageRange, PathDecision, ProcessingPath,
    SyncResult,
};

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::collab::{
    BlobStore, FieldExtractor, NewCertificateRecord, RecordStore, TextCorrector, TextExtractor,
};
use crate::config::PipelineConfig;
use crate::dedup::{self, DuplicateKey};
use crate::error::IngestError;
use crate::jobs::{
    spawn_job_worker, BackgroundJob, FileOutcome, JobHandle, JobRequest, JobWorkerHandle,
    QueuedFile,
};
use crate::pdf;
use crate::quality;
use crate::route;

/// Shared collaborator set and configuration for a pipeline instance.
pub(crate) struct Deps {
    pub cfg: PipelineConfig,
    pub extractor: Arc<dyn TextExtractor>,
    pub field_extractor: Arc<dyn FieldExtractor>,
    pub corrector: Arc<dyn TextCorrector>,
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
}

/// What an ingest request produced.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// Fast path: the structured result, synchronously.
    Sync(SyncResult),
    /// Slow path: a handle to poll via `job_status`.
    Queued(JobHandle),
}

/// Per-request options.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Owning ship for record lookup and creation.
    pub ship_id: String,
    /// Skip the duplicate check before persistence.
    pub bypass_validation: bool,
}

/// Entry point for document ingestion.
///
/// Owns the job worker; dropping the ingestor cancels it.
pub struct Ingestor {
    deps: Arc<Deps>,
    worker: JobWorkerHandle,
    cancel: CancellationToken,
}

impl Ingestor {
    pub fn new(
        cfg: PipelineConfig,
        extractor: Arc<dyn TextExtractor>,
        field_extractor: Arc<dyn FieldExtractor>,
        corrector: Arc<dyn TextCorrector>,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let deps = Arc::new(Deps {
            cfg,
            extractor,
            field_extractor,
            corrector,
            records,
            blobs,
        });
        let cancel = CancellationToken::new();
        let worker = spawn_job_worker(deps.clone(), cancel.child_token());

        Self {
            deps,
            worker,
            cancel,
        }
    }

    /// Ingest one uploaded document.
    ///
    /// Returns a synchronous result for fast-path documents and a job handle
    /// for slow-path documents.
    pub async fn ingest(
        &self,
        content: Bytes,
        filename: &str,
        content_type: &str,
        opts: &IngestOptions,
    ) -> Result<IngestOutcome> {
        route::validate_input(&content, filename, &self.deps.cfg)?;

        let decision = route::decide(&content, filename, None, &self.deps.cfg);
        tracing::info!(filename, path = %decision.path, reason = %decision.reason, "Routing document");

        match decision.path {
            ProcessingPath::FastPath => {
                let result = self
                    .run_fast_path(&decision, &content, filename, content_type, opts)
                    .await?;
                Ok(IngestOutcome::Sync(result))
            }
            ProcessingPath::SlowPath => {
                let handle = self
                    .ingest_batch(
                        vec![QueuedFile {
                            filename: filename.to_string(),
                            content_type: content_type.to_string(),
                            content,
                        }],
                        opts,
                    )
                    .await?;
                Ok(IngestOutcome::Queued(handle))
            }
        }
    }

    /// Queue a multi-file slow-path batch.
    pub async fn ingest_batch(
        &self,
        files: Vec<QueuedFile>,
        opts: &IngestOptions,
    ) -> Result<JobHandle> {
        if files.is_empty() {
            return Err(IngestError::JobSetup("batch contains no files".to_string()).into());
        }
        for file in &files {
            route::validate_input(&file.content, &file.filename, &self.deps.cfg)?;
        }

        let filenames: Vec<String> = files.iter().map(|f| f.filename.clone()).collect();
        let job_id = self
            .worker
            .tracker()
            .create_job(&opts.ship_id, &filenames)
            .await;

        self.worker
            .enqueue(JobRequest {
                job_id: job_id.clone(),
                ship_id: opts.ship_id.clone(),
                files,
                bypass_validation: opts.bypass_validation,
            })
            .await?;

        Ok(JobHandle { job_id })
    }

    /// Snapshot of a queued or running job.
    pub async fn job_status(&self, job_id: &str) -> Option<BackgroundJob> {
        self.worker.tracker().snapshot(job_id).await
    }

    /// Archive a finished job. No-op while files or uploads are in flight.
    pub async fn archive_job(&self, job_id: &str) -> bool {
        self.worker.tracker().remove_settled(job_id).await
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Fast path: reuse the probed text layer, no extraction call.
    async fn run_fast_path(
        &self,
        decision: &PathDecision,
        content: &Bytes,
        filename: &str,
        content_type: &str,
        opts: &IngestOptions,
    ) -> Result<SyncResult> {
        let deps = &self.deps;
        let probe = decision
            .probe
            .as_ref()
            .context("fast path requires a probe result")?;
        let text = probe
            .text_content
            .as_deref()
            .context("fast path requires a text layer")?;

        let assessment = quality::assess(text, deps.cfg.quality_threshold);
        let corrected = quality::maybe_correct(
            text,
            &assessment,
            filename,
            deps.corrector.as_ref(),
            deps.cfg.correction_timeout,
        )
        .await;
        let summary = merge::single(&corrected.text, probe.page_count);

        let (fields, mut warning) = match deps
            .field_extractor
            .extract_fields(&summary.text, filename)
            .await
        {
            Ok(fields) => (fields.filter(|f| !f.is_empty()), None),
            Err(e) => {
                tracing::warn!(filename, error = %e, "Field extraction failed, analysis incomplete");
                (None, Some(format!("analysis incomplete: {e:#}")))
            }
        };

        let record_id = match &fields {
            Some(fields) => {
                if !opts.bypass_validation {
                    let key = DuplicateKey::from_fields(fields);
                    if let Some(existing) =
                        dedup::find_duplicate(&key, &opts.ship_id, deps.records.as_ref()).await?
                    {
                        return Err(IngestError::DuplicateRecord {
                            record_id: existing.id,
                        }
                        .into());
                    }
                }
                let record = deps
                    .records
                    .create(NewCertificateRecord {
                        ship_id: opts.ship_id.clone(),
                        fields: fields.clone(),
                        summary_text: summary.text.clone(),
                    })
                    .await
                    .context("Failed to create record")?;
                Some(record.id)
            }
            None => None,
        };

        // Fast path uploads synchronously; a failure degrades the result but
        // never rolls back the created record.
        let mut metadata = HashMap::new();
        metadata.insert("filename".to_string(), filename.to_string());
        let file_id = match deps
            .blobs
            .upload(&opts.ship_id, content, filename, content_type, &metadata)
            .await
        {
            Ok(stored) => {
                if let Some(record_id) = &record_id {
                    if let Err(e) = deps.records.attach_file(record_id, &stored.file_id).await {
                        tracing::warn!(record_id = %record_id, error = %e, "Failed to attach file to record");
                    }
                }
                Some(stored.file_id)
            }
            Err(e) => {
                tracing::warn!(filename, error = %e, "Synchronous upload failed");
                if let Some(record_id) = &record_id {
                    if let Err(e) = deps
                        .records
                        .set_upload_error(record_id, &format!("{e:#}"))
                        .await
                    {
                        tracing::warn!(record_id = %record_id, error = %e, "Failed to record upload error");
                    }
                }
                warning.get_or_insert_with(|| format!("file upload failed: {e:#}"));
                None
            }
        };

        Ok(SyncResult {
            summary,
            fields,
            record_id,
            file_id,
            warning,
        })
    }
}

impl Drop for Ingestor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Slow-path core for one document: probe, split, dispatch, merge, gate,
/// extract fields, check duplicates, create the record.
///
/// `progress` receives the observed checkpoints (30 after merge, 70 after
/// field extraction); the caller owns the 10/100 endpoints.
pub(crate) async fn run_document(
    deps: &Deps,
    content: &Bytes,
    filename: &str,
    content_type: &str,
    ship_id: &str,
    bypass_validation: bool,
    progress: &(dyn Fn(u8) + Send + Sync),
) -> Result<FileOutcome> {
    let decision = route::decide(content, filename, None, &deps.cfg);
    let total_pages = decision.probe.as_ref().map_or(1, |p| p.page_count);

    // Any PDF over the per-chunk page cap is split, including small-document
    // slow-path inputs the router never flagged.
    let should_split = decision.probe.is_some()
        && pdf::needs_splitting(content, deps.cfg.max_pages_per_chunk).unwrap_or(false);

    let chunks = if should_split {
        match pdf::split(content, deps.cfg.max_pages_per_chunk) {
            Ok(chunks) => chunks,
            Err(e) => {
                // A document that probed but cannot split is still worth one
                // whole-document extraction attempt.
                tracing::warn!(filename, error = %e, "Split failed, extracting whole document");
                vec![whole_document_chunk(content, total_pages)]
            }
        }
    } else {
        vec![whole_document_chunk(content, total_pages)]
    };

    // Split chunks are always PDFs regardless of what came in
    let chunk_content_type = if chunks.len() > 1 {
        "application/pdf"
    } else {
        content_type
    };
    let results = dispatch::dispatch(
        &chunks,
        deps.extractor.clone(),
        filename,
        chunk_content_type,
        &deps.cfg,
    )
    .await;
    let summary = merge::merge_chunks(&results, total_pages);
    if summary.all_failed() {
        return Err(IngestError::ExtractionFailed.into());
    }
    progress(30);

    let assessment = quality::assess(&summary.text, deps.cfg.quality_threshold);
    let corrected = quality::maybe_correct(
        &summary.text,
        &assessment,
        filename,
        deps.corrector.as_ref(),
        deps.cfg.correction_timeout,
    )
    .await;
    let summary = MergedSummary {
        text: corrected.text,
        ..summary
    };

    let (fields, warning) = match deps
        .field_extractor
        .extract_fields(&summary.text, filename)
        .await
    {
        Ok(fields) => (fields.filter(|f| !f.is_empty()), None),
        Err(e) => {
            tracing::warn!(filename, error = %e, "Field extraction failed, analysis incomplete");
            (None, Some(format!("analysis incomplete: {e:#}")))
        }
    };
    progress(70);

    let (record_id, duplicate_of) = match &fields {
        Some(fields) => {
            let duplicate = if bypass_validation {
                None
            } else {
                let key = DuplicateKey::from_fields(fields);
                dedup::find_duplicate(&key, ship_id, deps.records.as_ref()).await?
            };
            match duplicate {
                Some(existing) => (None, Some(existing.id)),
                None => {
                    let record = deps
                        .records
                        .create(NewCertificateRecord {
                            ship_id: ship_id.to_string(),
                            fields: fields.clone(),
                            summary_text: summary.text.clone(),
                        })
                        .await
                        .context("Failed to create record")?;
                    (Some(record.id), None)
                }
            }
        }
        None => (None, None),
    };

    Ok(FileOutcome {
        summary,
        fields,
        record_id,
        duplicate_of,
        file_id: None,
        warning,
    })
}

/// Wrap the full document as a single dispatchable chunk.
fn whole_document_chunk(content: &Bytes, total_pages: usize) -> Chunk {
    Chunk {
        index: 0,
        pages: PageRange {
            start: 1,
            end: total_pages.max(1),
        },
        content: content.clone(),
        chunk_id: format!("0-{}", &blake3::hash(content).to_hex().as_str()[..12]),
    }
}
