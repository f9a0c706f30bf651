//! In-memory collaborator doubles shared across test modules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::collab::{
    BlobStore, CertificateRecord, Correction, DocumentFields, Extraction, FieldExtractor,
    NewCertificateRecord, RecordStore, StoredFile, TextCorrector, TextExtractor,
};

/// In-memory record store; `find_by` narrows by cert_no
/// case-insensitively, matching the trait contract.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<CertificateRecord>>,
}

impl MemoryStore {
    pub fn with_records(records: Vec<CertificateRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn all(&self) -> Vec<CertificateRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_by(
        &self,
        ship_id: &str,
        cert_no: Option<&str>,
    ) -> anyhow::Result<Vec<CertificateRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.ship_id == ship_id)
            .filter(|r| match cert_no {
                None => true,
                Some(no) => r
                    .fields
                    .cert_no
                    .as_deref()
                    .is_some_and(|c| c.trim().eq_ignore_ascii_case(no.trim())),
            })
            .cloned()
            .collect())
    }

    async fn create(&self, record: NewCertificateRecord) -> anyhow::Result<CertificateRecord> {
        let created = CertificateRecord {
            id: format!("rec-{}", self.records.lock().unwrap().len() + 1),
            ship_id: record.ship_id,
            fields: record.fields,
            file_id: None,
            upload_error: None,
        };
        self.records.lock().unwrap().push(created.clone());
        Ok(created)
    }

    async fn attach_file(&self, record_id: &str, file_id: &str) -> anyhow::Result<()> {
        for r in self.records.lock().unwrap().iter_mut() {
            if r.id == record_id {
                r.file_id = Some(file_id.to_string());
            }
        }
        Ok(())
    }

    async fn set_upload_error(&self, record_id: &str, error: &str) -> anyhow::Result<()> {
        for r in self.records.lock().unwrap().iter_mut() {
            if r.id == record_id {
                r.upload_error = Some(error.to_string());
            }
        }
        Ok(())
    }
}

/// In-memory blob store counting uploads; can be switched to fail.
#[derive(Default)]
pub struct MemoryBlobStore {
    uploads: AtomicUsize,
    fail: bool,
}

impl MemoryBlobStore {
    pub fn failing() -> Self {
        Self {
            uploads: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        _owner_id: &str,
        _bytes: &[u8],
        filename: &str,
        _content_type: &str,
        _metadata: &HashMap<String, String>,
    ) -> anyhow::Result<StoredFile> {
        if self.fail {
            anyhow::bail!("blob store unavailable");
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(StoredFile {
            file_id: format!("file-{n}-{filename}"),
        })
    }
}

/// Extractor that always returns fixed text, or always errors.
pub struct StubExtractor {
    text: Option<String>,
}

impl StubExtractor {
    pub fn succeeding(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { text: None }
    }
}

#[async_trait]
impl TextExtractor for StubExtractor {
    async fn extract(
        &self,
        _bytes: &[u8],
        filename: &str,
        _content_type: &str,
    ) -> anyhow::Result<Extraction> {
        match &self.text {
            Some(text) => Ok(Extraction {
                success: true,
                text: format!("{text} [{filename}]"),
            }),
            None => anyhow::bail!("extraction backend down"),
        }
    }
}

/// Field extractor returning a fixed answer, or erroring.
pub struct StaticFieldExtractor {
    fields: Option<DocumentFields>,
    error: bool,
}

impl StaticFieldExtractor {
    pub fn new(fields: Option<DocumentFields>) -> Self {
        Self {
            fields,
            error: false,
        }
    }

    pub fn erroring() -> Self {
        Self {
            fields: None,
            error: true,
        }
    }
}

#[async_trait]
impl FieldExtractor for StaticFieldExtractor {
    async fn extract_fields(
        &self,
        _summary_text: &str,
        _filename: &str,
    ) -> anyhow::Result<Option<DocumentFields>> {
        if self.error {
            anyhow::bail!("field extraction backend down");
        }
        Ok(self.fields.clone())
    }
}

/// Corrector that uppercases text and counts how often it was called.
#[derive(Default)]
pub struct CountingCorrector {
    calls: AtomicUsize,
}

impl CountingCorrector {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextCorrector for CountingCorrector {
    async fn correct(&self, text: &str, _filename: &str) -> anyhow::Result<Correction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Correction {
            success: true,
            correction_applied: true,
            corrected_text: text.to_uppercase(),
        })
    }
}
