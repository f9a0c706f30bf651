//! External collaborator interfaces.
//!
//! The pipeline orchestrates but never implements OCR, LLM field extraction,
//! or persistence. Each collaborator is a trait; production wiring uses the
//! HTTP client in [`remote`], tests use in-line doubles.
//!
//! Collaborator failures are surfaced as values (`success = false`, `Err`),
//! never as panics crossing the pipeline boundary.

pub mod remote;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use remote::RemoteDocAi;

/// Result of a text-extraction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub success: bool,
    pub text: String,
}

/// Structured fields extracted from a document summary.
///
/// Identifying fields are typed so the duplicate detector never sees an
/// untyped blob; anything else the extractor returns lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFields {
    pub name: Option<String>,
    pub cert_no: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub last_endorsement_date: Option<String>,
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl DocumentFields {
    /// True when no identifying field is present.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.cert_no.is_none()
            && self.issue_date.is_none()
            && self.expiry_date.is_none()
            && self.last_endorsement_date.is_none()
    }
}

/// Result of a text-correction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correction {
    pub success: bool,
    pub correction_applied: bool,
    pub corrected_text: String,
}

/// A stored certificate record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub id: String,
    pub ship_id: String,
    pub fields: DocumentFields,
    /// Attached original file, absent while a deferred upload is in flight.
    pub file_id: Option<String>,
    /// Sticky marker set when a deferred upload failed.
    pub upload_error: Option<String>,
}

/// A record to be created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCertificateRecord {
    pub ship_id: String,
    pub fields: DocumentFields,
    /// Merged summary text kept alongside the record for manual review.
    pub summary_text: String,
}

/// Uploaded file reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    pub file_id: String,
}

/// Text extraction (OCR / document AI), callable per chunk or whole document.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(
        &self,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
    ) -> anyhow::Result<Extraction>;
}

/// LLM structured-field extraction, called once per document on the final
/// merged summary.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract_fields(
        &self,
        summary_text: &str,
        filename: &str,
    ) -> anyhow::Result<Option<DocumentFields>>;
}

/// AI text correction, called only when the quality gate flags low quality.
#[async_trait]
pub trait TextCorrector: Send + Sync {
    async fn correct(&self, text: &str, filename: &str) -> anyhow::Result<Correction>;
}

/// Persistent record store for certificates.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up records for a ship, optionally narrowed by certificate number.
    ///
    /// Narrowing is case- and whitespace-insensitive on the store side, so a
    /// narrowed lookup returns the same candidates an exact post-filter of
    /// the full set would.
    async fn find_by(
        &self,
        ship_id: &str,
        cert_no: Option<&str>,
    ) -> anyhow::Result<Vec<CertificateRecord>>;

    async fn create(&self, record: NewCertificateRecord) -> anyhow::Result<CertificateRecord>;

    /// Attach an uploaded file to an existing record.
    async fn attach_file(&self, record_id: &str, file_id: &str) -> anyhow::Result<()>;

    /// Record a deferred-upload failure on an existing record.
    async fn set_upload_error(&self, record_id: &str, error: &str) -> anyhow::Result<()>;
}

/// Durable blob storage for original file bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        owner_id: &str,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> anyhow::Result<StoredFile>;
}
