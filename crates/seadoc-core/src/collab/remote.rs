//! HTTP client for a remote document-AI service.
//!
//! Implements the extraction, field-extraction, and correction collaborators
//! against a JSON API. One client instance is shared across the pipeline.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{Correction, DocumentFields, Extraction, FieldExtractor, TextCorrector, TextExtractor};

/// Remote document-AI collaborator over HTTP.
pub struct RemoteDocAi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RemoteDocAi {
    /// Create a client with the given endpoint, key, and request timeout.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key).context("Invalid API key format")?,
        );
        Ok(headers)
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Request to {path} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            anyhow::bail!("Document AI returned {status}: {message}");
        }

        response
            .json()
            .await
            .with_context(|| format!("Invalid response body from {path}"))
    }
}

#[async_trait]
impl TextExtractor for RemoteDocAi {
    async fn extract(
        &self,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<Extraction> {
        let request = ExtractRequest {
            filename,
            content_type,
            content: data_url(content_type, bytes),
        };
        let response: ExtractResponse = self.post("/v1/extract", &request).await?;

        Ok(Extraction {
            success: response.success,
            text: response.text.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl FieldExtractor for RemoteDocAi {
    async fn extract_fields(
        &self,
        summary_text: &str,
        filename: &str,
    ) -> Result<Option<DocumentFields>> {
        let request = FieldsRequest {
            filename,
            text: summary_text,
        };
        let response: FieldsResponse = self.post("/v1/fields", &request).await?;

        Ok(response.fields)
    }
}

#[async_trait]
impl TextCorrector for RemoteDocAi {
    async fn correct(&self, text: &str, filename: &str) -> Result<Correction> {
        let request = CorrectRequest { filename, text };
        let response: CorrectResponse = self.post("/v1/correct", &request).await?;

        let correction_applied = response.correction_applied && response.corrected_text.is_some();
        Ok(Correction {
            success: response.success,
            correction_applied,
            corrected_text: response.corrected_text.unwrap_or_else(|| text.to_string()),
        })
    }
}

/// Inline file content as a base64 data URL.
fn data_url(content_type: &str, bytes: &[u8]) -> String {
    let encoded = general_purpose::STANDARD.encode(bytes);
    format!("data:{content_type};base64,{encoded}")
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    filename: &'a str,
    content_type: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ExtractResponse {
    success: bool,
    text: Option<String>,
}

#[derive(Serialize)]
struct FieldsRequest<'a> {
    filename: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct FieldsResponse {
    fields: Option<DocumentFields>,
}

#[derive(Serialize)]
struct CorrectRequest<'a> {
    filename: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct CorrectResponse {
    success: bool,
    #[serde(default)]
    correction_applied: bool,
    corrected_text: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}
