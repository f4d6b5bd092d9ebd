//! Remote service trait and its HTTP implementation.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::ServiceConfig;
use crate::error::{Error, Result};

use super::types::{ChatRequest, ErrorBody, IngestReceipt, TurnReply, UploadResponse, UploadStatus};
use super::upload::{validate_upload, DocumentUpload};

const UPLOAD_FAILED: &str = "Failed to upload document";
const SEND_FAILED: &str = "Failed to send message";
const NO_DOCUMENT: &str = "Please upload and process a document first";

/// Operations offered by the document QA service.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Liveness probe. Any failure reads as offline.
    async fn probe_health(&self) -> bool;

    /// Upload a document and wait for the service to finish ingesting it.
    async fn ingest_document(&self, upload: DocumentUpload) -> Result<IngestReceipt>;

    /// Ask one question against the ingested document.
    async fn send_turn(&self, question: &str, history: &[String]) -> Result<TurnReply>;
}

fn build_http_client() -> Result<Client> {
    // Some sandboxed macOS environments can panic during proxy auto-detection
    // in reqwest's default client builder. Fall back to no-proxy in that case.
    match catch_unwind(AssertUnwindSafe(|| Client::builder().build())) {
        Ok(Ok(client)) => Ok(client),
        Ok(Err(_)) | Err(_) => Client::builder()
            .no_proxy()
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e))),
    }
}

/// HTTP client for the document QA service.
pub struct HttpServiceClient {
    config: ServiceConfig,
    http: Client,
}

impl HttpServiceClient {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let http = build_http_client()?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Translate a reqwest failure into the crate taxonomy.
    fn transport_error(&self, e: reqwest::Error, timeout_ms: u64, fallback: &str) -> Error {
        if e.is_timeout() {
            Error::timeout(timeout_ms)
        } else if e.is_connect() {
            Error::network(format!(
                "Cannot reach the document service at {}",
                self.config.base_url
            ))
        } else if e.is_request() || e.is_body() {
            Error::network(format!("{}: connection interrupted", fallback))
        } else {
            Error::network(fallback.to_string())
        }
    }

    async fn read_body(
        &self,
        response: reqwest::Response,
        timeout_ms: u64,
        fallback: &str,
    ) -> Result<(StatusCode, String)> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, timeout_ms, fallback))?;
        Ok((status, body))
    }
}

fn error_from_body(status: StatusCode, body: &str, fallback: &str) -> Error {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail_text());
    Error::server(
        Some(status.as_u16()),
        detail.unwrap_or_else(|| fallback.to_string()),
    )
}

#[async_trait]
impl RemoteService for HttpServiceClient {
    async fn probe_health(&self) -> bool {
        let url = self.config.endpoint("/docs");
        let result = self
            .http
            .get(&url)
            .timeout(Duration::from_millis(self.config.health_timeout_ms))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(status = %response.status(), "Health probe got non-success status");
                false
            }
            Err(e) => {
                debug!("Health probe failed: {}", e);
                false
            }
        }
    }

    async fn ingest_document(&self, upload: DocumentUpload) -> Result<IngestReceipt> {
        validate_upload(&upload, self.config.max_upload_bytes)?;

        let timeout_ms = self.config.upload_timeout_ms;
        let file_name = upload.file_name.clone();
        info!(file = %file_name, size = upload.size(), "Uploading document");

        let part = Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)
            .map_err(|e| Error::validation(format!("Invalid MIME type: {}", e)))?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.config.endpoint("/upload_and_process/"))
            .multipart(form)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| self.transport_error(e, timeout_ms, UPLOAD_FAILED))?;

        let (status, body) = self.read_body(response, timeout_ms, UPLOAD_FAILED).await?;
        if !status.is_success() {
            warn!(%status, "Upload rejected");
            return Err(error_from_body(status, &body, UPLOAD_FAILED));
        }

        let reply: UploadResponse = serde_json::from_str(&body).map_err(|e| {
            Error::server(
                Some(status.as_u16()),
                format!("{}: unexpected response ({})", UPLOAD_FAILED, e),
            )
        })?;

        match reply.status {
            UploadStatus::Success => {
                info!(file = %file_name, "Document ingested");
                Ok(IngestReceipt {
                    file_name,
                    message: reply.message,
                })
            }
            UploadStatus::Error => {
                warn!(file = %file_name, message = %reply.message, "Ingest failed");
                let message = if reply.message.trim().is_empty() {
                    UPLOAD_FAILED.to_string()
                } else {
                    reply.message
                };
                Err(Error::server(Some(status.as_u16()), message))
            }
        }
    }

    async fn send_turn(&self, question: &str, history: &[String]) -> Result<TurnReply> {
        let timeout_ms = self.config.chat_timeout_ms;
        let request = ChatRequest {
            question: question.to_string(),
            history: history.to_vec(),
        };
        debug!(history_len = history.len(), "Sending chat turn");

        let response = self
            .http
            .post(self.config.endpoint("/chat/"))
            .json(&request)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| self.transport_error(e, timeout_ms, SEND_FAILED))?;

        let (status, body) = self.read_body(response, timeout_ms, SEND_FAILED).await?;
        if status == StatusCode::BAD_REQUEST {
            return Err(Error::precondition(NO_DOCUMENT));
        }
        if !status.is_success() {
            warn!(%status, "Chat turn rejected");
            return Err(error_from_body(status, &body, SEND_FAILED));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::server(
                Some(status.as_u16()),
                format!("{}: unexpected response ({})", SEND_FAILED, e),
            )
        })
    }
}
