//! Client for the remote document QA service.
//!
//! The service exposes three endpoints: a liveness probe, document ingest
//! and a chat turn. [`HttpServiceClient`] talks to them over HTTP and folds
//! every failure into [`Error`](crate::Error), so callers never see
//! transport types.
//!
//! ## Example
//!
//! ```rust,ignore
//! use docchat_core::service::{DocumentUpload, HttpServiceClient, RemoteService};
//! use docchat_core::{ServiceConfig, MAX_UPLOAD_BYTES};
//!
//! let client = HttpServiceClient::new(ServiceConfig::default())?;
//! if client.probe_health().await {
//!     let upload = DocumentUpload::from_path("report.pdf", MAX_UPLOAD_BYTES).await?;
//!     client.ingest_document(upload).await?;
//!     let reply = client.send_turn("What is the summary?", &[]).await?;
//!     println!("{}", reply.answer);
//! }
//! ```

mod client;
mod types;
mod upload;

pub use client::{HttpServiceClient, RemoteService};
pub use types::{ChatRequest, IngestReceipt, TurnReply, UploadResponse, UploadStatus};
pub use upload::{validate_upload, DocumentUpload};
