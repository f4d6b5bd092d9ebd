//! Upload payloads and the local checks applied before transmission.

use std::path::Path;

use crate::config::PDF_MIME_TYPE;
use crate::error::{Error, Result};

/// A file picked by the user for ingestion.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for DocumentUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentUpload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl DocumentUpload {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Shorthand for a PDF upload.
    pub fn pdf(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(file_name, PDF_MIME_TYPE, bytes)
    }

    /// Read a file from disk, inferring its MIME type from the extension.
    ///
    /// Files larger than `max_bytes` are rejected from their metadata,
    /// before any content is read.
    pub async fn from_path(path: impl AsRef<Path>, max_bytes: u64) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::validation(format!("Not a file: {}", path.display())))?;
        let unreadable =
            |e: std::io::Error| Error::validation(format!("Cannot read {}: {}", path.display(), e));

        let metadata = tokio::fs::metadata(path).await.map_err(unreadable)?;
        if metadata.len() > max_bytes {
            return Err(too_large(max_bytes));
        }
        let bytes = tokio::fs::read(path).await.map_err(unreadable)?;

        Ok(Self {
            mime_type: infer_mime_type(&file_name),
            file_name,
            bytes,
        })
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn infer_mime_type(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .to_string()
}

/// Check type and size of an upload. Never touches the network.
pub fn validate_upload(upload: &DocumentUpload, max_bytes: u64) -> Result<()> {
    if upload.mime_type != PDF_MIME_TYPE {
        return Err(Error::validation("Please select a PDF file"));
    }
    if upload.size() > max_bytes {
        return Err(too_large(max_bytes));
    }
    Ok(())
}

fn too_large(max_bytes: u64) -> Error {
    Error::validation(format!(
        "File size must be less than {}",
        human_size(max_bytes)
    ))
}

fn human_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}
