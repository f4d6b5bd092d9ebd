//! Configuration for the remote document QA service.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default service endpoint.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Largest document accepted for upload (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// The only MIME type the service ingests.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Configuration for [`HttpServiceClient`](crate::service::HttpServiceClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Base URL of the service, without trailing slash
    pub base_url: String,
    /// Timeout for the liveness probe in milliseconds
    pub health_timeout_ms: u64,
    /// Timeout for document ingest in milliseconds
    pub upload_timeout_ms: u64,
    /// Timeout for a chat turn in milliseconds
    pub chat_timeout_ms: u64,
    /// Upload size ceiling in bytes
    pub max_upload_bytes: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            health_timeout_ms: 5_000,
            upload_timeout_ms: 60_000,
            chat_timeout_ms: 30_000,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

impl ServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    /// Create configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("DOCCHAT_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            health_timeout_ms: env_millis("DOCCHAT_HEALTH_TIMEOUT_MS")
                .unwrap_or(defaults.health_timeout_ms),
            upload_timeout_ms: env_millis("DOCCHAT_UPLOAD_TIMEOUT_MS")
                .unwrap_or(defaults.upload_timeout_ms),
            chat_timeout_ms: env_millis("DOCCHAT_CHAT_TIMEOUT_MS")
                .unwrap_or(defaults.chat_timeout_ms),
            max_upload_bytes: defaults.max_upload_bytes,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout_ms = millis(timeout);
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout_ms = millis(timeout);
        self
    }

    pub fn with_chat_timeout(mut self, timeout: Duration) -> Self {
        self.chat_timeout_ms = millis(timeout);
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Reject configurations the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "base URL must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.health_timeout_ms == 0 || self.upload_timeout_ms == 0 || self.chat_timeout_ms == 0
        {
            return Err(Error::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Build an endpoint URL from a path such as `/chat/`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

fn env_millis(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}
