//! Error types for tailnet-dns.

use thiserror::Error;

/// Errors that can occur in the DNS server.
#[derive(Debug, Error)]
pub enum DnsError {
    /// IO error (network, file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error talking to the device directory (includes timeouts).
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Directory answered with something other than 200 OK.
    #[error("device directory returned unexpected status {status}: {reason}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
        /// Canonical reason phrase, if known.
        reason: String,
    },

    /// Directory response body was not the expected JSON document.
    #[error("failed to decode device list: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// DNS protocol error
    #[error("DNS protocol error: {0}")]
    Proto(#[from] hickory_proto::ProtoError),
}

impl DnsError {
    pub(crate) fn status(status: reqwest::StatusCode) -> Self {
        Self::Status {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("unknown").to_string(),
        }
    }
}
