//! Errors raised while constructing probe clients.
//!
//! Per-call failures are reported as [`mailscope_core::ProbeError`]; these
//! only occur at setup time.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("invalid TLS configuration: {0}")]
    Tls(String),

    #[error("invalid base URL {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },
}

pub type Result<T> = std::result::Result<T, SetupError>;
