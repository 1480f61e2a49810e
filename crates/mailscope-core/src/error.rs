//! Error taxonomy for Mailscope.
//!
//! Two layers: [`ReconError`] is a precondition failure that aborts an
//! analysis before any probe runs; [`ProbeError`] is a single probe's failure
//! and never leaves the task boundary (it becomes a `ProbeOutcome::Failure`).

/// Fatal errors surfaced by the orchestrator to its caller.
#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("no domain or email supplied; nothing to analyze")]
    MissingTarget,

    #[error("could not resolve a domain from input: {input:?}")]
    UnresolvableDomain { input: String },
}

/// Result type for orchestration entry points.
pub type Result<T> = std::result::Result<T, ReconError>;

/// Errors produced by an individual probe.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProbeError {
    #[error("{probe} timed out after {seconds:.1}s")]
    Timeout { probe: String, seconds: f64 },

    #[error("dns lookup failed: {0}")]
    Dns(String),

    #[error("upstream returned HTTP {status}: {detail}")]
    HttpStatus { status: u16, detail: String },

    #[error("http request failed: {0}")]
    Http(String),

    #[error("upstream API error: {0}")]
    Upstream(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("subprocess failed: {0}")]
    Subprocess(String),

    #[error("smtp error: {0}")]
    Smtp(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("probe task aborted: {0}")]
    Aborted(String),
}

impl ProbeError {
    /// Short machine-readable class of the error, used as failure detail.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Dns(_) => "dns",
            Self::HttpStatus { .. } => "http_status",
            Self::Http(_) => "http",
            Self::Upstream(_) => "upstream",
            Self::Malformed(_) => "malformed",
            Self::Subprocess(_) => "subprocess",
            Self::Smtp(_) => "smtp",
            Self::InvalidInput(_) => "invalid_input",
            Self::Aborted(_) => "aborted",
        }
    }
}

/// Result type for probe implementations.
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display_includes_probe_and_seconds() {
        let err = ProbeError::Timeout {
            probe: "techstack".to_string(),
            seconds: 2.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("techstack"));
        assert!(msg.contains("2.0s"));
        assert_eq!(err.kind(), "timeout");
    }

    #[test]
    fn test_http_status_display() {
        let err = ProbeError::HttpStatus {
            status: 403,
            detail: "invalid key".to_string(),
        };
        assert!(err.to_string().contains("HTTP 403"));
        assert!(err.to_string().contains("invalid key"));
    }

    #[test]
    fn test_unresolvable_domain_display() {
        let err = ReconError::UnresolvableDomain {
            input: "https:///".to_string(),
        };
        assert!(err.to_string().contains("could not resolve a domain"));
    }
}
