//! Analysis input and domain resolution.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ReconError, Result};

/// Default per-probe timeout when the caller does not supply one.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 15;

/// One analysis request. Built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub domain: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub timeout_seconds: u64,
}

impl AnalysisRequest {
    /// Request targeting a bare domain.
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: Some(domain.into()),
            ..Self::empty()
        }
    }

    /// Request targeting an email address; the domain is derived from it.
    pub fn for_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::empty()
        }
    }

    /// Request with no target. Only useful as a base for the `with_*` setters;
    /// analyzing it fails the precondition check.
    pub fn empty() -> Self {
        Self {
            domain: None,
            email: None,
            first_name: None,
            last_name: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = non_blank(domain.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = non_blank(email.into());
        self
    }

    pub fn with_names(mut self, first_name: Option<String>, last_name: Option<String>) -> Self {
        self.first_name = first_name.and_then(non_blank);
        self.last_name = last_name.and_then(non_blank);
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds.max(1);
        self
    }

    /// Per-task timeout derived from `timeout_seconds`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    /// Whether either name field carries a value.
    pub fn has_names(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some()
    }

    /// Resolve the effective domain: `domain` if given, else the part of
    /// `email` after the last `@`.
    pub fn resolve_domain(&self) -> Result<String> {
        let source = match (present(self.domain.as_deref()), present(self.email.as_deref())) {
            (Some(domain), _) => domain,
            (None, Some(email)) => email,
            (None, None) => return Err(ReconError::MissingTarget),
        };
        extract_domain(source).ok_or_else(|| ReconError::UnresolvableDomain {
            input: source.to_string(),
        })
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn scheme_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^https?://").expect("static regex"))
}

/// Extract a bare, lowercased domain from a domain, URL-ish string, or email.
///
/// Returns `None` when nothing usable remains.
pub fn extract_domain(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let candidate = match value.rsplit_once('@') {
        Some((_, host)) => host,
        None => value,
    };
    let candidate = scheme_re().replace(candidate, "");
    let candidate = candidate
        .split('/')
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches('.')
        .to_lowercase();
    if candidate.is_empty() {
        None
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_domain_falls_back_to_email() {
        let request = AnalysisRequest::for_domain("   ").with_email("ada@Example.com");
        assert_eq!(request.resolve_domain().unwrap(), "example.com");

        let request = AnalysisRequest {
            domain: Some(String::new()),
            email: None,
            ..AnalysisRequest::empty()
        };
        assert!(matches!(
            request.resolve_domain(),
            Err(ReconError::MissingTarget)
        ));
    }

    #[test]
    fn test_extract_domain_from_email() {
        assert_eq!(
            extract_domain("Ada@Example.COM"),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_domain_strips_scheme_path_and_port() {
        assert_eq!(
            extract_domain(" https://www.example.com:8443/login "),
            Some("www.example.com".to_string())
        );
        assert_eq!(extract_domain("example.org."), Some("example.org".to_string()));
    }

    #[test]
    fn test_extract_domain_uses_last_at_sign() {
        assert_eq!(
            extract_domain("\"odd@local\"@mail.example.net"),
            Some("mail.example.net".to_string())
        );
    }

    #[test]
    fn test_extract_domain_empty_inputs() {
        assert_eq!(extract_domain(""), None);
        assert_eq!(extract_domain("user@"), None);
        assert_eq!(extract_domain("https://"), None);
    }

    #[test]
    fn test_resolve_prefers_domain_over_email() {
        let request = AnalysisRequest::for_domain("Example.com").with_email("a@other.org");
        assert_eq!(request.resolve_domain().unwrap(), "example.com");
    }

    #[test]
    fn test_resolve_falls_back_to_email() {
        let request = AnalysisRequest::for_email("ada@analytical.engine");
        assert_eq!(request.resolve_domain().unwrap(), "analytical.engine");
    }

    #[test]
    fn test_resolve_without_target_is_precondition_error() {
        let err = AnalysisRequest::empty().resolve_domain().unwrap_err();
        assert!(matches!(err, ReconError::MissingTarget));
    }

    #[test]
    fn test_resolve_unusable_email_is_precondition_error() {
        let err = AnalysisRequest::for_email("nobody@").resolve_domain().unwrap_err();
        assert!(matches!(err, ReconError::UnresolvableDomain { .. }));
    }

    #[test]
    fn test_blank_setters_are_ignored() {
        let request = AnalysisRequest::empty()
            .with_domain("   ")
            .with_names(Some(" ".to_string()), Some("Lovelace".to_string()));
        assert_eq!(request.domain, None);
        assert_eq!(request.first_name, None);
        assert_eq!(request.last_name.as_deref(), Some("Lovelace"));
        assert!(request.has_names());
    }

    #[test]
    fn test_timeout_has_floor_of_one_second() {
        let request = AnalysisRequest::for_domain("example.com").with_timeout_seconds(0);
        assert_eq!(request.timeout(), Duration::from_secs(1));
    }
}
