//! Terminal per-probe outcome.

use serde::Serialize;

use crate::error::{ProbeError, ProbeResult};

/// Result of one probe invocation. Always terminal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum ProbeOutcome<T> {
    Success(T),
    Failure {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl<T> ProbeOutcome<T> {
    pub fn failure(message: impl Into<String>, detail: Option<String>) -> Self {
        Self::Failure {
            message: message.into(),
            detail,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Failure { .. } => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { message, .. } => Some(message),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ProbeOutcome<U> {
        match self {
            Self::Success(payload) => ProbeOutcome::Success(f(payload)),
            Self::Failure { message, detail } => ProbeOutcome::Failure { message, detail },
        }
    }
}

impl<T> From<ProbeResult<T>> for ProbeOutcome<T> {
    fn from(result: ProbeResult<T>) -> Self {
        match result {
            Ok(payload) => Self::Success(payload),
            Err(err) => Self::from_error(&err),
        }
    }
}

impl<T> ProbeOutcome<T> {
    pub fn from_error(err: &ProbeError) -> Self {
        Self::Failure {
            message: err.to_string(),
            detail: Some(err.kind().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ok_result_is_success() {
        let outcome: ProbeOutcome<u32> = Ok(7).into();
        assert!(outcome.is_success());
        assert_eq!(outcome.success(), Some(&7));
        assert_eq!(outcome.failure_message(), None);
    }

    #[test]
    fn test_from_err_result_keeps_message_and_kind() {
        let outcome: ProbeOutcome<u32> = Err(ProbeError::Dns("SERVFAIL".to_string())).into();
        match outcome {
            ProbeOutcome::Failure { message, detail } => {
                assert!(message.contains("SERVFAIL"));
                assert_eq!(detail.as_deref(), Some("dns"));
            }
            ProbeOutcome::Success(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn test_serializes_adjacently_tagged() {
        let ok: ProbeOutcome<u32> = ProbeOutcome::Success(3);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"], 3);

        let failed: ProbeOutcome<u32> = ProbeOutcome::failure("boom", None);
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["data"]["message"], "boom");
        assert!(json["data"].get("detail").is_none());
    }

    #[test]
    fn test_map_preserves_failure() {
        let failed: ProbeOutcome<u32> = ProbeOutcome::failure("nope", Some("x".to_string()));
        let mapped = failed.map(|v| v.to_string());
        assert_eq!(mapped.failure_message(), Some("nope"));
    }
}
