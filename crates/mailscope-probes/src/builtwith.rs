//! BuiltWith technology-stack client.
//!
//! One `GET /v21/api.json?KEY=..&LOOKUP=..` per call. The response is read
//! leniently: technologies may sit under `Results[].Result.Paths[]` or in a
//! top-level `Technologies` array, and categories may be plain strings or
//! `{ "Name": .. }` objects.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use mailscope_core::model::{DetectedTechnology, TechnologyStack};
use mailscope_core::{ProbeError, ProbeResult, TechStackLookup};

use crate::error::{Result, SetupError};

pub const DEFAULT_BASE_URL: &str = "https://api.builtwith.com";
const API_PATH: &str = "/v21/api.json";
const USER_AGENT: &str = concat!("mailscope/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY: usize = 200;

/// HTTP client for the BuiltWith domain API.
#[derive(Debug, Clone)]
pub struct BuiltWithClient {
    http: reqwest::Client,
    base_url: String,
}

impl BuiltWithClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point the client at another host, e.g. a local fake in tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SetupError::BaseUrl {
                url: base_url,
                reason: "scheme must be http or https".to_string(),
            });
        }
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, base_url })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{API_PATH}", self.base_url)
    }
}

#[async_trait]
impl TechStackLookup for BuiltWithClient {
    #[instrument(skip(self, api_key), fields(probe = "techstack"))]
    async fn lookup(
        &self,
        domain: &str,
        api_key: &str,
        timeout: Duration,
    ) -> ProbeResult<TechnologyStack> {
        let transport_error = |err: reqwest::Error| {
            if err.is_timeout() {
                ProbeError::Timeout {
                    probe: "techstack".to_string(),
                    seconds: timeout.as_secs_f64(),
                }
            } else {
                // Drop the URL; it carries the API key.
                ProbeError::Http(err.without_url().to_string())
            }
        };

        let response = self
            .http
            .get(self.endpoint())
            .query(&[("KEY", api_key), ("LOOKUP", domain)])
            .timeout(timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(ProbeError::HttpStatus {
                status: status.as_u16(),
                detail: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ProbeError::Malformed(format!("invalid JSON from BuiltWith: {e}")))?;
        let detections = parse_response(&value)?;
        debug!(detections = detections.len(), "technology lookup answered");
        Ok(TechnologyStack::normalize(domain, &detections))
    }
}

/// Extract detections from a BuiltWith response body.
pub fn parse_response(value: &Value) -> ProbeResult<Vec<DetectedTechnology>> {
    let root = value
        .as_object()
        .ok_or_else(|| ProbeError::Malformed("expected a JSON object".to_string()))?;

    if let Some(errors) = root.get("Errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(error_message).collect();
            return Err(ProbeError::Upstream(format!(
                "BuiltWith: {}",
                messages.join("; ")
            )));
        }
    }

    let mut detections = Vec::new();
    for result in array(root.get("Results")) {
        let paths = result.get("Result").and_then(|r| r.get("Paths"));
        for path in array(paths) {
            detections.extend(array(path.get("Technologies")).iter().filter_map(technology));
        }
    }
    detections.extend(array(root.get("Technologies")).iter().filter_map(technology));
    Ok(detections)
}

fn array(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn technology(value: &Value) -> Option<DetectedTechnology> {
    let name = value.get("Name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }

    let mut categories: Vec<String> = array(value.get("Categories"))
        .iter()
        .filter_map(|c| match c {
            Value::String(s) => Some(s.clone()),
            Value::Object(o) => o.get("Name").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect();
    if categories.is_empty() {
        if let Some(tag) = value.get("Tag").and_then(Value::as_str) {
            categories.push(tag.to_string());
        }
    }
    Some(DetectedTechnology::new(name, categories))
}

fn error_message(value: &Value) -> String {
    value
        .get("Message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

fn truncate(body: &str, max: usize) -> String {
    let body = body.trim();
    match body.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_paths_and_category_shapes() {
        let body = json!({
            "Results": [{
                "Result": {
                    "Paths": [
                        {"Technologies": [
                            {"Name": "jQuery 1.10.1", "Categories": ["JavaScript Library"]},
                            {"Name": "nginx", "Categories": [{"Name": "Web Server"}]},
                        ]},
                        {"Technologies": [
                            {"Name": "Google Analytics", "Tag": "analytics"},
                            {"Name": "Mystery"},
                        ]},
                    ]
                }
            }],
            "Errors": []
        });

        let detections = parse_response(&body).unwrap();
        let names: Vec<&str> = detections.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["jQuery 1.10.1", "nginx", "Google Analytics", "Mystery"]);
        assert_eq!(detections[1].categories, vec!["Web Server"]);
        assert_eq!(detections[2].categories, vec!["analytics"]);
        assert!(detections[3].categories.is_empty());
    }

    #[test]
    fn test_top_level_technologies_accepted() {
        let body = json!({"Technologies": [{"Name": "WordPress", "Categories": ["CMS"]}]});
        let detections = parse_response(&body).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].name, "WordPress");
    }

    #[test]
    fn test_api_errors_become_failure() {
        let body = json!({"Results": [], "Errors": [{"Message": "Invalid API key"}]});
        let err = parse_response(&body).unwrap_err();
        assert_eq!(err.kind(), "upstream");
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = parse_response(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate("  short ", 10), "short");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }

    #[test]
    fn test_base_url_requires_http_scheme() {
        assert!(BuiltWithClient::with_base_url("ftp://example.com").is_err());
        let client = BuiltWithClient::with_base_url("http://127.0.0.1:9/").unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9/v21/api.json");
    }
}
