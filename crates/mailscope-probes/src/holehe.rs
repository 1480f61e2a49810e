//! Account enumeration through the `holehe` command-line tool.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, instrument};

use mailscope_core::model::{AccountEnumeration, AccountSignal};
use mailscope_core::{AccountEnumerator, ProbeError, ProbeResult};

pub const DEFAULT_BINARY: &str = "holehe";

/// Runs `holehe [args..] <email>` and parses what it prints.
#[derive(Debug, Clone)]
pub struct HoleheRunner {
    binary: PathBuf,
    args: Vec<String>,
}

impl Default for HoleheRunner {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
            args: vec!["--no-color".to_string()],
        }
    }
}

impl HoleheRunner {
    /// Runner for a specific executable, with no extra arguments.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl AccountEnumerator for HoleheRunner {
    #[instrument(skip(self), fields(probe = "accounts", binary = %self.binary.display()))]
    async fn enumerate(&self, email: &str, timeout: Duration) -> ProbeResult<AccountEnumeration> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ProbeError::InvalidInput(format!("not an email address: {email:?}")));
        }

        let child = Command::new(&self.binary)
            .args(&self.args)
            .arg(email)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ProbeError::Subprocess(format!("failed to start {}: {e}", self.binary.display()))
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ProbeError::Subprocess(e.to_string()))?,
            Err(_) => {
                return Err(ProbeError::Timeout {
                    probe: "accounts".to_string(),
                    seconds: timeout.as_secs_f64(),
                })
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed = parse_output(email, &stdout);
        debug!(
            status = %output.status,
            parsed = parsed.parsed_count(),
            "holehe finished"
        );

        if !output.status.success() && parsed.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::Subprocess(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }
        Ok(parsed)
    }
}

fn ansi_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("static regex"))
}

fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[([+\-x!])\]\s+(\S+)").expect("static regex"))
}

fn checked_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s+websites?\s+checked").expect("static regex"))
}

/// Parse holehe output, JSON or text.
///
/// Never fails: output without any recognizable line is kept in
/// `raw_output`.
pub fn parse_output(email: &str, output: &str) -> AccountEnumeration {
    let clean = ansi_re().replace_all(output, "");
    let trimmed = clean.trim();

    let mut result = AccountEnumeration::new(email);
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            parse_json(&mut result, &value);
            return finish(result, None, trimmed);
        }
    }

    let mut checked = None;
    for line in trimmed.lines().map(str::trim) {
        if let Some(caps) = checked_re().captures(line) {
            checked = caps[1].parse::<usize>().ok();
            continue;
        }
        let Some(caps) = line_re().captures(line) else {
            continue;
        };
        let site = &caps[2];
        // The legend line ("[+] Email used, ...") names no site.
        if !site.contains('.') {
            continue;
        }
        let signal = match &caps[1] {
            "+" => AccountSignal::Positive,
            "-" => AccountSignal::Negative,
            _ => AccountSignal::Unknown,
        };
        result.record(signal, site.trim_end_matches(','));
    }
    finish(result, checked, trimmed)
}

fn parse_json(result: &mut AccountEnumeration, value: &Value) {
    let entries = match value {
        Value::Array(entries) => entries.as_slice(),
        Value::Object(map) => map
            .get("results")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    for entry in entries {
        let site = entry
            .get("domain")
            .or_else(|| entry.get("name"))
            .and_then(Value::as_str);
        let Some(site) = site else { continue };

        let rate_limited = entry.get("rateLimit").and_then(Value::as_bool) == Some(true);
        let signal = match entry.get("exists").and_then(Value::as_bool) {
            _ if rate_limited => AccountSignal::Unknown,
            Some(true) => AccountSignal::Positive,
            Some(false) => AccountSignal::Negative,
            None => AccountSignal::Unknown,
        };
        result.record(signal, site);
    }
}

fn finish(
    mut result: AccountEnumeration,
    checked: Option<usize>,
    output: &str,
) -> AccountEnumeration {
    if let Some(checked) = checked {
        result.totals.checked = checked;
    }
    if result.is_empty() && !output.is_empty() {
        result.raw_output = Some(output.to_string());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
*************************
   ada@example.com
*************************
\x1b[32m[+] twitter.com\x1b[0m
[-] instagram.com
[+] github.com
[x] snapchat.com
[!] someforum.net
[+] Email used, [-] Email not used, [x] Rate limit, [!] Error
121 websites checked in 10.43 seconds
";

    #[test]
    fn test_parses_text_output() {
        let result = parse_output("ada@example.com", SAMPLE);
        let positive: Vec<&str> = result.positive.iter().map(|h| h.site.as_str()).collect();
        assert_eq!(positive, vec!["twitter.com", "github.com"]);
        assert_eq!(result.negative.len(), 1);
        assert_eq!(result.unknown.len(), 2);
        assert_eq!(result.totals.positive, 2);
        assert_eq!(result.totals.checked, 121);
        assert!(result.raw_output.is_none());
        assert!(result.positive[0].requires_login);
    }

    #[test]
    fn test_checked_defaults_to_sum() {
        let result = parse_output("a@b.co", "[+] github.com\n[-] spotify.com\n");
        assert_eq!(result.totals.checked, 2);
    }

    #[test]
    fn test_parses_json_output() {
        let json = r#"[
            {"name": "twitter", "domain": "twitter.com", "exists": true, "rateLimit": false},
            {"name": "instagram", "domain": "instagram.com", "exists": false, "rateLimit": false},
            {"name": "snapchat", "exists": true, "rateLimit": true},
            {"name": "mystery"}
        ]"#;
        let result = parse_output("ada@example.com", json);
        assert_eq!(result.positive.len(), 1);
        assert_eq!(result.positive[0].site, "twitter.com");
        assert_eq!(result.negative[0].site, "instagram.com");
        let unknown: Vec<&str> = result.unknown.iter().map(|h| h.site.as_str()).collect();
        assert_eq!(unknown, vec!["snapchat", "mystery"]);
        assert_eq!(result.totals.checked, 4);
    }

    #[test]
    fn test_unrecognized_output_kept_raw() {
        let result = parse_output("ada@example.com", "gmail: FOUND\noutlook: FOUND");
        assert!(result.is_empty());
        assert_eq!(result.raw_output.as_deref(), Some("gmail: FOUND\noutlook: FOUND"));
    }

    #[test]
    fn test_empty_output_has_no_raw() {
        let result = parse_output("ada@example.com", "  \n");
        assert!(result.is_empty());
        assert!(result.raw_output.is_none());
    }

    #[tokio::test]
    async fn test_rejects_non_email() {
        let runner = HoleheRunner::new("/nonexistent/holehe");
        let err = runner
            .enumerate("not-an-email", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[tokio::test]
    async fn test_missing_binary_is_subprocess_failure() {
        let runner = HoleheRunner::new("/nonexistent/holehe");
        let err = runner
            .enumerate("ada@example.com", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "subprocess");
    }
}
