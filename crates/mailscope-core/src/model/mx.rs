//! MX lookup payload and mail-provider classification.

use serde::{Deserialize, Serialize};

/// A single mail exchanger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into().trim_end_matches('.').to_lowercase(),
        }
    }
}

/// Soft conditions reported instead of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MxWarning {
    NoRecords,
    NxDomain,
    Timeout,
}

impl MxWarning {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoRecords => "No MX records found",
            Self::NxDomain => "Domain does not exist",
            Self::Timeout => "DNS lookup timed out",
        }
    }
}

impl std::fmt::Display for MxWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of an MX lookup.
///
/// Either `records` is non-empty, or it is empty and `warnings` says why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MxReport {
    pub domain: String,
    pub records: Vec<MxRecord>,
    pub provider: String,
    pub warnings: Vec<MxWarning>,
}

impl MxReport {
    /// Report from resolved records, sorted by preference and classified.
    pub fn from_records(domain: impl Into<String>, mut records: Vec<MxRecord>) -> Self {
        if records.is_empty() {
            return Self::degraded(domain, MxWarning::NoRecords);
        }
        records.sort_by(|a, b| {
            a.preference
                .cmp(&b.preference)
                .then_with(|| a.exchange.cmp(&b.exchange))
        });
        let provider = classify_provider(records.iter().map(|r| r.exchange.as_str())).to_string();
        Self {
            domain: domain.into(),
            records,
            provider,
            warnings: Vec::new(),
        }
    }

    /// Empty report carrying a single soft warning.
    pub fn degraded(domain: impl Into<String>, warning: MxWarning) -> Self {
        Self {
            domain: domain.into(),
            records: Vec::new(),
            provider: UNKNOWN_PROVIDER.to_string(),
            warnings: vec![warning],
        }
    }

    /// Exchange hosts in preference order.
    pub fn hosts(&self) -> Vec<String> {
        self.records.iter().map(|r| r.exchange.clone()).collect()
    }

    /// Provider name, unless classification found nothing useful.
    pub fn known_provider(&self) -> Option<&str> {
        match self.provider.as_str() {
            UNKNOWN_PROVIDER | OTHER_PROVIDER => None,
            other => Some(other),
        }
    }
}

pub const UNKNOWN_PROVIDER: &str = "Unknown";
pub const OTHER_PROVIDER: &str = "Other";

/// Ordered (host fragment, provider) table. First entry matching any host wins.
pub const PROVIDER_TABLE: &[(&str, &str)] = &[
    ("aspmx.l.google.com", "Google Workspace"),
    (".google.com", "Google Workspace"),
    (".googlemail.com", "Google Workspace"),
    ("mail.protection.outlook.com", "Microsoft 365"),
    (".olc.protection.outlook.com", "Microsoft 365"),
    ("outlook.com", "Microsoft 365"),
    ("hotmail.com", "Microsoft 365"),
    ("yahoodns.net", "Yahoo Mail"),
    ("mx.aol.com", "Yahoo Mail"),
    ("zoho.com", "Zoho Mail"),
    ("zoho.eu", "Zoho Mail"),
    ("protonmail.ch", "Proton Mail"),
    ("proton.me", "Proton Mail"),
    ("messagingengine.com", "Fastmail"),
    ("icloud.com", "iCloud Mail"),
    ("mimecast.com", "Mimecast"),
    ("pphosted.com", "Proofpoint"),
    ("ppe-hosted.com", "Proofpoint"),
    ("messagelabs.com", "Broadcom Email Security"),
    ("barracudanetworks.com", "Barracuda"),
    ("secureserver.net", "GoDaddy"),
    ("mailgun.org", "Mailgun"),
    ("sendgrid.net", "SendGrid"),
    ("amazonaws.com", "Amazon SES"),
    ("yandex.net", "Yandex Mail"),
    (".mail.ru", "Mail.ru"),
    ("ovh.net", "OVH"),
    ("ionos", "IONOS"),
];

/// Classify the mail provider from exchange hosts.
///
/// Case-insensitive substring matching; table order breaks ties. An empty host
/// list is `Unknown`, a non-empty list with no match is `Other`.
pub fn classify_provider<'a>(hosts: impl IntoIterator<Item = &'a str>) -> &'static str {
    let hosts: Vec<String> = hosts
        .into_iter()
        .map(|h| h.trim().trim_end_matches('.').to_lowercase())
        .filter(|h| !h.is_empty())
        .collect();
    if hosts.is_empty() {
        return UNKNOWN_PROVIDER;
    }
    PROVIDER_TABLE
        .iter()
        .find(|(fragment, _)| hosts.iter().any(|h| h.contains(fragment)))
        .map(|(_, provider)| *provider)
        .unwrap_or(OTHER_PROVIDER)
}
