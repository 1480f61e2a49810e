//! Account-enumeration payload.

use serde::{Deserialize, Serialize};

/// Sites where a hit means little until the operator signs in. Ordered,
/// matched case-insensitively as substrings of the site name.
pub const LOGIN_REQUIRED_SITES: &[&str] = &[
    "instagram",
    "facebook",
    "twitter",
    "x.com",
    "snapchat",
    "linkedin",
    "amazon",
    "pinterest",
    "tumblr",
    "discord",
    "spotify",
    "adobe",
    "office365",
    "microsoft",
    "protonmail",
];

/// Whether `site` appears in the login-required table.
pub fn requires_login(site: &str) -> bool {
    let site = site.to_lowercase();
    LOGIN_REQUIRED_SITES.iter().any(|entry| site.contains(entry))
}

/// Which bucket a site landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountSignal {
    Positive,
    Negative,
    Unknown,
}

/// One site reported by the enumeration tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountHit {
    pub site: String,
    pub requires_login: bool,
}

impl AccountHit {
    pub fn new(site: impl Into<String>) -> Self {
        let site = site.into();
        let requires_login = requires_login(&site);
        Self {
            site,
            requires_login,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTotals {
    pub positive: usize,
    pub negative: usize,
    pub unknown: usize,
    pub checked: usize,
}

/// Parsed enumeration result for one email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEnumeration {
    pub email: String,
    pub positive: Vec<AccountHit>,
    pub negative: Vec<AccountHit>,
    pub unknown: Vec<AccountHit>,
    pub totals: AccountTotals,
    /// Tool output kept verbatim when nothing in it could be parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl AccountEnumeration {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            positive: Vec::new(),
            negative: Vec::new(),
            unknown: Vec::new(),
            totals: AccountTotals::default(),
            raw_output: None,
        }
    }

    /// File a site under `signal` and keep totals current.
    pub fn record(&mut self, signal: AccountSignal, site: impl Into<String>) {
        let hit = AccountHit::new(site);
        match signal {
            AccountSignal::Positive => self.positive.push(hit),
            AccountSignal::Negative => self.negative.push(hit),
            AccountSignal::Unknown => self.unknown.push(hit),
        }
        self.totals.positive = self.positive.len();
        self.totals.negative = self.negative.len();
        self.totals.unknown = self.unknown.len();
        self.totals.checked = self.totals.checked.max(self.parsed_count());
    }

    /// Number of sites filed into any bucket.
    pub fn parsed_count(&self) -> usize {
        self.positive.len() + self.negative.len() + self.unknown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsed_count() == 0
    }
}
