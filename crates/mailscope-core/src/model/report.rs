//! Combined analysis report.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::accounts::AccountEnumeration;
use crate::model::mailbox::MailboxProbeResult;
use crate::model::mx::MxReport;
use crate::model::outbound::SendReceipt;
use crate::model::outcome::ProbeOutcome;
use crate::model::request::AnalysisRequest;
use crate::model::techstack::TechnologyStack;
use crate::patterns::EmailPattern;
use crate::template::TrainingTemplate;

/// Primary-wave probe slot. Ordered by name so report keys are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Accounts,
    Mx,
    #[serde(rename = "techstack")]
    TechStack,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accounts => "accounts",
            Self::Mx => "mx",
            Self::TechStack => "techstack",
        }
    }
}

impl std::fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a primary-wave probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProbePayload {
    Accounts(AccountEnumeration),
    Mx(MxReport),
    TechStack(TechnologyStack),
}

/// Account-enumeration outcome for one generated address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternCheck {
    pub email: String,
    pub outcome: ProbeOutcome<AccountEnumeration>,
}

/// Secondary wave over generated addresses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatternCheckBatch {
    /// Addresses submitted, in generation order.
    pub checked_emails: Vec<String>,
    /// In completion order.
    pub results: Vec<PatternCheck>,
}

impl PatternCheckBatch {
    pub fn result_for(&self, email: &str) -> Option<&PatternCheck> {
        self.results.iter().find(|check| check.email == email)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentError {
    pub component: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMeta {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub errors: Vec<ComponentError>,
}

/// Everything one analysis produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub input: AnalysisRequest,
    pub resolved_domain: String,
    pub probes: BTreeMap<ProbeKind, ProbeOutcome<ProbePayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_patterns: Option<Vec<EmailPattern>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_checks: Option<PatternCheckBatch>,
    pub training_template: TrainingTemplate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailbox_probe: Option<ProbeOutcome<MailboxProbeResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail_send: Option<ProbeOutcome<SendReceipt>>,
    pub meta: ReportMeta,
}

impl AnalysisReport {
    pub fn probe(&self, kind: ProbeKind) -> Option<&ProbeOutcome<ProbePayload>> {
        self.probes.get(&kind)
    }

    /// MX payload, when the lookup ran and succeeded.
    pub fn mx(&self) -> Option<&MxReport> {
        match self.probe(ProbeKind::Mx)?.success()? {
            ProbePayload::Mx(report) => Some(report),
            _ => None,
        }
    }

    pub fn techstack(&self) -> Option<&TechnologyStack> {
        match self.probe(ProbeKind::TechStack)?.success()? {
            ProbePayload::TechStack(stack) => Some(stack),
            _ => None,
        }
    }

    pub fn accounts(&self) -> Option<&AccountEnumeration> {
        match self.probe(ProbeKind::Accounts)?.success()? {
            ProbePayload::Accounts(accounts) => Some(accounts),
            _ => None,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.meta.errors.is_empty()
    }
}
