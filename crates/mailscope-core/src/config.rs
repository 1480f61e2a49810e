//! Explicit orchestration configuration.
//!
//! Built once by the caller and shared read-only; nothing in the core reads
//! the process environment.

use serde::{Deserialize, Serialize};

use crate::model::outbound::SmtpTransportConfig;

pub const DEFAULT_MAX_WORKERS: usize = 4;
pub const DEFAULT_PATTERN_CHECK_CAP: usize = 10;

/// Mailbox-existence probe settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxProbeConfig {
    pub enabled: bool,
    /// Envelope sender for `MAIL FROM`. The probe is skipped without one.
    pub mail_from: Option<String>,
}

impl Default for MailboxProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mail_from: None,
        }
    }
}

impl MailboxProbeConfig {
    /// The envelope sender, if the probe should run at all.
    pub fn active_sender(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.mail_from.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Configuration for [`crate::Orchestrator`].
#[derive(Clone, Serialize, Deserialize)]
pub struct ReconConfig {
    /// Worker ceiling for each probe wave.
    pub max_workers: usize,
    /// Upper bound on generated addresses checked in the secondary wave.
    pub pattern_check_cap: usize,
    /// Technology-stack API key; the probe is skipped without one.
    #[serde(skip_serializing)]
    pub techstack_api_key: Option<String>,
    pub mailbox_probe: MailboxProbeConfig,
    /// Outbound transport; the training email is sent only when present.
    pub transport: Option<SmtpTransportConfig>,
    pub training_url: Option<String>,
}

impl std::fmt::Debug for ReconConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconConfig")
            .field("max_workers", &self.max_workers)
            .field("pattern_check_cap", &self.pattern_check_cap)
            .field(
                "techstack_api_key",
                &self.techstack_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("mailbox_probe", &self.mailbox_probe)
            .field("transport", &self.transport)
            .field("training_url", &self.training_url)
            .finish()
    }
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            pattern_check_cap: DEFAULT_PATTERN_CHECK_CAP,
            techstack_api_key: None,
            mailbox_probe: MailboxProbeConfig::default(),
            transport: None,
            training_url: None,
        }
    }
}

impl ReconConfig {
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_pattern_check_cap(mut self, cap: usize) -> Self {
        self.pattern_check_cap = cap;
        self
    }

    pub fn with_techstack_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.techstack_api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    pub fn with_mailbox_probe(mut self, mailbox_probe: MailboxProbeConfig) -> Self {
        self.mailbox_probe = mailbox_probe;
        self
    }

    pub fn with_transport(mut self, transport: SmtpTransportConfig) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_training_url(mut self, url: impl Into<String>) -> Self {
        self.training_url = Some(url.into());
        self
    }

    /// API key, if the technology-stack probe should be scheduled.
    pub fn techstack_key(&self) -> Option<&str> {
        self.techstack_api_key.as_deref()
    }
}
