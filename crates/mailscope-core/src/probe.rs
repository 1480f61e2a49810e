//! Probe interfaces the orchestrator schedules.
//!
//! Implementations live outside the core. Each call is bounded by the
//! `timeout` it receives and reports failure through [`ProbeResult`]; the
//! orchestrator additionally enforces the same bound from outside.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProbeResult;
use crate::model::accounts::AccountEnumeration;
use crate::model::mailbox::MailboxProbeResult;
use crate::model::mx::MxReport;
use crate::model::outbound::{OutboundMessage, SendReceipt, SmtpTransportConfig};
use crate::model::techstack::TechnologyStack;

/// Mail-exchanger lookup for a domain.
#[async_trait]
pub trait MxLookup: Send + Sync {
    async fn lookup_mx(&self, domain: &str, timeout: Duration) -> ProbeResult<MxReport>;
}

/// Third-party technology-stack lookup.
#[async_trait]
pub trait TechStackLookup: Send + Sync {
    async fn lookup(
        &self,
        domain: &str,
        api_key: &str,
        timeout: Duration,
    ) -> ProbeResult<TechnologyStack>;
}

/// Account-existence enumeration for one email address.
#[async_trait]
pub trait AccountEnumerator: Send + Sync {
    async fn enumerate(&self, email: &str, timeout: Duration) -> ProbeResult<AccountEnumeration>;
}

/// Recipient check against the domain's exchangers. Must never send DATA.
#[async_trait]
pub trait MailboxProber: Send + Sync {
    async fn probe(
        &self,
        email: &str,
        mail_from: &str,
        timeout: Duration,
    ) -> ProbeResult<MailboxProbeResult>;
}

/// Outbound delivery through a configured submission server.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(
        &self,
        transport: &SmtpTransportConfig,
        message: &OutboundMessage,
        timeout: Duration,
    ) -> ProbeResult<SendReceipt>;
}

/// Shared handles to every probe implementation.
#[derive(Clone)]
pub struct ProbeSet {
    pub mx: Arc<dyn MxLookup>,
    pub techstack: Arc<dyn TechStackLookup>,
    pub accounts: Arc<dyn AccountEnumerator>,
    pub mailbox: Arc<dyn MailboxProber>,
    pub sender: Arc<dyn MailSender>,
}

impl ProbeSet {
    pub fn new(
        mx: Arc<dyn MxLookup>,
        techstack: Arc<dyn TechStackLookup>,
        accounts: Arc<dyn AccountEnumerator>,
        mailbox: Arc<dyn MailboxProber>,
        sender: Arc<dyn MailSender>,
    ) -> Self {
        Self {
            mx,
            techstack,
            accounts,
            mailbox,
            sender,
        }
    }
}

impl std::fmt::Debug for ProbeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeSet").finish_non_exhaustive()
    }
}
