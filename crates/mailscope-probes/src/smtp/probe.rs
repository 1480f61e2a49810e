//! Mailbox-existence probe over SMTP.
//!
//! Walks the recipient domain's exchangers in preference order until one
//! accepts the envelope sender, then issues `RCPT TO` for the target and for a
//! random local part to detect catch-all domains. `DATA` is never sent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use mailscope_core::{
    MailboxProbeResult, MailboxProber, MailboxVerdict, MxLookup, ProbeError, ProbeResult,
};

use super::session::SmtpSession;

pub const DEFAULT_PROBE_PORT: u16 = 25;
const DEFAULT_HELO_NAME: &str = "localhost";

/// [`MailboxProber`] speaking plain SMTP to the recipient's exchangers.
#[derive(Clone)]
pub struct SmtpMailboxProber {
    mx: Arc<dyn MxLookup>,
    port: u16,
    helo_name: String,
}

impl std::fmt::Debug for SmtpMailboxProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailboxProber")
            .field("port", &self.port)
            .field("helo_name", &self.helo_name)
            .finish_non_exhaustive()
    }
}

impl SmtpMailboxProber {
    pub fn new(mx: Arc<dyn MxLookup>) -> Self {
        Self {
            mx,
            port: DEFAULT_PROBE_PORT,
            helo_name: DEFAULT_HELO_NAME.to_string(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_helo_name(mut self, name: impl Into<String>) -> Self {
        self.helo_name = name.into();
        self
    }

    async fn probe_host(
        &self,
        host: &str,
        email: &str,
        random: &str,
        mail_from: &str,
    ) -> ProbeResult<MailboxProbeResult> {
        let (mut session, _greeting) = SmtpSession::connect(host, self.port).await?;
        let result = self
            .check_recipient(&mut session, host, email, random, mail_from)
            .await;
        session.quit().await;
        result
    }

    async fn check_recipient(
        &self,
        session: &mut SmtpSession,
        host: &str,
        email: &str,
        random: &str,
        mail_from: &str,
    ) -> ProbeResult<MailboxProbeResult> {
        session.hello(&self.helo_name).await?;

        let reply = session.command(&format!("MAIL FROM:<{mail_from}>")).await?;
        if !reply.is_positive() {
            return Err(ProbeError::Smtp(format!("MAIL FROM rejected by {host}: {reply}")));
        }

        let target = session.command(&format!("RCPT TO:<{email}>")).await?;
        let catch_all = if target.is_positive() {
            session.command(&format!("RCPT TO:<{random}>")).await.ok()
        } else {
            None
        };
        let catch_all_code = catch_all.as_ref().map(|r| r.code);

        Ok(MailboxProbeResult {
            email: email.to_string(),
            mx_host: host.to_string(),
            verdict: MailboxVerdict::from_codes(target.code, catch_all_code),
            target_code: target.code,
            target_reply: target.text(),
            catch_all_address: random.to_string(),
            catch_all_code,
        })
    }
}

fn split_address(email: &str) -> ProbeResult<(&str, &str)> {
    match email.trim().rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok((local, domain)),
        _ => Err(ProbeError::InvalidInput(format!(
            "invalid recipient email: {email:?}"
        ))),
    }
}

/// Even share of the time left before `deadline` for the next of
/// `hosts_left` exchangers. Time a fast-failing host leaves unused carries
/// over to the ones after it.
fn host_budget(deadline: Instant, now: Instant, hosts_left: usize) -> Duration {
    let remaining = deadline.saturating_duration_since(now);
    let hosts_left = u32::try_from(hosts_left.max(1)).unwrap_or(u32::MAX);
    remaining / hosts_left
}

#[async_trait]
impl MailboxProber for SmtpMailboxProber {
    #[instrument(skip(self, timeout), fields(probe = "mailbox"))]
    async fn probe(
        &self,
        email: &str,
        mail_from: &str,
        timeout: Duration,
    ) -> ProbeResult<MailboxProbeResult> {
        let deadline = Instant::now() + timeout;
        let (_, domain) = split_address(email)?;
        let email = email.trim();

        let report = self.mx.lookup_mx(domain, timeout).await?;
        if report.records.is_empty() {
            let reason = report
                .warnings
                .first()
                .map(|w| w.message())
                .unwrap_or("no MX records");
            return Err(ProbeError::Dns(format!("no MX hosts for {domain}: {reason}")));
        }

        let random = format!("{}@{domain}", Uuid::new_v4().simple());
        let hosts = report.hosts();
        let mut last_error = None;

        for (index, host) in hosts.iter().enumerate() {
            let budget = host_budget(deadline, Instant::now(), hosts.len() - index);
            if budget.is_zero() {
                break;
            }
            let attempt =
                tokio::time::timeout(budget, self.probe_host(host, email, &random, mail_from))
                    .await;
            match attempt {
                Ok(Ok(result)) => {
                    info!(host = %host, verdict = %result.verdict, "mailbox probe answered");
                    return Ok(result);
                }
                Ok(Err(err)) => {
                    debug!(host = %host, error = %err, "skipping exchanger");
                    last_error = Some(err);
                }
                Err(_) => {
                    debug!(host = %host, budget_ms = budget.as_millis() as u64, "exchanger timed out");
                    last_error = Some(ProbeError::Timeout {
                        probe: format!("mailbox probe on {host}"),
                        seconds: budget.as_secs_f64(),
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ProbeError::Timeout {
            probe: "mailbox probe".to_string(),
            seconds: timeout.as_secs_f64(),
        }))
    }
}
