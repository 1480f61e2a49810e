//! Analysis orchestration.
//!
//! [`Orchestrator::analyze`] resolves the target domain, runs the primary
//! probe wave, fans out over generated addresses, derives the training
//! template and optionally probes or mails the target address. Probe failures
//! are recorded in the report; only a missing target fails the call.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tracing::{info, instrument, Span};

use crate::config::ReconConfig;
use crate::error::Result;
use crate::model::mailbox::MailboxProbeResult;
use crate::model::mx::MxReport;
use crate::model::outbound::{OutboundMessage, SendReceipt};
use crate::model::outcome::ProbeOutcome;
use crate::model::report::{
    AnalysisReport, ComponentError, PatternCheck, PatternCheckBatch, ProbeKind, ProbePayload,
    ReportMeta,
};
use crate::model::request::AnalysisRequest;
use crate::model::techstack::TechnologyStack;
use crate::patterns::{self, EmailPattern};
use crate::probe::ProbeSet;
use crate::telemetry::{emit_analysis_finished, emit_analysis_started};
use crate::template::{self, TemplateContext, TrainingTemplate};
use crate::wave::{run_single, run_wave, ProbeTask, WaveConfig};

/// Component name prefix for secondary-wave errors.
pub const PATTERN_CHECK_COMPONENT: &str = "pattern_check";
pub const MAILBOX_PROBE_COMPONENT: &str = "mailbox_probe";
pub const MAIL_SEND_COMPONENT: &str = "mail_send";

/// Runs analyses against a fixed configuration and probe set.
///
/// Cheap to clone; holds no per-request state.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: Arc<ReconConfig>,
    probes: ProbeSet,
}

impl Orchestrator {
    pub fn new(config: ReconConfig, probes: ProbeSet) -> Self {
        Self {
            config: Arc::new(config),
            probes,
        }
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    /// Analyze one request.
    ///
    /// Fails only when no domain can be resolved, before any probe runs.
    #[instrument(skip_all, fields(domain = tracing::field::Empty))]
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisReport> {
        let started_at = Utc::now();
        let clock = tokio::time::Instant::now();

        let domain = request.resolve_domain()?;
        Span::current().record("domain", domain.as_str());

        let email = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        let timeout = request.timeout();
        let wave = WaveConfig::new(self.config.max_workers, timeout);
        let mut errors = Vec::new();

        // Primary wave
        let tasks = self.primary_tasks(&domain, email.as_deref(), timeout);
        emit_analysis_started(&domain, tasks.len());

        let mut probes = BTreeMap::new();
        for (kind, outcome) in run_wave("primary", tasks, &wave).await {
            record_failure(&mut errors, kind.as_str(), &outcome);
            probes.insert(kind, outcome);
        }

        // Secondary wave over generated addresses
        let (email_patterns, pattern_checks) = if request.has_names() {
            let generated = patterns::generate(
                request.first_name.as_deref().unwrap_or_default(),
                request.last_name.as_deref().unwrap_or_default(),
                Some(&domain),
            );
            let batch = self.check_patterns(&generated, &wave, &mut errors).await;
            (Some(generated), Some(batch))
        } else {
            (None, None)
        };

        let training_template = self.training_template(&request, &domain, &probes);

        let mut mailbox_probe = None;
        let mut mail_send = None;
        if let Some(target) = email.as_deref() {
            mailbox_probe = self.probe_mailbox(target, timeout, &mut errors).await;
            mail_send = self
                .send_training(target, &training_template, timeout, &mut errors)
                .await;
        }

        let finished_at = Utc::now();
        let elapsed_seconds = clock.elapsed().as_secs_f64();
        emit_analysis_finished(&domain, elapsed_seconds, errors.len());

        Ok(AnalysisReport {
            input: request,
            resolved_domain: domain,
            probes,
            email_patterns,
            pattern_checks,
            training_template,
            mailbox_probe,
            mail_send,
            meta: ReportMeta {
                started_at,
                finished_at,
                elapsed_seconds,
                errors,
            },
        })
    }

    fn primary_tasks(
        &self,
        domain: &str,
        email: Option<&str>,
        timeout: Duration,
    ) -> Vec<(ProbeKind, ProbeTask<ProbePayload>)> {
        let mut tasks = Vec::with_capacity(3);

        let mx = Arc::clone(&self.probes.mx);
        let target = domain.to_string();
        tasks.push((
            ProbeKind::Mx,
            async move { mx.lookup_mx(&target, timeout).await.map(ProbePayload::Mx) }.boxed(),
        ));

        if let Some(key) = self.config.techstack_key() {
            let techstack = Arc::clone(&self.probes.techstack);
            let target = domain.to_string();
            let key = key.to_string();
            tasks.push((
                ProbeKind::TechStack,
                async move {
                    techstack
                        .lookup(&target, &key, timeout)
                        .await
                        .map(ProbePayload::TechStack)
                }
                .boxed(),
            ));
        }

        if let Some(email) = email {
            let accounts = Arc::clone(&self.probes.accounts);
            let target = email.to_string();
            tasks.push((
                ProbeKind::Accounts,
                async move {
                    accounts
                        .enumerate(&target, timeout)
                        .await
                        .map(ProbePayload::Accounts)
                }
                .boxed(),
            ));
        }

        tasks
    }

    async fn check_patterns(
        &self,
        generated: &[EmailPattern],
        wave: &WaveConfig,
        errors: &mut Vec<ComponentError>,
    ) -> PatternCheckBatch {
        let checked_emails: Vec<String> = generated
            .iter()
            .filter(|p| p.is_address())
            .take(self.config.pattern_check_cap)
            .map(|p| p.email.clone())
            .collect();

        let tasks = checked_emails
            .iter()
            .map(|address| {
                let accounts = Arc::clone(&self.probes.accounts);
                let target = address.clone();
                let timeout = wave.task_timeout;
                let task: ProbeTask<_> =
                    async move { accounts.enumerate(&target, timeout).await }.boxed();
                (address.clone(), task)
            })
            .collect();

        let mut results = Vec::with_capacity(checked_emails.len());
        for (email, outcome) in run_wave(PATTERN_CHECK_COMPONENT, tasks, wave).await {
            let component = format!("{PATTERN_CHECK_COMPONENT}:{email}");
            record_failure(errors, &component, &outcome);
            results.push(PatternCheck { email, outcome });
        }

        info!(
            checked = checked_emails.len(),
            generated = generated.len(),
            "pattern checks finished"
        );
        PatternCheckBatch {
            checked_emails,
            results,
        }
    }

    fn training_template(
        &self,
        request: &AnalysisRequest,
        domain: &str,
        probes: &BTreeMap<ProbeKind, ProbeOutcome<ProbePayload>>,
    ) -> TrainingTemplate {
        let mx: Option<&MxReport> = match probes.get(&ProbeKind::Mx).and_then(|o| o.success()) {
            Some(ProbePayload::Mx(report)) => Some(report),
            _ => None,
        };
        let stack: Option<&TechnologyStack> =
            match probes.get(&ProbeKind::TechStack).and_then(|o| o.success()) {
                Some(ProbePayload::TechStack(stack)) => Some(stack),
                _ => None,
            };
        let technology_summary = stack.and_then(TechnologyStack::summary);

        template::generate(&TemplateContext {
            first_name: request.first_name.as_deref(),
            last_name: request.last_name.as_deref(),
            domain: Some(domain),
            provider: mx.and_then(MxReport::known_provider),
            technology_summary: technology_summary.as_deref(),
            training_url: self.config.training_url.as_deref(),
        })
    }

    async fn probe_mailbox(
        &self,
        target: &str,
        timeout: Duration,
        errors: &mut Vec<ComponentError>,
    ) -> Option<ProbeOutcome<MailboxProbeResult>> {
        let mail_from = self.config.mailbox_probe.active_sender()?.to_string();
        let mailbox = Arc::clone(&self.probes.mailbox);
        let email = target.to_string();
        let task = async move { mailbox.probe(&email, &mail_from, timeout).await }.boxed();

        let outcome = run_single(MAILBOX_PROBE_COMPONENT, task, timeout).await;
        record_failure(errors, MAILBOX_PROBE_COMPONENT, &outcome);
        Some(outcome)
    }

    async fn send_training(
        &self,
        target: &str,
        training: &TrainingTemplate,
        timeout: Duration,
        errors: &mut Vec<ComponentError>,
    ) -> Option<ProbeOutcome<SendReceipt>> {
        let transport = self.config.transport.clone()?;
        let message = OutboundMessage {
            to: target.to_string(),
            subject: training.subject.clone(),
            body_text: training.body_text.clone(),
            body_html: Some(training.body_html.clone()),
        };
        let sender = Arc::clone(&self.probes.sender);
        let task = async move { sender.send(&transport, &message, timeout).await }.boxed();

        let outcome = run_single(MAIL_SEND_COMPONENT, task, timeout).await;
        record_failure(errors, MAIL_SEND_COMPONENT, &outcome);
        Some(outcome)
    }
}

fn record_failure<T>(
    errors: &mut Vec<ComponentError>,
    component: &str,
    outcome: &ProbeOutcome<T>,
) {
    if let Some(message) = outcome.failure_message() {
        errors.push(ComponentError {
            component: component.to_string(),
            message: message.to_string(),
        });
    }
}
