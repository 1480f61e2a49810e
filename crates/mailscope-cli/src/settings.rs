//! Environment-backed settings for the `analyze` command.
//!
//! Every flag can also be supplied through the variable named in its `env`
//! attribute, including variables loaded from a `.env` file.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use tracing::warn;

use mailscope_core::config::{DEFAULT_MAX_WORKERS, DEFAULT_PATTERN_CHECK_CAP};
use mailscope_core::{MailboxProbeConfig, ReconConfig, SmtpTransportConfig};
use mailscope_probes::ProbeOptions;

#[derive(Debug, Clone, Args)]
pub struct ProbeSettings {
    /// BuiltWith API key; the tech-stack probe is skipped without one
    #[arg(long, env = "BUILTWITH_API_KEY", hide_env_values = true)]
    pub builtwith_api_key: Option<String>,

    /// Maximum number of probes running at once
    #[arg(long, env = "MAX_WORKERS", default_value_t = DEFAULT_MAX_WORKERS)]
    pub max_workers: usize,

    /// Maximum number of generated addresses checked for accounts
    #[arg(long, env = "PATTERN_CHECK_CAP", default_value_t = DEFAULT_PATTERN_CHECK_CAP)]
    pub pattern_check_cap: usize,

    /// Path or name of the holehe executable
    #[arg(long, env = "HOLEHE_BIN", default_value = "holehe")]
    pub holehe_bin: PathBuf,

    /// Extra holehe arguments, space separated (defaults to `--no-color`)
    #[arg(
        long,
        env = "HOLEHE_ARGS",
        value_delimiter = ' ',
        allow_hyphen_values = true
    )]
    pub holehe_args: Option<Vec<String>>,

    /// Run the SMTP mailbox-existence probe
    #[arg(
        long,
        env = "PROBE_SMTP_ENABLE",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub probe_smtp_enable: bool,

    /// Envelope sender for the mailbox probe
    #[arg(long, env = "PROBE_SMTP_MAIL_FROM")]
    pub probe_smtp_mail_from: Option<String>,

    /// Port the mailbox probe connects to on each exchanger
    #[arg(long, env = "PROBE_SMTP_PORT", default_value_t = mailscope_probes::smtp::DEFAULT_PROBE_PORT)]
    pub probe_smtp_port: u16,

    /// Submission server for the training message
    #[arg(long, env = "SMTP_HOST")]
    pub smtp_host: Option<String>,

    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    #[arg(long, env = "SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    /// Upgrade the submission connection with STARTTLS
    #[arg(
        long,
        env = "SMTP_USE_TLS",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub smtp_use_tls: bool,

    /// Connect to the submission server with implicit TLS
    #[arg(
        long,
        env = "SMTP_USE_SSL",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub smtp_use_ssl: bool,

    /// Sender address for the training message (defaults to the username)
    #[arg(long, env = "SMTP_FROM")]
    pub smtp_from: Option<String>,

    #[arg(long, env = "SMTP_FROM_NAME")]
    pub smtp_from_name: Option<String>,

    /// Link substituted into the training template
    #[arg(long, env = "TRAINING_URL")]
    pub training_url: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ProbeSettings {
    /// Outbound transport, when a host and a sender address are both known.
    pub fn transport(&self) -> Option<SmtpTransportConfig> {
        let host = present(&self.smtp_host)?;
        let Some(from) = present(&self.smtp_from).or(present(&self.smtp_username)) else {
            warn!(host = %host, "SMTP_HOST set without SMTP_FROM or SMTP_USERNAME; sending disabled");
            return None;
        };

        let mut transport = SmtpTransportConfig::new(host, self.smtp_port, from)
            .with_security(self.smtp_use_tls, self.smtp_use_ssl);
        if let (Some(user), Some(pass)) = (present(&self.smtp_username), self.smtp_password.as_deref()) {
            transport = transport.with_credentials(user, pass);
        }
        if let Some(name) = present(&self.smtp_from_name) {
            transport = transport.with_display_name(name);
        }
        Some(transport)
    }

    pub fn recon_config(&self) -> ReconConfig {
        let mut config = ReconConfig::default()
            .with_max_workers(self.max_workers)
            .with_pattern_check_cap(self.pattern_check_cap)
            .with_mailbox_probe(MailboxProbeConfig {
                enabled: self.probe_smtp_enable,
                mail_from: present(&self.probe_smtp_mail_from).map(str::to_string),
            });
        if let Some(key) = present(&self.builtwith_api_key) {
            config = config.with_techstack_api_key(key);
        }
        if let Some(transport) = self.transport() {
            config = config.with_transport(transport);
        }
        if let Some(url) = present(&self.training_url) {
            config = config.with_training_url(url);
        }
        config
    }

    pub fn probe_options(&self) -> ProbeOptions {
        let mut options = ProbeOptions {
            holehe_binary: self.holehe_bin.clone(),
            smtp_probe_port: self.probe_smtp_port,
            ..ProbeOptions::default()
        };
        if let Some(args) = &self.holehe_args {
            options.holehe_args = args.iter().filter(|a| !a.is_empty()).cloned().collect();
        }
        options
    }
}
