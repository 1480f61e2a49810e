//! Mailscope Probes
//!
//! Network-facing implementations of the probe traits defined in
//! `mailscope-core`:
//! - [`dns::HickoryMxLookup`] - MX records via `hickory-resolver`
//! - [`builtwith::BuiltWithClient`] - technology stack via the BuiltWith API
//! - [`holehe::HoleheRunner`] - account enumeration via the `holehe` CLI
//! - [`smtp::SmtpMailboxProber`] - RCPT-based mailbox existence checks
//! - [`smtp::SmtpMailSender`] - training message delivery

use std::path::PathBuf;
use std::sync::Arc;

use mailscope_core::ProbeSet;

pub mod builtwith;
pub mod dns;
pub mod error;
pub mod holehe;
pub mod smtp;

pub use builtwith::BuiltWithClient;
pub use dns::HickoryMxLookup;
pub use error::{Result, SetupError};
pub use holehe::HoleheRunner;
pub use smtp::{SmtpMailSender, SmtpMailboxProber};

/// Knobs for [`default_probe_set`].
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub holehe_binary: PathBuf,
    /// Arguments placed before the email.
    pub holehe_args: Vec<String>,
    pub smtp_probe_port: u16,
    pub techstack_base_url: String,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        let runner = HoleheRunner::default();
        Self {
            holehe_binary: runner.binary().to_path_buf(),
            holehe_args: runner.args().to_vec(),
            smtp_probe_port: smtp::DEFAULT_PROBE_PORT,
            techstack_base_url: builtwith::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Wire the production probes together. The mailbox prober shares the MX
/// lookup used by the primary wave.
pub fn default_probe_set(options: &ProbeOptions) -> Result<ProbeSet> {
    let mx = Arc::new(HickoryMxLookup::from_system());
    let techstack = BuiltWithClient::with_base_url(options.techstack_base_url.clone())?;
    let accounts =
        HoleheRunner::new(&options.holehe_binary).with_args(options.holehe_args.iter().cloned());
    let mailbox = SmtpMailboxProber::new(mx.clone()).with_port(options.smtp_probe_port);
    let sender = SmtpMailSender::new()?;

    Ok(ProbeSet::new(
        mx,
        Arc::new(techstack),
        Arc::new(accounts),
        Arc::new(mailbox),
        Arc::new(sender),
    ))
}
