//! Mailscope Core Library
//!
//! Domain and email reconnaissance orchestration: bounded concurrent probe
//! waves, failure isolation, report assembly, email pattern generation and
//! the security-awareness training template. Probe implementations plug in
//! through the traits in [`probe`].

pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod patterns;
pub mod probe;
pub mod telemetry;
pub mod template;
pub mod wave;

pub use config::{MailboxProbeConfig, ReconConfig};
pub use error::{ProbeError, ProbeResult, ReconError, Result};
pub use model::{
    AccountEnumeration, AnalysisReport, AnalysisRequest, MailboxProbeResult, MailboxVerdict,
    MxRecord, MxReport, MxWarning, OutboundMessage, ProbeKind, ProbeOutcome, ProbePayload,
    SendReceipt, SmtpTransportConfig, TechnologyStack,
};
pub use orchestrator::Orchestrator;
pub use patterns::EmailPattern;
pub use probe::{AccountEnumerator, MailSender, MailboxProber, MxLookup, ProbeSet, TechStackLookup};
pub use telemetry::init_tracing;
pub use template::TrainingTemplate;
pub use wave::{run_wave, ProbeTask, WaveConfig};
