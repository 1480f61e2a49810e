//! Request, payload and report types.

pub mod accounts;
pub mod mailbox;
pub mod mx;
pub mod outbound;
pub mod outcome;
pub mod report;
pub mod request;
pub mod techstack;

pub use accounts::{AccountEnumeration, AccountHit, AccountSignal, AccountTotals};
pub use mailbox::{MailboxProbeResult, MailboxVerdict};
pub use mx::{classify_provider, MxRecord, MxReport, MxWarning};
pub use outbound::{OutboundMessage, SendReceipt, SmtpTransportConfig};
pub use outcome::ProbeOutcome;
pub use report::{
    AnalysisReport, ComponentError, PatternCheck, PatternCheckBatch, ProbeKind, ProbePayload,
    ReportMeta,
};
pub use request::{extract_domain, AnalysisRequest};
pub use techstack::{DetectedTechnology, TechnologyGroup, TechnologyStack};
