//! SMTP client pieces: the session, the mailbox probe and the sender.

pub mod probe;
pub mod sender;
pub mod session;

pub use probe::{SmtpMailboxProber, DEFAULT_PROBE_PORT};
pub use sender::SmtpMailSender;
pub use session::{tls_connector, Reply, SmtpSession};
