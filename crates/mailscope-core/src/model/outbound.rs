//! Outbound mail transport settings and message shapes.

use serde::{Deserialize, Serialize};

/// SMTP submission settings. Present only when outbound mail is configured.
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpTransportConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Upgrade with STARTTLS after greeting.
    pub use_tls: bool,
    /// Connect with implicit TLS; takes precedence over `use_tls`.
    pub use_ssl: bool,
    pub from: String,
    pub from_display_name: Option<String>,
}

impl SmtpTransportConfig {
    pub fn new(host: impl Into<String>, port: u16, from: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            use_tls: true,
            use_ssl: false,
            from: from.into(),
            from_display_name: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_security(mut self, use_tls: bool, use_ssl: bool) -> Self {
        self.use_tls = use_tls;
        self.use_ssl = use_ssl;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.from_display_name = Some(name.into());
        self
    }

    /// Username and password, only when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for SmtpTransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpTransportConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("use_tls", &self.use_tls)
            .field("use_ssl", &self.use_ssl)
            .field("from", &self.from)
            .field("from_display_name", &self.from_display_name)
            .finish()
    }
}

/// Fully composed message fields for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: Option<String>,
}

/// Server acknowledgement of an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub recipient: String,
    pub code: u16,
    pub reply: String,
}
