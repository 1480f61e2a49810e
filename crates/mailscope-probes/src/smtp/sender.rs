//! Outbound delivery of the training message through a submission server.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use tokio_rustls::TlsConnector;
use tracing::{info, instrument};
use uuid::Uuid;

use mailscope_core::{
    MailSender, OutboundMessage, ProbeError, ProbeResult, SendReceipt, SmtpTransportConfig,
};

use super::session::{tls_connector, Reply, SmtpSession};
use crate::error::Result;

pub const DEFAULT_DISPLAY_NAME: &str = "Security Awareness";
const DEFAULT_HELO_NAME: &str = "localhost";
const BODY_LINE_WIDTH: usize = 76;

/// [`MailSender`] using implicit TLS or STARTTLS as configured.
#[derive(Clone)]
pub struct SmtpMailSender {
    tls: TlsConnector,
    helo_name: String,
}

impl std::fmt::Debug for SmtpMailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpMailSender")
            .field("helo_name", &self.helo_name)
            .finish_non_exhaustive()
    }
}

impl SmtpMailSender {
    pub fn new() -> Result<Self> {
        Ok(Self {
            tls: tls_connector()?,
            helo_name: DEFAULT_HELO_NAME.to_string(),
        })
    }

    pub fn with_helo_name(mut self, name: impl Into<String>) -> Self {
        self.helo_name = name.into();
        self
    }

    async fn open(&self, transport: &SmtpTransportConfig) -> ProbeResult<SmtpSession> {
        let host = transport.host.as_str();
        let (mut session, _) = if transport.use_ssl {
            SmtpSession::connect_tls(host, transport.port, &self.tls).await?
        } else {
            SmtpSession::connect(host, transport.port).await?
        };
        session.hello(&self.helo_name).await?;

        if transport.use_tls && !transport.use_ssl {
            session = session.starttls(host, &self.tls).await?;
            session.hello(&self.helo_name).await?;
        }
        Ok(session)
    }

    async fn transact(
        &self,
        session: &mut SmtpSession,
        transport: &SmtpTransportConfig,
        message: &OutboundMessage,
    ) -> ProbeResult<Reply> {
        if let Some((username, password)) = transport.credentials() {
            authenticate(session, username, password).await?;
        }

        expect_positive(
            "MAIL FROM",
            session.command(&format!("MAIL FROM:<{}>", transport.from)).await?,
        )?;
        expect_positive(
            "RCPT TO",
            session.command(&format!("RCPT TO:<{}>", message.to)).await?,
        )?;

        let body = compose(transport, message, Utc::now(), &message_id(&transport.from));
        expect_positive("DATA", session.data(&body).await?)
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    #[instrument(skip_all, fields(probe = "mail_send", host = %transport.host, to = %message.to))]
    async fn send(
        &self,
        transport: &SmtpTransportConfig,
        message: &OutboundMessage,
        timeout: Duration,
    ) -> ProbeResult<SendReceipt> {
        let delivery = async {
            let mut session = self.open(transport).await?;
            let result = self.transact(&mut session, transport, message).await;
            session.quit().await;
            result
        };

        let reply = tokio::time::timeout(timeout, delivery)
            .await
            .map_err(|_| ProbeError::Timeout {
                probe: "mail_send".to_string(),
                seconds: timeout.as_secs_f64(),
            })??;

        info!(code = reply.code, "message accepted");
        Ok(SendReceipt {
            recipient: message.to.clone(),
            code: reply.code,
            reply: reply.text(),
        })
    }
}

fn expect_positive(stage: &str, reply: Reply) -> ProbeResult<Reply> {
    if reply.is_positive() {
        Ok(reply)
    } else {
        Err(ProbeError::Smtp(format!("{stage} rejected: {reply}")))
    }
}

async fn authenticate(
    session: &mut SmtpSession,
    username: &str,
    password: &str,
) -> ProbeResult<()> {
    let mechanisms = session.auth_mechanisms();
    let offers = |m: &str| mechanisms.iter().any(|offered| offered == m);

    if offers("LOGIN") && !offers("PLAIN") {
        let reply = session.command("AUTH LOGIN").await?;
        if !reply.is_intermediate() {
            return Err(ProbeError::Smtp(format!("AUTH LOGIN refused: {reply}")));
        }
        let reply = session.command(&STANDARD.encode(username)).await?;
        if !reply.is_intermediate() {
            return Err(ProbeError::Smtp(format!("AUTH LOGIN username refused: {reply}")));
        }
        let reply = session.command(&STANDARD.encode(password)).await?;
        return auth_result(reply);
    }

    let token = STANDARD.encode(format!("\0{username}\0{password}"));
    let reply = session.command(&format!("AUTH PLAIN {token}")).await?;
    auth_result(reply)
}

fn auth_result(reply: Reply) -> ProbeResult<()> {
    if reply.code == 235 {
        Ok(())
    } else {
        Err(ProbeError::Smtp(format!("authentication failed: {reply}")))
    }
}

fn message_id(from: &str) -> String {
    let domain = from
        .rsplit_once('@')
        .map(|(_, d)| d.trim_end_matches('>'))
        .filter(|d| !d.is_empty())
        .unwrap_or("localhost");
    format!("<{}@{domain}>", Uuid::new_v4().simple())
}

/// RFC 2047 encoded-word when `value` is not plain ASCII.
pub fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(value))
    }
}

fn format_address(display_name: &str, address: &str) -> String {
    let name = if !display_name.is_ascii() {
        encode_header(display_name)
    } else if display_name
        .chars()
        .any(|c| matches!(c, '"' | ',' | '<' | '>' | '@' | '(' | ')' | ';' | ':' | '\\'))
    {
        format!("\"{}\"", display_name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        display_name.to_string()
    };
    format!("{name} <{address}>")
}

/// Render a single-part message: HTML when present, else plain text,
/// base64-encoded as UTF-8.
pub fn compose(
    transport: &SmtpTransportConfig,
    message: &OutboundMessage,
    date: DateTime<Utc>,
    message_id: &str,
) -> String {
    let display_name = transport
        .from_display_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(DEFAULT_DISPLAY_NAME);
    let (subtype, body) = match message.body_html.as_deref() {
        Some(html) => ("html", html),
        None => ("plain", message.body_text.as_str()),
    };

    let encoded = STANDARD.encode(body.as_bytes());
    let wrapped: Vec<&str> = encoded
        .as_bytes()
        .chunks(BODY_LINE_WIDTH)
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
        .collect();

    let headers = [
        format!("From: {}", format_address(display_name, &transport.from)),
        format!("To: {}", message.to),
        format!("Subject: {}", encode_header(&message.subject)),
        format!("Date: {}", date.to_rfc2822()),
        format!("Message-ID: {message_id}"),
        "MIME-Version: 1.0".to_string(),
        format!("Content-Type: text/{subtype}; charset=\"utf-8\""),
        "Content-Transfer-Encoding: base64".to_string(),
    ];

    format!("{}\r\n\r\n{}\r\n", headers.join("\r\n"), wrapped.join("\r\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn transport() -> SmtpTransportConfig {
        SmtpTransportConfig::new("smtp.example.com", 587, "security@example.com")
    }

    fn message() -> OutboundMessage {
        OutboundMessage {
            to: "ada@example.com".to_string(),
            subject: "Action required".to_string(),
            body_text: "plain body".to_string(),
            body_html: Some("<p>html body</p>".to_string()),
        }
    }

    #[test]
    fn test_compose_headers() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let raw = compose(&transport(), &message(), date, "<id@example.com>");
        let (head, body) = raw.split_once("\r\n\r\n").unwrap();

        assert!(head.contains("From: Security Awareness <security@example.com>"));
        assert!(head.contains("To: ada@example.com"));
        assert!(head.contains("Subject: Action required"));
        assert!(head.contains("Date: Wed,"));
        assert!(head.contains("May 2024 12:00:00 +0000"));
        assert!(head.contains("Message-ID: <id@example.com>"));
        assert!(head.contains("Content-Type: text/html; charset=\"utf-8\""));

        let decoded = STANDARD.decode(body.replace("\r\n", "")).unwrap();
        assert_eq!(decoded, b"<p>html body</p>");
    }

    #[test]
    fn test_plain_text_when_no_html() {
        let mut msg = message();
        msg.body_html = None;
        let raw = compose(&transport(), &msg, Utc::now(), "<x@y>");
        assert!(raw.contains("Content-Type: text/plain"));
    }

    #[test]
    fn test_body_lines_wrapped() {
        let mut msg = message();
        msg.body_html = Some("x".repeat(500));
        let raw = compose(&transport(), &msg, Utc::now(), "<x@y>");
        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        assert!(body.lines().all(|l| l.len() <= BODY_LINE_WIDTH));
    }

    #[test]
    fn test_non_ascii_subject_encoded() {
        assert_eq!(encode_header("Hello"), "Hello");
        let encoded = encode_header("Überprüfung");
        assert!(encoded.starts_with("=?UTF-8?B?"));
        assert!(encoded.ends_with("?="));
    }

    #[test]
    fn test_display_name_quoting() {
        assert_eq!(
            format_address("Security, Team", "s@example.com"),
            "\"Security, Team\" <s@example.com>"
        );
        assert_eq!(
            format_address("Sécurité", "s@example.com"),
            format!("{} <s@example.com>", encode_header("Sécurité"))
        );
    }

    #[test]
    fn test_message_id_uses_sender_domain() {
        let id = message_id("security@example.com");
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@example.com>"));
    }
}
