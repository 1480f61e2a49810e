//! Minimal SMTP client session.
//!
//! Enough of RFC 5321 for recipient checks and single-message submission:
//! greeting, EHLO/HELO, STARTTLS, arbitrary commands and DATA. Multi-line
//! replies are folded into one [`Reply`].

use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tracing::trace;

use mailscope_core::{ProbeError, ProbeResult};

use crate::error::{Result, SetupError};

const MAX_REPLY_LINES: usize = 128;

/// Transport a session can run over: plain TCP, TLS, or an in-memory pipe.
pub trait SmtpIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SmtpIo for T {}

/// A complete server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    pub fn text(&self) -> String {
        self.lines.join(" ")
    }

    pub fn is_positive(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_intermediate(&self) -> bool {
        (300..400).contains(&self.code)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text())
    }
}

/// TLS connector trusting the webpki root set.
pub fn tls_connector() -> Result<TlsConnector> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(tokio_rustls::rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| SetupError::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth();
    Ok(TlsConnector::from(Arc::new(config)))
}

fn smtp_err(context: &str, err: impl fmt::Display) -> ProbeError {
    ProbeError::Smtp(format!("{context}: {err}"))
}

fn server_name(host: &str) -> ProbeResult<ServerName<'static>> {
    ServerName::try_from(host.to_string()).map_err(|e| smtp_err("invalid TLS server name", e))
}

pub struct SmtpSession {
    io: BufReader<Box<dyn SmtpIo>>,
    extensions: Vec<String>,
}

impl fmt::Debug for SmtpSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSession")
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl SmtpSession {
    /// Open a plain TCP session and read the greeting.
    pub async fn connect(host: &str, port: u16) -> ProbeResult<(Self, Reply)> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| smtp_err(&format!("connect to {host}:{port}"), e))?;
        Self::from_stream(stream).await
    }

    /// Open a session with implicit TLS.
    pub async fn connect_tls(
        host: &str,
        port: u16,
        tls: &TlsConnector,
    ) -> ProbeResult<(Self, Reply)> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| smtp_err(&format!("connect to {host}:{port}"), e))?;
        let stream = tls
            .connect(server_name(host)?, stream)
            .await
            .map_err(|e| smtp_err("TLS handshake", e))?;
        Self::from_stream(stream).await
    }

    /// Start a session over an already connected stream.
    pub async fn from_stream<S: SmtpIo + 'static>(stream: S) -> ProbeResult<(Self, Reply)> {
        let mut session = Self {
            io: BufReader::new(Box::new(stream)),
            extensions: Vec::new(),
        };
        let greeting = session.read_reply().await?;
        if greeting.code != 220 {
            return Err(ProbeError::Smtp(format!("unexpected greeting: {greeting}")));
        }
        Ok((session, greeting))
    }

    /// EHLO, falling back to HELO when the server refuses it.
    pub async fn hello(&mut self, name: &str) -> ProbeResult<Reply> {
        let reply = self.command(&format!("EHLO {name}")).await?;
        if reply.is_positive() {
            self.extensions = reply
                .lines
                .iter()
                .skip(1)
                .map(|l| l.trim().to_ascii_uppercase())
                .collect();
            return Ok(reply);
        }

        let reply = self.command(&format!("HELO {name}")).await?;
        if !reply.is_positive() {
            return Err(ProbeError::Smtp(format!("HELO rejected: {reply}")));
        }
        self.extensions.clear();
        Ok(reply)
    }

    /// Whether the last EHLO advertised `keyword`.
    pub fn supports(&self, keyword: &str) -> bool {
        let keyword = keyword.to_ascii_uppercase();
        self.extensions
            .iter()
            .any(|ext| ext.split_whitespace().next() == Some(keyword.as_str()))
    }

    /// SASL mechanisms from the `AUTH` extension line.
    pub fn auth_mechanisms(&self) -> Vec<String> {
        self.extensions
            .iter()
            .find_map(|ext| {
                ext.strip_prefix("AUTH ")
                    .or_else(|| ext.strip_prefix("AUTH="))
                    .map(|rest| rest.split_whitespace().map(str::to_string).collect())
            })
            .unwrap_or_default()
    }

    /// Send one command line and read its reply.
    pub async fn command(&mut self, line: &str) -> ProbeResult<Reply> {
        self.write_raw(line.as_bytes()).await?;
        self.write_raw(b"\r\n").await?;
        self.flush().await?;
        let reply = self.read_reply().await?;
        trace!(code = reply.code, "smtp reply");
        Ok(reply)
    }

    /// Upgrade the connection with STARTTLS. Extensions must be re-read with
    /// [`SmtpSession::hello`] afterwards.
    pub async fn starttls(mut self, host: &str, tls: &TlsConnector) -> ProbeResult<Self> {
        let reply = self.command("STARTTLS").await?;
        if reply.code != 220 {
            return Err(ProbeError::Smtp(format!("STARTTLS refused: {reply}")));
        }
        let inner = self.io.into_inner();
        let stream = tls
            .connect(server_name(host)?, inner)
            .await
            .map_err(|e| smtp_err("TLS handshake", e))?;
        Ok(Self {
            io: BufReader::new(Box::new(stream)),
            extensions: Vec::new(),
        })
    }

    /// Transmit a message body with DATA and return the final reply.
    pub async fn data(&mut self, message: &str) -> ProbeResult<Reply> {
        let reply = self.command("DATA").await?;
        if reply.code != 354 {
            return Err(ProbeError::Smtp(format!("DATA refused: {reply}")));
        }
        let payload = dot_stuff(message);
        self.write_raw(payload.as_bytes()).await?;
        self.flush().await?;
        self.read_reply().await
    }

    /// Best-effort QUIT; the connection is closed either way.
    pub async fn quit(mut self) {
        let _ = self.command("QUIT").await;
        let _ = self.io.get_mut().shutdown().await;
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> ProbeResult<()> {
        self.io
            .get_mut()
            .write_all(bytes)
            .await
            .map_err(|e| smtp_err("write", e))
    }

    async fn flush(&mut self) -> ProbeResult<()> {
        self.io
            .get_mut()
            .flush()
            .await
            .map_err(|e| smtp_err("flush", e))
    }

    async fn read_reply(&mut self) -> ProbeResult<Reply> {
        let mut lines = Vec::new();
        loop {
            let mut buf = String::new();
            let read = self
                .io
                .read_line(&mut buf)
                .await
                .map_err(|e| smtp_err("read", e))?;
            if read == 0 {
                return Err(ProbeError::Smtp("connection closed by server".to_string()));
            }

            let line = buf.trim_end_matches(['\r', '\n']);
            let code = line
                .get(..3)
                .and_then(|c| c.parse::<u16>().ok())
                .ok_or_else(|| ProbeError::Smtp(format!("malformed reply line: {line:?}")))?;
            let more = line.as_bytes().get(3) == Some(&b'-');
            lines.push(line.get(4..).unwrap_or_default().to_string());

            if !more {
                return Ok(Reply { code, lines });
            }
            if lines.len() >= MAX_REPLY_LINES {
                return Err(ProbeError::Smtp("reply too long".to_string()));
            }
        }
    }
}

/// Normalize line endings to CRLF, escape leading dots and append the
/// end-of-data marker.
pub fn dot_stuff(message: &str) -> String {
    let mut out = String::with_capacity(message.len() + 16);
    for line in message.lines() {
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
        out.push_str("\r\n");
    }
    out.push_str(".\r\n");
    out
}
