//! Loopback fakes for the network probes.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Scripted SMTP server. Every connection gets the same behavior.
#[derive(Debug, Clone)]
pub struct FakeSmtp {
    pub ehlo: bool,
    pub auth: Option<&'static str>,
    pub mail_from_code: u16,
    pub accepted: Vec<String>,
    pub catch_all: bool,
}

impl Default for FakeSmtp {
    fn default() -> Self {
        Self {
            ehlo: true,
            auth: None,
            mail_from_code: 250,
            accepted: Vec::new(),
            catch_all: false,
        }
    }
}

#[derive(Debug, Default)]
struct Recorded {
    transcript: Vec<String>,
    messages: Vec<String>,
}

pub struct SmtpServer {
    pub port: u16,
    recorded: Arc<Mutex<Recorded>>,
    handle: JoinHandle<()>,
}

impl SmtpServer {
    /// Command lines received so far, across all connections.
    pub fn transcript(&self) -> Vec<String> {
        self.recorded.lock().unwrap().transcript.clone()
    }

    /// Message bodies received through DATA, without the terminator.
    pub fn messages(&self) -> Vec<String> {
        self.recorded.lock().unwrap().messages.clone()
    }
}

impl Drop for SmtpServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl FakeSmtp {
    pub fn accepting(addresses: &[&str]) -> Self {
        Self {
            accepted: addresses.iter().map(|a| a.to_ascii_lowercase()).collect(),
            ..Self::default()
        }
    }

    pub async fn spawn(self) -> SmtpServer {
        self.spawn_at("127.0.0.1:0").await
    }

    pub async fn spawn_at(self, addr: &str) -> SmtpServer {
        let listener = TcpListener::bind(addr).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let recorded = Arc::new(Mutex::new(Recorded::default()));

        let script = Arc::new(self);
        let shared = recorded.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(serve(stream, script.clone(), shared.clone()));
            }
        });

        SmtpServer {
            port,
            recorded,
            handle,
        }
    }

    fn rcpt_reply(&self, line: &str) -> &'static str {
        let address = line
            .split_once('<')
            .and_then(|(_, rest)| rest.split_once('>'))
            .map(|(addr, _)| addr.to_ascii_lowercase())
            .unwrap_or_default();
        if self.catch_all || self.accepted.contains(&address) {
            "250 2.1.5 OK\r\n"
        } else {
            "550 5.1.1 no such user\r\n"
        }
    }
}

async fn serve(stream: TcpStream, script: Arc<FakeSmtp>, recorded: Arc<Mutex<Recorded>>) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    if write.write_all(b"220 fake.test ESMTP\r\n").await.is_err() {
        return;
    }

    let mut login_prompts = 0;
    while let Ok(Some(line)) = lines.next_line().await {
        recorded.lock().unwrap().transcript.push(line.clone());
        let upper = line.to_ascii_uppercase();

        let reply: String = if login_prompts > 0 {
            login_prompts -= 1;
            if login_prompts == 1 {
                "334 UGFzc3dvcmQ6\r\n".into()
            } else {
                "235 2.7.0 authenticated\r\n".into()
            }
        } else if upper.starts_with("EHLO") {
            if script.ehlo {
                let mut reply = String::from("250-fake.test\r\n");
                if let Some(mechanisms) = script.auth {
                    reply.push_str(&format!("250-AUTH {mechanisms}\r\n"));
                }
                reply.push_str("250 8BITMIME\r\n");
                reply
            } else {
                "502 5.5.2 command not recognized\r\n".into()
            }
        } else if upper.starts_with("HELO") {
            "250 fake.test\r\n".into()
        } else if upper.starts_with("AUTH PLAIN") {
            "235 2.7.0 authenticated\r\n".into()
        } else if upper == "AUTH LOGIN" {
            login_prompts = 2;
            "334 VXNlcm5hbWU6\r\n".into()
        } else if upper.starts_with("MAIL FROM") {
            format!("{} sender status\r\n", script.mail_from_code)
        } else if upper.starts_with("RCPT TO") {
            script.rcpt_reply(&line).into()
        } else if upper == "DATA" {
            if write.write_all(b"354 end with .\r\n").await.is_err() {
                return;
            }
            let mut body = Vec::new();
            while let Ok(Some(data_line)) = lines.next_line().await {
                if data_line == "." {
                    break;
                }
                body.push(data_line);
            }
            recorded.lock().unwrap().messages.push(body.join("\r\n"));
            "250 2.0.0 queued as FAKE\r\n".into()
        } else if upper == "QUIT" {
            let _ = write.write_all(b"221 2.0.0 bye\r\n").await;
            return;
        } else {
            "500 5.5.1 unrecognized\r\n".into()
        };

        if write.write_all(reply.as_bytes()).await.is_err() {
            return;
        }
    }
}

/// Answer exactly one HTTP request with `status` and a JSON `body`.
/// The handle yields the request head the client sent.
pub async fn http_once(status: u16, body: &str) -> (u16, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let body = body.to_string();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let response = format!(
            "HTTP/1.1 {status} Fake\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        let _ = stream.shutdown().await;
        String::from_utf8_lossy(&request).into_owned()
    });

    (port, handle)
}

/// A listener that accepts and then never answers.
pub async fn silent_listener() -> (u16, JoinHandle<()>) {
    silent_listener_at("127.0.0.1:0").await
}

pub async fn silent_listener_at(addr: &str) -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind(addr).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });
    (port, handle)
}
