//! Minimal async IMAP client: LOGIN, SELECT, SEARCH UNSEEN, FETCH, STORE, LOGOUT.
//!
//! A fresh connection is opened per poll, over rustls (IMAPS) or plain TCP.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf,
    WriteHalf,
};
use tokio::net::TcpStream;
use tracing::debug;

trait ImapStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> ImapStream for T {}

pub struct ImapClient {
    reader: BufReader<ReadHalf<Box<dyn ImapStream>>>,
    writer: WriteHalf<Box<dyn ImapStream>>,
    tag_counter: u32,
}

impl ImapClient {
    pub async fn connect(host: &str, port: u16, use_ssl: bool) -> Result<Self> {
        let tcp = TcpStream::connect((host, port))
            .await
            .with_context(|| format!("cannot connect to IMAP server {host}:{port}"))?;

        let stream: Box<dyn ImapStream> = if use_ssl {
            let mut roots = rustls::RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

            let config = rustls::ClientConfig::builder_with_provider(Arc::new(
                rustls::crypto::ring::default_provider(),
            ))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(roots)
            .with_no_client_auth();

            let server_name = rustls::pki_types::ServerName::try_from(host.to_string())
                .with_context(|| format!("invalid IMAP server name '{host}'"))?;
            let tls = tokio_rustls::TlsConnector::from(Arc::new(config))
                .connect(server_name, tcp)
                .await?;
            Box::new(tls)
        } else {
            Box::new(tcp)
        };

        let (read, write) = tokio::io::split(stream);
        let mut client = Self {
            reader: BufReader::new(read),
            writer: write,
            tag_counter: 0,
        };

        let greeting = client.read_line().await?;
        if !greeting.to_uppercase().starts_with("* OK") {
            bail!("unexpected IMAP greeting: {greeting}");
        }
        debug!(greeting = %greeting, "IMAP connected");
        Ok(client)
    }

    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            bail!("IMAP connection closed unexpectedly");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    async fn send_command(&mut self, command: &str) -> Result<String> {
        self.tag_counter += 1;
        let tag = format!("A{:04}", self.tag_counter);
        self.writer
            .write_all(format!("{tag} {command}\r\n").as_bytes())
            .await?;
        self.writer.flush().await?;
        Ok(tag)
    }

    /// Untagged lines up to the tagged completion, which must be OK.
    async fn run(&mut self, command: &str, what: &str) -> Result<Vec<String>> {
        let tag = self.send_command(command).await?;
        let mut untagged = Vec::new();
        loop {
            let line = self.read_line().await?;
            if let Some(status) = line.strip_prefix(&tag) {
                expect_ok(status, what)?;
                return Ok(untagged);
            }
            untagged.push(line);
        }
    }

    pub async fn login(&mut self, user: &str, password: &str) -> Result<()> {
        let command = format!("LOGIN {} {}", quote(user), quote(password));
        self.run(&command, "LOGIN").await.map(drop)
    }

    pub async fn select(&mut self, mailbox: &str) -> Result<()> {
        self.run(&format!("SELECT {}", quote(mailbox)), "SELECT")
            .await
            .map(drop)
    }

    /// Sequence numbers of unread messages.
    pub async fn search_unseen(&mut self) -> Result<Vec<u32>> {
        let lines = self.run("SEARCH UNSEEN", "SEARCH").await?;
        Ok(lines
            .iter()
            .filter(|l| l.to_uppercase().starts_with("* SEARCH"))
            .flat_map(|l| l.split_whitespace().skip(2))
            .filter_map(|n| n.parse().ok())
            .collect())
    }

    /// UID and raw RFC 822 bytes of one message, without setting `\Seen`.
    pub async fn fetch(&mut self, seqnum: u32) -> Result<(String, Vec<u8>)> {
        let tag = self
            .send_command(&format!("FETCH {seqnum} (UID BODY.PEEK[])"))
            .await?;

        let mut uid = String::new();
        let mut raw = Vec::new();
        loop {
            let line = self.read_line().await?;
            if let Some(status) = line.strip_prefix(&tag) {
                expect_ok(status, "FETCH")?;
                return Ok((uid, raw));
            }
            if !line.starts_with("* ") {
                continue;
            }
            let (line_uid, literal) = parse_fetch_line(&line);
            if let Some(line_uid) = line_uid {
                uid = line_uid;
            }
            if let Some(size) = literal {
                raw = vec![0u8; size];
                self.reader.read_exact(&mut raw).await?;
                // closing ")" after the literal
                self.read_line().await?;
            }
        }
    }

    pub async fn store_seen(&mut self, seqnum: u32) -> Result<()> {
        self.run(&format!("STORE {seqnum} +FLAGS (\\Seen)"), "STORE")
            .await
            .map(drop)
    }

    pub async fn logout(&mut self) -> Result<()> {
        // Servers send "* BYE" first; the tagged reply may never arrive.
        let tag = self.send_command("LOGOUT").await?;
        while let Ok(line) = self.read_line().await {
            if line.starts_with(&tag) {
                break;
            }
        }
        Ok(())
    }
}

fn expect_ok(status: &str, what: &str) -> Result<()> {
    if status.trim_start().to_uppercase().starts_with("OK") {
        Ok(())
    } else {
        bail!("IMAP {what} failed:{status}")
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// UID and literal size from `* N FETCH (UID 42 BODY[] {1234}`.
fn parse_fetch_line(line: &str) -> (Option<String>, Option<usize>) {
    let upper = line.to_uppercase();
    let uid = upper.find("UID ").map(|pos| {
        line[pos + 4..]
            .chars()
            .take_while(char::is_ascii_digit)
            .collect::<String>()
    });
    let literal = line
        .strip_suffix('}')
        .and_then(|l| l.rfind('{').map(|start| &l[start + 1..]))
        .and_then(|n| n.parse().ok());
    (uid.filter(|u| !u.is_empty()), literal)
}
