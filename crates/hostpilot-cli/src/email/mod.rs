//! Email front end: poll IMAP for unread mail, answer whitelisted senders over SMTP.
//!
//! One agent session serves every sender for the life of the process. A body
//! of `reset` clears it. Messages are deduplicated by `Message-ID` (or the
//! IMAP UID when the header is missing).

mod imap;

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{error, info, warn};

use hostpilot_agent::{AgentSession, LogTarget};
use hostpilot_core::config::{Config, EmailConfig};
use hostpilot_core::utils::{expand_home, file_stamp, truncate_string};

use imap::ImapClient;

const RESET_REPLY: &str = "✓ Conversation reset";
const DEFAULT_REPLY_SUBJECT: &str = "AI Agent Response";

// ─────────────────────────────────────────────
// Parsed mail
// ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct InboundEmail {
    sender: String,
    subject: String,
    message_id: String,
    body: String,
}

/// A reply waiting to go out over SMTP.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Bare lowercase address from a `From` header.
///
/// Handles `user@example.com`, `Name <user@example.com>` and
/// `"Name" <user@example.com>`.
fn extract_sender_email(from_header: &str) -> String {
    if let (Some(start), Some(end)) = (from_header.rfind('<'), from_header.rfind('>')) {
        if end > start {
            return from_header[start + 1..end].trim().to_lowercase();
        }
    }
    from_header.trim().to_lowercase()
}

fn parse_email(raw: &[u8]) -> Option<InboundEmail> {
    let parsed = mailparse::parse_mail(raw).ok()?;
    let header = |name: &str| {
        parsed
            .headers
            .iter()
            .find(|h| h.get_key().eq_ignore_ascii_case(name))
            .map(|h| h.get_value())
            .unwrap_or_default()
    };

    Some(InboundEmail {
        sender: extract_sender_email(&header("From")),
        subject: header("Subject").trim().to_string(),
        message_id: header("Message-ID").trim().to_string(),
        body: extract_body(&parsed).trim().to_string(),
    })
}

/// First `text/plain` part of a multipart mail, or the whole single-part body.
fn extract_body(mail: &mailparse::ParsedMail) -> String {
    if mail.subparts.is_empty() {
        return mail.get_body().unwrap_or_default();
    }
    first_plain_part(mail).unwrap_or_default()
}

fn first_plain_part(mail: &mailparse::ParsedMail) -> Option<String> {
    mail.subparts.iter().find_map(|part| {
        if !part.subparts.is_empty() {
            first_plain_part(part)
        } else if part.ctype.mimetype.eq_ignore_ascii_case("text/plain") {
            part.get_body().ok()
        } else {
            None
        }
    })
}

fn build_reply_subject(original: &str) -> String {
    if original.is_empty() {
        DEFAULT_REPLY_SUBJECT.to_string()
    } else {
        format!("Re: {original}")
    }
}

// ─────────────────────────────────────────────
// EmailServer
// ─────────────────────────────────────────────

pub struct EmailServer {
    config: EmailConfig,
    session: AgentSession,
    processed_ids: HashSet<String>,
}

impl EmailServer {
    /// Validate the mailbox settings and open the shared agent session.
    ///
    /// The transcript goes to `<log_dir>/email_<timestamp>.log`.
    pub fn new(config: &Config) -> Result<Self> {
        let email = &config.email;
        if email.address.is_empty() || email.password.is_empty() {
            bail!("EMAIL_ADDRESS and EMAIL_PASSWORD must be set");
        }
        if email.authorized.is_empty() {
            bail!("AUTHORIZED_EMAILS must contain at least one email address");
        }

        let transcript = expand_home(&config.paths.log_dir).join(format!("email_{}.log", file_stamp()));
        let session = AgentSession::from_config(config, LogTarget::Transcript(transcript))
            .context("failed to start agent session")?;

        Ok(Self {
            config: email.clone(),
            session,
            processed_ids: HashSet::new(),
        })
    }

    /// Poll until Ctrl+C.
    pub async fn run(mut self) -> Result<()> {
        info!(inbox = %self.config.address, authorized = %self.config.authorized.join(", "), "email server started");

        loop {
            let delay = match self.check_inbox().await {
                Ok(replies) => {
                    for reply in replies {
                        if let Err(e) = self.send_reply(&reply).await {
                            error!(to = %reply.to, error = %e, "failed to send reply");
                        }
                    }
                    self.config.poll_interval_secs
                }
                Err(e) => {
                    error!(error = %e, "failed to check inbox");
                    self.config.retry_delay_secs
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(delay)) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// One poll: fetch unread mail, answer new authorized messages.
    ///
    /// Every fetched message is marked `\Seen`, answered or not.
    pub async fn check_inbox(&mut self) -> Result<Vec<OutboundEmail>> {
        let mut client = ImapClient::connect(
            &self.config.imap_host,
            self.config.imap_port,
            self.config.imap_use_ssl,
        )
        .await?;
        client.login(&self.config.address, &self.config.password).await?;
        client.select("INBOX").await?;

        let mut pending = Vec::new();
        for seqnum in client.search_unseen().await? {
            let (uid, raw) = client.fetch(seqnum).await?;
            let incoming = parse_email(&raw);
            client.store_seen(seqnum).await?;

            let Some(mut incoming) = incoming else {
                warn!(uid = %uid, "unparseable message skipped");
                continue;
            };
            if !self.config.is_authorized(&incoming.sender) {
                warn!(sender = %incoming.sender, "unauthorized email ignored");
                continue;
            }
            if incoming.message_id.is_empty() {
                incoming.message_id = format!("uid:{uid}");
            }
            if incoming.body.is_empty() || !self.processed_ids.insert(incoming.message_id.clone()) {
                continue;
            }
            pending.push(incoming);
        }
        client.logout().await?;

        let mut replies = Vec::with_capacity(pending.len());
        for incoming in pending {
            info!(sender = %incoming.sender, body = %truncate_string(&incoming.body, 50), "processing email");
            let body = self.respond(&incoming.body).await;
            replies.push(OutboundEmail {
                to: incoming.sender,
                subject: build_reply_subject(&incoming.subject),
                body,
            });
        }
        Ok(replies)
    }

    /// Agent answer for one message body. Errors become the reply text.
    pub async fn respond(&mut self, body: &str) -> String {
        if body.trim().eq_ignore_ascii_case("reset") {
            self.session.reset();
            return RESET_REPLY.to_string();
        }
        match self.session.chat(body).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "agent processing failed");
                format!("Error: {e}")
            }
        }
    }

    async fn send_reply(&self, reply: &OutboundEmail) -> Result<()> {
        use lettre::message::Mailbox;
        use lettre::transport::smtp::authentication::Credentials;
        use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

        let from: Mailbox = self.config.address.parse().context("invalid EMAIL_ADDRESS")?;
        let to: Mailbox = reply.to.parse().context("invalid recipient address")?;
        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(&reply.subject)
            .body(reply.body.clone())?;

        let credentials = Credentials::new(self.config.address.clone(), self.config.password.clone());
        let relay = if self.config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
        };
        let transport = relay
            .port(self.config.smtp_port)
            .credentials(credentials)
            .build();

        transport.send(message).await?;
        info!(to = %reply.to, body = %truncate_string(&reply.body, 50), "email sent");
        Ok(())
    }
}
