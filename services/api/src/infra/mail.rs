//! Outbound transactional mail.

#![allow(async_fn_in_trait)]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context as _, bail};
use serde::Serialize;

pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Messages the service knows how to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailTemplate {
    UserWelcome { user_id: i64, activation_token: String },
}

impl MailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserWelcome { .. } => "user_welcome",
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Self::UserWelcome { .. } => "Welcome to Moviego!".to_owned(),
        }
    }

    pub fn plain_body(&self) -> String {
        match self {
            Self::UserWelcome {
                user_id,
                activation_token,
            } => format!(
                "Hi,\n\n\
                 Thanks for signing up for a Moviego account. We're excited to have you on board!\n\n\
                 For future reference, your user ID number is {user_id}.\n\n\
                 Please send a request to the `PUT /v1/users/activated` endpoint with the \
                 following JSON body to activate your account:\n\n\
                 {{\"token\": \"{activation_token}\"}}\n\n\
                 Please note that this is a one-time use token and it will expire in 3 days.\n\n\
                 Thanks,\n\nThe Moviego Team\n"
            ),
        }
    }

    pub fn html_body(&self) -> String {
        match self {
            Self::UserWelcome {
                user_id,
                activation_token,
            } => format!(
                "<!doctype html>\n<html>\n<body>\n\
                 <p>Hi,</p>\n\
                 <p>Thanks for signing up for a Moviego account. We're excited to have you on board!</p>\n\
                 <p>For future reference, your user ID number is {user_id}.</p>\n\
                 <p>Please send a request to the <code>PUT /v1/users/activated</code> endpoint with the \
                 following JSON body to activate your account:</p>\n\
                 <pre><code>{{\"token\": \"{activation_token}\"}}</code></pre>\n\
                 <p>Please note that this is a one-time use token and it will expire in 3 days.</p>\n\
                 <p>Thanks,</p>\n<p>The Moviego Team</p>\n\
                 </body>\n</html>\n"
            ),
        }
    }
}

pub trait MailSender: Send + Sync {
    async fn send(&self, recipient: &str, template: &MailTemplate) -> anyhow::Result<()>;
}

// ── HTTP API sender ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    email: &'a str,
}

impl<'a> EmailAddress<'a> {
    fn bare(email: &'a str) -> Self {
        Self { name: None, email }
    }
}

/// Split `Name <addr@host>` into display name and bare address.
/// A value without angle brackets is taken as a bare address.
fn parse_mailbox(raw: &str) -> (Option<&str>, &str) {
    let raw = raw.trim();
    match raw.strip_suffix('>').and_then(|rest| rest.rsplit_once('<')) {
        Some((name, email)) => {
            let name = name.trim().trim_matches('"').trim();
            ((!name.is_empty()).then_some(name), email.trim())
        }
        None => (None, raw),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody<'a> {
    sender: EmailAddress<'a>,
    to: [EmailAddress<'a>; 1],
    subject: String,
    html_content: String,
    text_content: String,
    tags: [&'static str; 1],
}

/// Sends through a JSON transactional mail API authenticated by an `api-key` header.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    sender_name: Option<String>,
    sender_email: String,
}

impl HttpMailer {
    /// `sender` is a bare address or `Name <addr@host>`.
    pub fn new(api_url: String, api_key: String, sender: String) -> anyhow::Result<Self> {
        let (sender_name, sender_email) = parse_mailbox(&sender);
        if sender_email.is_empty() || !sender_email.contains('@') {
            bail!("mail sender {sender:?} has no usable address");
        }
        let sender_name = sender_name.map(str::to_owned);
        let sender_email = sender_email.to_owned();
        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .user_agent(concat!("moviego/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build mail http client")?;
        Ok(Self {
            client,
            api_url,
            api_key,
            sender_name,
            sender_email,
        })
    }
}

impl MailSender for HttpMailer {
    async fn send(&self, recipient: &str, template: &MailTemplate) -> anyhow::Result<()> {
        let body = SendEmailBody {
            sender: EmailAddress {
                name: self.sender_name.as_deref(),
                email: &self.sender_email,
            },
            to: [EmailAddress::bare(recipient)],
            subject: template.subject(),
            html_content: template.html_body(),
            text_content: template.plain_body(),
            tags: [template.name()],
        };
        let resp = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("send {} mail", template.name()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = resp.text().await.unwrap_or_default();
        bail!("mail api rejected {} (status={status}): {detail}", template.name())
    }
}

// ── Logging sender ────────────────────────────────────────────────────────────

/// Used when no mail API is configured. Writes the rendered subject to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

impl MailSender for LogMailer {
    async fn send(&self, recipient: &str, template: &MailTemplate) -> anyhow::Result<()> {
        tracing::info!(
            recipient,
            template = template.name(),
            subject = %template.subject(),
            "mail delivery disabled; message not sent"
        );
        Ok(())
    }
}

// ── Recording sender ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub recipient: String,
    pub template: MailTemplate,
}

/// Keeps every message in memory so tests can read activation tokens back.
#[derive(Debug, Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<SentMail>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Activation token from the most recent welcome mail to `recipient`.
    pub fn activation_token_for(&self, recipient: &str) -> Option<String> {
        self.sent().into_iter().rev().find_map(|m| match m.template {
            MailTemplate::UserWelcome {
                activation_token, ..
            } if m.recipient == recipient => Some(activation_token),
            _ => None,
        })
    }
}

impl MailSender for MemoryMailer {
    async fn send(&self, recipient: &str, template: &MailTemplate) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMail {
                recipient: recipient.to_owned(),
                template: template.clone(),
            });
        Ok(())
    }
}

// ── Selection ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Mailer {
    Http(HttpMailer),
    Log(LogMailer),
    Memory(MemoryMailer),
}

impl MailSender for Mailer {
    async fn send(&self, recipient: &str, template: &MailTemplate) -> anyhow::Result<()> {
        match self {
            Self::Http(m) => m.send(recipient, template).await,
            Self::Log(m) => m.send(recipient, template).await,
            Self::Memory(m) => m.send(recipient, template).await,
        }
    }
}
