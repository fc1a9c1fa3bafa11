//! SMTP delivery: one message, one PDF attachment per statement.

use super::Notifier;
use crate::config::{EmailSettings, SmtpSettings};
use crate::error::ConfigError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use billgrab_core::Document;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Port on which the relay speaks TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

pub struct MailNotifier {
    from: Mailbox,
    to: Mailbox,
    subject: String,
    smtp: SmtpSettings,
}

impl MailNotifier {
    pub fn from_settings(email: &EmailSettings, smtp: &SmtpSettings) -> Result<Self, ConfigError> {
        if email.from.trim().is_empty() {
            return Err(ConfigError::Missing("email.from"));
        }
        if email.to.trim().is_empty() {
            return Err(ConfigError::Missing("email.to"));
        }
        if smtp.host.trim().is_empty() {
            return Err(ConfigError::Missing("smtp.host"));
        }
        if smtp.port == 0 {
            return Err(ConfigError::Invalid("invalid SMTP port: 0".into()));
        }

        let from = parse_mailbox("email.from", &email.from)?;
        let to = parse_mailbox("email.to", &email.to)?;

        Ok(Self {
            from,
            to,
            subject: email.subject().to_string(),
            smtp: smtp.clone(),
        })
    }

    /// Build the message for `documents`.
    pub fn compose(&self, documents: &[Document]) -> Result<Message> {
        let pdf = ContentType::parse("application/pdf").context("pdf content type")?;

        let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(body_text(documents)));
        for doc in documents {
            parts = parts.singlepart(
                Attachment::new(doc.filename().to_string()).body(doc.payload().to_vec(), pdf.clone()),
            );
        }

        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(self.subject.clone())
            .multipart(parts)
            .context("failed to build message")
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let host = self.smtp.host.trim();
        let builder = if self.smtp.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .with_context(|| format!("invalid SMTP relay {host}"))?
        .port(self.smtp.port);

        let builder = if self.smtp.user.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                self.smtp.user.clone(),
                self.smtp.pass.clone(),
            ))
        };
        Ok(builder.build())
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    fn name(&self) -> &'static str {
        "mail"
    }

    async fn send(&self, documents: &[Document]) -> Result<()> {
        let message = self.compose(documents)?;
        self.transport()?
            .send(message)
            .await
            .with_context(|| format!("SMTP delivery via {}:{}", self.smtp.host, self.smtp.port))?;
        tracing::info!(to = %self.to, count = documents.len(), "mail sent");
        Ok(())
    }
}

/// Plain-text body listing each statement's category and period.
pub fn body_text(documents: &[Document]) -> String {
    let mut body = String::from("Anbei Deine Vodafone Rechnungen:\n\n");
    for doc in documents {
        body.push_str(&format!(
            "- {}: {}\n",
            doc.category().display_name,
            doc.period()
        ));
    }
    body
}

fn parse_mailbox(key: &str, value: &str) -> Result<Mailbox, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{key}: {e}")))
}
