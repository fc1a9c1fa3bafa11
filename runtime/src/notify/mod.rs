//! Delivery of captured statements.
//!
//! A run hands its documents to exactly one [`Notifier`], chosen by the
//! `notify` setting. Delivery is skipped entirely when nothing was captured.

pub mod mail;
pub mod webhook;

use crate::config::{Config, NotifyKind};
use crate::error::ConfigError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use billgrab_core::Document;

pub use mail::MailNotifier;
pub use webhook::WebhookNotifier;

/// A sink for captured documents.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;
    /// Deliver `documents`, which is never empty.
    async fn send(&self, documents: &[Document]) -> Result<()>;
}

/// Send `documents` through `notifier` if there are any.
///
/// Returns whether anything was sent.
pub async fn deliver(notifier: &dyn Notifier, documents: &[Document]) -> Result<bool> {
    if documents.is_empty() {
        tracing::info!("no statements captured, nothing to send");
        return Ok(false);
    }
    tracing::info!(via = notifier.name(), count = documents.len(), "sending statements");
    notifier
        .send(documents)
        .await
        .with_context(|| format!("{} delivery failed", notifier.name()))?;
    Ok(true)
}

/// Build the configured notifier. `notify = "none"` yields `None`.
pub fn from_config(config: &Config) -> Result<Option<Box<dyn Notifier>>, ConfigError> {
    match config.notify {
        NotifyKind::Mail => Ok(Some(Box::new(MailNotifier::from_settings(
            &config.email,
            &config.smtp,
        )?))),
        NotifyKind::Webhook => Ok(Some(Box::new(WebhookNotifier::new(&config.webhook.url)?))),
        NotifyKind::None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billgrab_core::{DocumentCategory, Period};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(AtomicUsize);

    #[async_trait]
    impl Notifier for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }
        async fn send(&self, documents: &[Document]) -> Result<()> {
            self.0.fetch_add(documents.len(), Ordering::SeqCst);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        async fn send(&self, _documents: &[Document]) -> Result<()> {
            anyhow::bail!("relay refused")
        }
    }

    fn doc() -> Document {
        Document::new(
            DocumentCategory::MOBILE,
            Period::new(2, 2026).unwrap(),
            b"%PDF".to_vec(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_deliver_skips_empty_list() {
        let notifier = Counting(AtomicUsize::new(0));
        assert!(!deliver(&notifier, &[]).await.unwrap());
        assert_eq!(notifier.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deliver_sends_documents() {
        let notifier = Counting(AtomicUsize::new(0));
        assert!(deliver(&notifier, &[doc(), doc()]).await.unwrap());
        assert_eq!(notifier.0.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_deliver_names_failing_notifier() {
        let err = deliver(&Failing, &[doc()]).await.unwrap_err();
        assert_eq!(err.to_string(), "failing delivery failed");
        assert!(format!("{err:#}").contains("relay refused"));
    }

    #[test]
    fn test_from_config_none() {
        let config = Config::parse("notify = \"none\"").unwrap();
        assert!(from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_from_config_mail_requires_addresses() {
        let config = Config::parse("").unwrap();
        assert!(matches!(from_config(&config), Err(ConfigError::Missing(_))));

        let config = Config::parse(
            "[email]\nfrom = \"a@b.com\"\nto = \"c@d.com\"\n[smtp]\nhost = \"smtp.test.com\"\n",
        )
        .unwrap();
        let notifier = from_config(&config).unwrap().unwrap();
        assert_eq!(notifier.name(), "mail");
    }

    #[test]
    fn test_from_config_webhook() {
        let config =
            Config::parse("notify = \"webhook\"\n[webhook]\nurl = \"https://hooks.example.com/x\"\n")
                .unwrap();
        assert_eq!(from_config(&config).unwrap().unwrap().name(), "webhook");

        let config = Config::parse("notify = \"webhook\"\n").unwrap();
        assert!(from_config(&config).is_err());
    }
}
