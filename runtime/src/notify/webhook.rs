//! JSON webhook delivery.

use super::Notifier;
use crate::error::ConfigError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use billgrab_core::Document;
use serde::Serialize;

/// Posts all statements of a run as one JSON document.
pub struct WebhookNotifier {
    url: url::Url,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    pub documents: Vec<WebhookDocument<'a>>,
}

#[derive(Debug, Serialize)]
pub struct WebhookDocument<'a> {
    pub category: &'a str,
    pub filename: &'a str,
    pub month: u8,
    pub year: u16,
    pub month_name: &'a str,
    pub content_base64: String,
}

impl<'a> WebhookPayload<'a> {
    pub fn new(documents: &'a [Document]) -> Self {
        Self {
            documents: documents
                .iter()
                .map(|doc| WebhookDocument {
                    category: doc.category().id,
                    filename: doc.filename(),
                    month: doc.period().month(),
                    year: doc.period().year(),
                    month_name: doc.period().month_name(),
                    content_base64: STANDARD.encode(doc.payload()),
                })
                .collect(),
        }
    }
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self, ConfigError> {
        if url.trim().is_empty() {
            return Err(ConfigError::Missing("webhook.url"));
        }
        let url = url::Url::parse(url.trim())
            .map_err(|e| ConfigError::Invalid(format!("webhook.url: {e}")))?;
        Ok(Self {
            url,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, documents: &[Document]) -> Result<()> {
        let resp = self
            .client
            .post(self.url.clone())
            .json(&WebhookPayload::new(documents))
            .send()
            .await
            .context("posting statements to webhook")?;

        if !resp.status().is_success() {
            anyhow::bail!(
                "webhook rejected statements: {} {}",
                resp.status(),
                resp.text().await.unwrap_or_default()
            );
        }

        tracing::info!(url = %self.url, count = documents.len(), "webhook delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billgrab_core::{DocumentCategory, Period};

    #[test]
    fn test_payload_shape() {
        let docs = vec![Document::new(
            DocumentCategory::CABLE,
            Period::new(3, 2026).unwrap(),
            b"%PDF-1.4".to_vec(),
        )
        .unwrap()];
        let json = serde_json::to_value(WebhookPayload::new(&docs)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "documents": [{
                    "category": "kabel",
                    "filename": "03_2026_Rechnung_Vodafone_Kabel.pdf",
                    "month": 3,
                    "year": 2026,
                    "month_name": "März",
                    "content_base64": "JVBERi0xLjQ="
                }]
            })
        );
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(matches!(
            WebhookNotifier::new(""),
            Err(ConfigError::Missing("webhook.url"))
        ));
        assert!(matches!(
            WebhookNotifier::new("::nope"),
            Err(ConfigError::Invalid(_))
        ));
    }
}
