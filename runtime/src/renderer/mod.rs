//! Renderer abstraction for browser-driven portal sessions.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). The acquisition
//! pipeline only ever talks to a `RenderContext`, which keeps it testable
//! against a scripted in-memory page.

pub mod chromium;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Script returning the rendered text of the whole page.
pub const PAGE_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) driven step by step.
///
/// Navigation state is global to the context, so a context must only ever be
/// driven by one logical flow at a time.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Wait until an element matching `selector` is rendered with a non-empty box.
    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()>;
    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;
    /// Focus the first element matching `selector` and type `text` into it.
    async fn send_keys(&self, selector: &str, text: &str) -> Result<()>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;

    /// Suspend the flow for a settle interval.
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Full rendered text of the page body.
    async fn page_text(&self) -> Result<String> {
        let value = self.execute_js(PAGE_TEXT_SCRIPT).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}

/// Execute a script and deserialize its result into `T`.
pub async fn evaluate<T: DeserializeOwned>(ctx: &dyn RenderContext, script: &str) -> Result<T> {
    let value = ctx.execute_js(script).await?;
    serde_json::from_value(value).context("unexpected script result")
}

/// Marker returned by [`best_effort`]: the step's outcome was discarded on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ignored;

/// Run a step whose failure must not influence the flow.
///
/// Used for page interactions that only help when they apply, such as
/// dismissing a cookie banner that may not be shown.
pub async fn best_effort<T, F>(step: &str, fut: F) -> Ignored
where
    F: Future<Output = Result<T>>,
{
    if let Err(e) = fut.await {
        tracing::debug!(step, "best-effort step skipped: {e:#}");
    }
    Ignored
}
