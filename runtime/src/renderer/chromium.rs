//! Chromium-based renderer using chromiumoxide.

use super::{NavigationResult, RenderContext, Renderer};
use crate::config::BrowserOptions;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Interval between visibility probes in [`RenderContext::wait_visible`].
const VISIBILITY_POLL: Duration = Duration::from_millis(250);

/// Find the Chromium binary path.
pub fn find_chromium(configured: Option<&PathBuf>) -> Option<PathBuf> {
    // 1. Explicit configuration
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.clone());
        }
    }

    // 2. BILLGRAB_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("BILLGRAB_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common install locations
    let common = [
        "/usr/bin/chromium",
        "/snap/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];
    common.iter().map(PathBuf::from).find(|p| p.exists())
}

/// Translate session options into a chromiumoxide launch configuration.
fn browser_config(options: &BrowserOptions, chrome_path: PathBuf) -> Result<BrowserConfig> {
    let mut builder = BrowserConfig::builder()
        .chrome_executable(chrome_path)
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--no-first-run")
        .arg("--no-default-browser-check");

    builder = if options.headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if options.disable_gpu {
        builder = builder.arg("--disable-gpu");
    }
    if options.no_sandbox {
        builder = builder.arg("--no-sandbox");
    }
    if options.suppress_automation {
        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars");
    }
    if let Some(ua) = options.user_agent.as_deref().filter(|ua| !ua.is_empty()) {
        builder = builder.arg(format!("--user-agent={ua}"));
    }

    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))
}

/// Chromium-based renderer.
///
/// Dropping the renderer stops the CDP handler task and the browser process,
/// so teardown happens on every exit path even when `shutdown` is never
/// reached.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance configured by `options`.
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        let chrome_path = find_chromium(options.chrome_path.as_ref())
            .context("Chromium not found. Install Chrome/Chromium or set browser.chrome_path.")?;
        tracing::debug!(path = %chrome_path.display(), "launching Chromium");

        let config = browser_config(options, chrome_path)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            handler_task,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl Drop for ChromiumRenderer {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.context("failed to close Chromium")?;
        let _ = browser.wait().await;
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    active_count: Arc<AtomicUsize>,
}

/// Script probing whether `selector` matches an element with a rendered box.
fn visibility_script(selector: &str) -> String {
    let selector = serde_json::to_string(selector).unwrap_or_else(|_| "''".to_string());
    format!(
        r#"(() => {{
            const el = document.querySelector({selector});
            if (!el) return false;
            const rect = el.getBoundingClientRect();
            const style = window.getComputedStyle(el);
            return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden';
        }})()"#
    )
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result =
            tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url)).await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;

                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation to {url} failed: {e}"),
            Err(_) => bail!("navigation to {url} timed out after {timeout_ms}ms"),
        }
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        let script = visibility_script(selector);
        let deadline = Instant::now() + timeout;
        loop {
            let visible = self
                .execute_js(&script)
                .await
                .map(|v| v.as_bool().unwrap_or(false))
                .unwrap_or(false);
            if visible {
                return Ok(());
            }
            if Instant::now() >= deadline {
                bail!("{selector} not visible after {}s", timeout.as_secs());
            }
            tokio::time::sleep(VISIBILITY_POLL).await;
        }
    }

    async fn click(&self, selector: &str) -> Result<()> {
        self.page
            .find_element(selector)
            .await
            .with_context(|| format!("no element matches {selector}"))?
            .click()
            .await
            .with_context(|| format!("failed to click {selector}"))?;
        Ok(())
    }

    async fn send_keys(&self, selector: &str, text: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .with_context(|| format!("no element matches {selector}"))?;
        element
            .click()
            .await
            .with_context(|| format!("failed to focus {selector}"))?;
        element
            .type_str(text)
            .await
            .with_context(|| format!("failed to type into {selector}"))?;
        Ok(())
    }

    async fn get_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .unwrap_or_default();
        Ok(url)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_script_escapes_selector() {
        let script = visibility_script(r#"input[name="user"]"#);
        assert!(script.contains(r#"document.querySelector("input[name=\"user\"]")"#));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_navigate_and_read_text() {
        let renderer = ChromiumRenderer::launch(&BrowserOptions::default())
            .await
            .expect("failed to launch renderer");
        let mut ctx = renderer
            .new_context()
            .await
            .expect("failed to create context");

        ctx.navigate(
            "data:text/html,<h1>Aktuelle Rechnung Februar 2026</h1><input id='u'>",
            10000,
        )
        .await
        .expect("navigation failed");

        ctx.wait_visible("#u", Duration::from_secs(5))
            .await
            .expect("input not visible");
        ctx.send_keys("#u", "kunde").await.expect("typing failed");

        let value = ctx
            .execute_js("document.querySelector('#u').value")
            .await
            .expect("JS execution failed");
        assert_eq!(value.as_str().unwrap(), "kunde");

        let text = ctx.page_text().await.expect("page_text failed");
        assert!(text.contains("Aktuelle Rechnung Februar 2026"));

        ctx.close().await.expect("close failed");
        assert_eq!(renderer.active_contexts(), 0);

        renderer.shutdown().await.expect("shutdown failed");
    }
}
