//! In-memory capture of browser-generated PDFs.
//!
//! The portal builds statements client-side and hands them to the browser as
//! blob URLs, so the bytes never exist at a fetchable address. Capture wraps
//! `URL.createObjectURL` inside the page: every PDF blob is read to a data URL
//! and queued on a page-global array, then passed through to the original
//! function unchanged. The host triggers a download, polls the queue and
//! decodes the first entry.

use crate::config::Timings;
use crate::error::CaptureError;
use crate::live::act;
use crate::renderer::{evaluate, RenderContext};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Resets the queue and wraps `URL.createObjectURL` unless already wrapped.
///
/// The original function is stored once under a page-global key; a repeat
/// install finds it and leaves the existing wrapper in place. Evaluates to
/// `"installed"` or `"present"`.
pub const INSTALL_SCRIPT: &str = r#"(() => {
    window.__billgrabCapturedPdfs = [];
    if (window.__billgrabOriginalCreateObjectURL) return 'present';
    window.__billgrabOriginalCreateObjectURL = URL.createObjectURL;
    URL.createObjectURL = function (obj) {
        if (obj instanceof Blob && obj.type === 'application/pdf') {
            const reader = new FileReader();
            reader.onload = () => {
                if (typeof reader.result === 'string') {
                    window.__billgrabCapturedPdfs.push(reader.result);
                }
            };
            reader.readAsDataURL(obj);
        }
        return window.__billgrabOriginalCreateObjectURL.call(URL, obj);
    };
    return 'installed';
})()"#;

/// Number of queued captures.
pub const QUEUE_LENGTH_SCRIPT: &str = "(window.__billgrabCapturedPdfs || []).length";

/// Reads and clears the queue in one evaluation. Only data URL strings are
/// returned.
pub const HARVEST_SCRIPT: &str = r#"(() => {
    const queue = window.__billgrabCapturedPdfs || [];
    window.__billgrabCapturedPdfs = [];
    return queue.filter((entry) => typeof entry === 'string');
})()"#;

/// The page interaction that makes the portal generate a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The download control of the current statement.
    CurrentDocument,
    /// The download link of the newest archive entry.
    FirstArchiveEntry,
}

impl Trigger {
    pub fn name(&self) -> &'static str {
        match self {
            Trigger::CurrentDocument => "current statement download",
            Trigger::FirstArchiveEntry => "archive entry download",
        }
    }

    /// Page script clicking the control; evaluates to whether it was found.
    pub fn script(&self) -> String {
        match self {
            Trigger::CurrentDocument => act::current_download_script(),
            Trigger::FirstArchiveEntry => act::archive_download_script(),
        }
    }
}

/// Install the capture hook, fire `trigger` and return the captured bytes.
pub async fn capture_binary_artifact(
    ctx: &dyn RenderContext,
    trigger: Trigger,
    timing: &Timings,
) -> Result<Vec<u8>, CaptureError> {
    let hook: String = evaluate(ctx, INSTALL_SCRIPT).await?;
    tracing::debug!(hook = %hook, trigger = trigger.name(), "capture hook ready");

    let clicked: bool = evaluate(ctx, &trigger.script()).await?;
    if !clicked {
        return Err(CaptureError::ControlNotFound(trigger.name()));
    }

    for _ in 0..timing.capture_polls() {
        ctx.sleep(timing.poll_interval()).await;
        let queued: u64 = evaluate(ctx, QUEUE_LENGTH_SCRIPT).await?;
        if queued > 0 {
            break;
        }
    }

    let queue: Vec<String> = evaluate(ctx, HARVEST_SCRIPT).await?;
    if queue.len() > 1 {
        tracing::debug!(discarded = queue.len() - 1, "extra captures dropped");
    }
    let first = queue
        .into_iter()
        .next()
        .ok_or(CaptureError::NothingCaptured {
            waited: timing.capture_wait(),
        })?;

    decode_data_url(&first)
}

/// Decode a base64 data URL (or bare base64) into bytes.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, CaptureError> {
    let encoded = data_url
        .split_once("base64,")
        .map_or(data_url, |(_, payload)| payload);
    let bytes = STANDARD.decode(encoded.trim())?;
    if bytes.is_empty() {
        return Err(CaptureError::Empty);
    }
    Ok(bytes)
}
