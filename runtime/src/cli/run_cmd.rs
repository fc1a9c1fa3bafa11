//! `billgrab run`: fetch the statements and deliver them.

use crate::cli::output;
use crate::config::{resolve_config_path, Config};
use crate::notify;
use crate::pipeline::{Pipeline, RunReport};
use crate::progress::{self, ProgressReceiver};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Arguments of the `run` subcommand.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub config: Option<PathBuf>,
    /// Capture but do not deliver.
    pub dry_run: bool,
    /// Category ids overriding the configured list.
    pub categories: Vec<String>,
}

pub async fn run(args: &RunArgs) -> Result<()> {
    let path = resolve_config_path(args.config.as_deref());
    let mut config = Config::load(&path)?;
    config.apply_env();
    info!(path = %path.display(), "configuration loaded");

    let credentials = config.portal.credentials()?;
    let endpoints = config.portal.endpoints()?;
    let categories = config.selected_categories(&args.categories)?;
    let notifier = if args.dry_run {
        None
    } else {
        notify::from_config(&config)?
    };

    let (tx, rx) = progress::channel();
    let printer = tokio::spawn(print_progress(rx));

    let pipeline = Pipeline::new(credentials, endpoints, config.timing.clone())
        .with_categories(categories)
        .with_progress(tx);

    let renderer = ChromiumRenderer::launch(&config.browser).await?;
    let result = acquire(&renderer, &pipeline).await;
    if let Err(e) = renderer.shutdown().await {
        warn!("browser shutdown failed: {e:#}");
    }

    // Closing the last sender lets the printer drain and finish.
    drop(pipeline);
    let _ = printer.await;

    let documents = result?.into_documents();
    if documents.is_empty() {
        output::status("No statements downloaded");
        return Ok(());
    }

    match notifier {
        Some(notifier) => {
            notify::deliver(notifier.as_ref(), &documents).await?;
            output::status(format!(
                "Sent {} statement(s) via {}",
                documents.len(),
                notifier.name()
            ));
        }
        None => {
            for doc in &documents {
                output::status(format!(
                    "{} ({} bytes) not delivered",
                    doc.filename(),
                    doc.payload().len()
                ));
            }
        }
    }
    Ok(())
}

/// Run the pipeline in a fresh tab and close the tab afterwards.
async fn acquire(renderer: &dyn Renderer, pipeline: &Pipeline) -> Result<RunReport> {
    let mut ctx = renderer
        .new_context()
        .await
        .context("failed to open browser tab")?;
    let result = pipeline.run(ctx.as_mut()).await;
    if let Err(e) = ctx.close().await {
        tracing::debug!("closing tab failed: {e:#}");
    }
    Ok(result?)
}

async fn print_progress(mut rx: ProgressReceiver) {
    loop {
        match rx.recv().await {
            Ok(event) => output::status(&event.event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "progress printer lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
