//! Statement acquisition pipeline.
//!
//! Logs in once, then walks each requested category strictly in order over
//! the same browser tab:
//!
//! 1. open the category's statements view
//! 2. read the rendered page text
//! 3. if the extracted period is the current month, capture the current
//!    statement
//! 4. otherwise, or if that capture fails, capture the newest archive entry
//!
//! Category failures are recorded as outcomes and never stop siblings. Login
//! failure and the run deadline abort the whole run.

use crate::capture::{capture_binary_artifact, Trigger};
use crate::config::{Credentials, PortalEndpoints, Timings};
use crate::error::{AcquisitionError, CaptureError, PipelineError};
use crate::live::PortalSession;
use crate::progress::{self, CaptureSource, ProgressEventKind, ProgressSender};
use crate::renderer::RenderContext;
use billgrab_core::{extract_first_archive_entry, extract_period, Document, DocumentCategory, Period};
use chrono::NaiveDate;
use std::time::Instant;

/// Result of processing one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    Captured(Document),
    /// The newest statement on the page is for an earlier period.
    NotReady(Period),
    NotFound,
    CaptureFailed(String),
    NavigationFailed(String),
}

impl AcquisitionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Captured(_) => "captured",
            Self::NotReady(_) => "not-ready",
            Self::NotFound => "not-found",
            Self::CaptureFailed(_) => "capture-failed",
            Self::NavigationFailed(_) => "navigation-failed",
        }
    }

    pub fn document(&self) -> Option<&Document> {
        match self {
            Self::Captured(doc) => Some(doc),
            _ => None,
        }
    }
}

/// Per-category outcomes of one run, in processing order.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub outcomes: Vec<(DocumentCategory, AcquisitionOutcome)>,
    pub elapsed_ms: u64,
}

impl RunReport {
    /// Captured documents in category order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.outcomes.iter().filter_map(|(_, o)| o.document())
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.outcomes
            .into_iter()
            .filter_map(|(_, o)| match o {
                AcquisitionOutcome::Captured(doc) => Some(doc),
                _ => None,
            })
            .collect()
    }

    pub fn captured_count(&self) -> usize {
        self.documents().count()
    }

    pub fn outcome(&self, category: &DocumentCategory) -> Option<&AcquisitionOutcome> {
        self.outcomes
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, o)| o)
    }
}

/// Sequenced progress emission for one run.
struct Progress {
    tx: Option<ProgressSender>,
    run_id: String,
    seq: u64,
}

impl Progress {
    fn emit(&mut self, event: ProgressEventKind) {
        tracing::debug!(run_id = %self.run_id, "{event}");
        progress::emit(&self.tx, &self.run_id, &mut self.seq, event);
    }
}

/// The acquisition pipeline, configured once per run.
pub struct Pipeline {
    credentials: Credentials,
    endpoints: PortalEndpoints,
    timing: Timings,
    categories: Vec<DocumentCategory>,
    today: Option<NaiveDate>,
    progress: Option<ProgressSender>,
}

impl Pipeline {
    pub fn new(credentials: Credentials, endpoints: PortalEndpoints, timing: Timings) -> Self {
        Self {
            credentials,
            endpoints,
            timing,
            categories: DocumentCategory::ALL.to_vec(),
            today: None,
            progress: None,
        }
    }

    /// Categories to process, in order.
    pub fn with_categories(mut self, categories: Vec<DocumentCategory>) -> Self {
        self.categories = categories;
        self
    }

    /// Fix the date that decides the current period. Defaults to the local date.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    /// Run login and every category against `ctx`, bounded by the run deadline.
    ///
    /// On expiry the partial results are discarded.
    pub async fn run(&self, ctx: &mut dyn RenderContext) -> Result<RunReport, PipelineError> {
        let deadline = self.timing.run_timeout();
        match tokio::time::timeout(deadline, self.run_inner(ctx)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(secs = deadline.as_secs(), "run deadline expired");
                Err(PipelineError::Timeout(deadline))
            }
        }
    }

    async fn run_inner(&self, ctx: &mut dyn RenderContext) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let mut progress = Progress {
            tx: self.progress.clone(),
            run_id: uuid::Uuid::new_v4().to_string(),
            seq: 0,
        };

        let today = self
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive());
        let current = Period::from_date(&today)?;

        let mut session = PortalSession::new(ctx, &self.endpoints, &self.timing);

        progress.emit(ProgressEventKind::Authenticating);
        session
            .login(&self.credentials)
            .await
            .map_err(|e| PipelineError::Authentication(format!("{e:#}")))?;
        progress.emit(ProgressEventKind::Authenticated);

        let mut outcomes = Vec::with_capacity(self.categories.len());
        for category in &self.categories {
            let outcome = self
                .acquire(&mut session, category, &current, &mut progress)
                .await;
            tracing::debug!(category = category.id, outcome = outcome.label(), "category done");
            outcomes.push((*category, outcome));
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let report = RunReport {
            run_id: progress.run_id.clone(),
            outcomes,
            elapsed_ms,
        };
        progress.emit(ProgressEventKind::Summary {
            captured: report.captured_count(),
            attempted: report.outcomes.len(),
            elapsed_ms,
        });
        Ok(report)
    }

    async fn acquire(
        &self,
        session: &mut PortalSession<'_>,
        category: &DocumentCategory,
        current: &Period,
        progress: &mut Progress,
    ) -> AcquisitionOutcome {
        let name = category.display_name.to_string();
        progress.emit(ProgressEventKind::Searching {
            category: name.clone(),
        });

        let text = match session.open_statements(category).await {
            Ok(()) => session.page_text().await,
            Err(e) => Err(e),
        };
        let text = match text {
            Ok(text) => text,
            Err(AcquisitionError::Navigation(reason)) => {
                tracing::warn!(category = category.id, "navigation failed: {reason}");
                progress.emit(ProgressEventKind::NavigationFailed {
                    category: name,
                    reason: reason.clone(),
                });
                return AcquisitionOutcome::NavigationFailed(reason);
            }
        };

        let found = extract_period(&text);
        let mut primary_failure = None;
        match &found {
            Some(period) if period == current => {
                match self
                    .capture(session, category, period, Trigger::CurrentDocument, progress)
                    .await
                {
                    Ok(doc) => return AcquisitionOutcome::Captured(doc),
                    Err(e) => {
                        tracing::warn!(category = category.id, "current statement capture failed: {e}");
                        primary_failure = Some(e.to_string());
                    }
                }
            }
            Some(period) => {
                tracing::debug!(category = category.id, found = %period, "newest statement is not current")
            }
            None => tracing::debug!(category = category.id, "no statement period on page"),
        }

        if let Some(period) = extract_first_archive_entry(&text) {
            return match self
                .capture(session, category, &period, Trigger::FirstArchiveEntry, progress)
                .await
            {
                Ok(doc) => AcquisitionOutcome::Captured(doc),
                Err(e) => {
                    tracing::warn!(category = category.id, "archive capture failed: {e}");
                    progress.emit(ProgressEventKind::CaptureFailed {
                        category: name,
                        reason: e.to_string(),
                    });
                    AcquisitionOutcome::CaptureFailed(e.to_string())
                }
            };
        }

        if let Some(reason) = primary_failure {
            progress.emit(ProgressEventKind::CaptureFailed {
                category: name,
                reason: reason.clone(),
            });
            return AcquisitionOutcome::CaptureFailed(reason);
        }

        match found {
            Some(stale) => {
                progress.emit(ProgressEventKind::NotReady {
                    category: name,
                    found: stale.to_string(),
                    expected: current.to_string(),
                });
                AcquisitionOutcome::NotReady(stale)
            }
            None => {
                progress.emit(ProgressEventKind::NotFound { category: name });
                AcquisitionOutcome::NotFound
            }
        }
    }

    async fn capture(
        &self,
        session: &PortalSession<'_>,
        category: &DocumentCategory,
        period: &Period,
        trigger: Trigger,
        progress: &mut Progress,
    ) -> Result<Document, CaptureError> {
        let source = match trigger {
            Trigger::CurrentDocument => CaptureSource::Current,
            Trigger::FirstArchiveEntry => CaptureSource::Archive,
        };
        progress.emit(ProgressEventKind::Downloading {
            category: category.display_name.to_string(),
            period: period.to_string(),
            source,
        });

        let bytes = capture_binary_artifact(session.ctx(), trigger, &self.timing).await?;
        let doc = Document::new(*category, period.clone(), bytes).map_err(|_| CaptureError::Empty)?;

        progress.emit(ProgressEventKind::Captured {
            category: category.display_name.to_string(),
            period: period.to_string(),
            filename: doc.filename().to_string(),
            bytes: doc.payload().len(),
            source,
        });
        Ok(doc)
    }
}
