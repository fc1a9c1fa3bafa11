// Copyright 2026 billgrab contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for run telemetry.
//!
//! The pipeline emits `ProgressEvent`s as it moves through login and the
//! per-category states. Events flow through a `tokio::sync::broadcast`
//! channel to all subscribers (the CLI printer, tests). When no subscriber
//! exists, events are silently dropped.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A progress event emitted during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The run this event belongs to.
    pub run_id: String,
    /// Monotonically increasing sequence number.
    pub seq: u64,
    /// The kind of progress event.
    pub event: ProgressEventKind,
}

/// Which path produced a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureSource {
    /// The current statement's download control.
    Current,
    /// The newest archive entry.
    Archive,
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Archive => write!(f, "archive"),
        }
    }
}

/// The specific kind of progress event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// Login started.
    Authenticating,
    /// Login finished.
    Authenticated,
    /// Navigating to a category's statements.
    Searching { category: String },
    /// A capture is being attempted.
    Downloading {
        category: String,
        period: String,
        source: CaptureSource,
    },
    /// The newest statement is older than the current month.
    NotReady {
        category: String,
        found: String,
        expected: String,
    },
    /// No statement period on the page.
    NotFound { category: String },
    /// A statement was located but its bytes could not be captured.
    CaptureFailed { category: String, reason: String },
    /// The category's pages could not be reached.
    NavigationFailed { category: String, reason: String },
    /// A statement was captured.
    Captured {
        category: String,
        period: String,
        filename: String,
        bytes: usize,
        source: CaptureSource,
    },
    /// The run finished.
    Summary {
        captured: usize,
        attempted: usize,
        elapsed_ms: u64,
    },
}

impl fmt::Display for ProgressEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticating => write!(f, "Logging in..."),
            Self::Authenticated => write!(f, "Logged in"),
            Self::Searching { category } => write!(f, "Searching {category}..."),
            Self::Downloading {
                category,
                period,
                source,
            } => write!(f, "Downloading {category} {period} ({source})..."),
            Self::NotReady {
                category, expected, ..
            } => write!(f, "{category} {expected} not yet ready!"),
            Self::NotFound { category } => write!(f, "{category} not generated yet!"),
            Self::CaptureFailed { category, reason } => {
                write!(f, "{category}: capture failed ({reason})")
            }
            Self::NavigationFailed { category, reason } => {
                write!(f, "{category}: navigation failed ({reason})")
            }
            Self::Captured {
                filename, bytes, ..
            } => write!(f, "Captured {filename} ({bytes} bytes)"),
            Self::Summary {
                captured,
                attempted,
                ..
            } => write!(f, "Done: {captured} of {attempted} statement(s) captured"),
        }
    }
}

/// Sender handle for emitting progress events.
///
/// Backed by a `tokio::sync::broadcast` channel so multiple listeners can
/// subscribe independently. When no listeners exist, `send()` returns an error
/// which we silently ignore.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
///
/// A run emits a handful of events per category, so 64 leaves ample slack.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(64)
}

/// Emit a progress event, silently ignoring send errors
/// (which occur when no receivers are listening).
pub fn emit(tx: &Option<ProgressSender>, run_id: &str, seq: &mut u64, event: ProgressEventKind) {
    if let Some(ref sender) = tx {
        *seq += 1;
        let _ = sender.send(ProgressEvent {
            run_id: run_id.to_string(),
            seq: *seq,
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_event_serialization() {
        let event = ProgressEvent {
            run_id: "run-1".to_string(),
            seq: 1,
            event: ProgressEventKind::Downloading {
                category: "Kabel".to_string(),
                period: "Januar 2026".to_string(),
                source: CaptureSource::Archive,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"Downloading""#));
        assert!(json.contains("Archive"));

        let parsed: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run_id, "run-1");
        assert_eq!(parsed.seq, 1);
        assert_eq!(parsed.event, event.event);
    }

    #[test]
    fn test_unit_variant_serialization() {
        let json = serde_json::to_string(&ProgressEventKind::Authenticated).unwrap();
        assert_eq!(json, r#"{"type":"Authenticated"}"#);
    }

    #[test]
    fn test_channel_no_receivers() {
        let (tx, rx) = channel();
        drop(rx);
        emit(&Some(tx), "test", &mut 0, ProgressEventKind::Authenticating);
    }

    #[test]
    fn test_emit_none_sender() {
        let mut seq = 0;
        emit(&None, "test", &mut seq, ProgressEventKind::Authenticating);
        assert_eq!(seq, 0);
    }

    #[tokio::test]
    async fn test_emit_sequences_events() {
        let (tx, mut rx) = channel();
        let tx = Some(tx);
        let mut seq = 0;
        emit(&tx, "r", &mut seq, ProgressEventKind::Authenticating);
        emit(&tx, "r", &mut seq, ProgressEventKind::Authenticated);
        assert_eq!(rx.recv().await.unwrap().seq, 1);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.seq, 2);
        assert_eq!(second.event, ProgressEventKind::Authenticated);
    }

    #[test]
    fn test_event_display() {
        let not_ready = ProgressEventKind::NotReady {
            category: "Mobilfunk".into(),
            found: "Januar 2026".into(),
            expected: "Februar 2026".into(),
        };
        assert_eq!(not_ready.to_string(), "Mobilfunk Februar 2026 not yet ready!");
        let summary = ProgressEventKind::Summary {
            captured: 1,
            attempted: 2,
            elapsed_ms: 10,
        };
        assert_eq!(summary.to_string(), "Done: 1 of 2 statement(s) captured");
    }
}
