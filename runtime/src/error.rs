//! Error types for the acquisition runtime.

use billgrab_core::CoreError;
use std::path::PathBuf;
use std::time::Duration;

/// Failures that abort a whole run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("run did not finish within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("calendar error: {0}")]
    Calendar(#[from] CoreError),
}

/// Failures that end one category and leave its siblings running.
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    #[error("navigation failed: {0}")]
    Navigation(String),
}

/// Failures of a single capture attempt.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no control found for {0}")]
    ControlNotFound(&'static str),

    #[error("nothing captured within {}ms", .waited.as_millis())]
    NothingCaptured { waited: Duration },

    #[error("captured payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("captured payload is empty")]
    Empty,

    #[error("driver error: {0}")]
    Driver(String),
}

impl From<anyhow::Error> for CaptureError {
    fn from(e: anyhow::Error) -> Self {
        CaptureError::Driver(format!("{e:#}"))
    }
}

/// Configuration loading and validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing config value: {0}")]
    Missing(&'static str),

    #[error("invalid config: {0}")]
    Invalid(String),
}
