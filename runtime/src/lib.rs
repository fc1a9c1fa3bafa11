// Copyright 2026 billgrab contributors
// SPDX-License-Identifier: Apache-2.0

//! billgrab runtime: drives a Chromium tab through a billing portal,
//! captures the monthly statements in memory and hands them to a notifier.
//!
//! The acquisition pipeline only talks to [`renderer::RenderContext`], so it
//! runs the same against Chromium and against a scripted page in tests.

pub mod capture;
pub mod cli;
pub mod config;
pub mod error;
pub mod live;
pub mod notify;
pub mod pipeline;
pub mod progress;
pub mod renderer;

pub use error::{AcquisitionError, CaptureError, ConfigError, PipelineError};
pub use pipeline::{AcquisitionOutcome, Pipeline, RunReport};
