//! billgrab-core: billing periods, page-text extraction and captured statement documents.
//!
//! Everything in this crate is synchronous and side-effect free. The browser
//! runtime feeds rendered page text in and gets typed periods back.

pub mod archive;
pub mod extract;
pub mod months;
pub mod types;

pub use archive::{extract_first_archive_entry, ARCHIVE_MARKER};
pub use extract::{extract_period, PeriodPattern, PERIOD_PATTERNS};
pub use months::{month_name, month_number, MONTHS};
pub use types::*;
