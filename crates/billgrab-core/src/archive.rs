//! Most-recent entry lookup in the statement archive listing.
//!
//! The archive section lists older statements newest-first, one entry per
//! block of month name, issue date and amount:
//!
//! ```text
//! Rechnungsarchiv
//! Datum   Betrag  Rechnung
//! Januar
//! 04.01.2026
//! 24,98 €
//! ```

use std::sync::OnceLock;

use regex::Regex;

use crate::types::Period;

/// Literal start of the archive listing.
pub const ARCHIVE_MARKER: &str = "Rechnungsarchiv";

fn entry_pattern() -> &'static Regex {
    static ENTRY: OnceLock<Regex> = OnceLock::new();
    ENTRY.get_or_init(|| {
        Regex::new(r"(\w+)\s+[0-9]{2}\.[0-9]{2}\.([0-9]{4})\b").expect("archive entry regex is valid")
    })
}

/// Parse the first archive entry following [`ARCHIVE_MARKER`].
///
/// Text before the marker is never inspected. Only the first entry is
/// considered: when its month token is unknown the result is `None`, because
/// the archive download control always fetches the first listed entry and a
/// later entry's period would mislabel that document.
pub fn extract_first_archive_entry(page_text: &str) -> Option<Period> {
    let start = page_text.find(ARCHIVE_MARKER)?;
    let archive = &page_text[start..];

    let caps = entry_pattern().captures(archive)?;
    let month = caps.get(1)?.as_str();
    let year = caps.get(2)?.as_str();

    match Period::from_month_name(month, year) {
        Ok(period) => Some(period),
        Err(e) => {
            tracing::debug!("first archive entry not usable: {e}");
            None
        }
    }
}
