//! Billing-period extraction from rendered statement pages.
//!
//! The portal has rendered the current period in several phrasings over time
//! and a single page often carries more than one date-like string (the
//! current heading plus older entries further down). Patterns are therefore
//! tried in a fixed priority order, and only the first match of each pattern
//! is considered:
//!
//! 1. A pattern whose first match carries a known month and a four-digit year
//!    wins, and no later pattern is consulted.
//! 2. A first match with an unknown month token rejects the whole pattern;
//!    extraction moves on to the next pattern rather than the next match.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::Period;

/// A labeled page-text pattern with a month group and a year group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodPattern {
    /// Short name used in logs and tests.
    pub name: &'static str,
    /// Regex source. Group 1 is the month token, group 2 the year.
    pub source: &'static str,
}

/// Period patterns in priority order, most specific first.
pub const PERIOD_PATTERNS: [PeriodPattern; 5] = [
    PeriodPattern {
        name: "current-heading",
        source: r"Aktuelle Rechnung (\w+) ([0-9]{4})\b",
    },
    PeriodPattern {
        name: "statement-heading",
        source: r"Rechnung (\w+) ([0-9]{4})\b",
    },
    PeriodPattern {
        name: "statement-date",
        source: r"Rechnungsdatum[:\s]+[0-9]+\.\s*(\w+)\s+([0-9]{4})\b",
    },
    PeriodPattern {
        name: "trailing-label",
        source: r"(\w+)\s+([0-9]{4})\s+Rechnung",
    },
    PeriodPattern {
        name: "issued-on",
        source: r"Rechnung vom [0-9]+\.\s*(\w+)\s+([0-9]{4})\b",
    },
];

fn compiled_patterns() -> &'static [Regex] {
    static COMPILED: OnceLock<Vec<Regex>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PERIOD_PATTERNS
            .iter()
            .map(|p| Regex::new(p.source).expect("period pattern is valid"))
            .collect()
    })
}

impl PeriodPattern {
    /// Apply this pattern's first match to `text`.
    fn first_match(&self, re: &Regex, text: &str) -> Option<Period> {
        let caps = re.captures(text)?;
        let month = caps.get(1)?.as_str();
        let year = caps.get(2)?.as_str();
        match Period::from_month_name(month, year) {
            Ok(period) => Some(period),
            Err(e) => {
                tracing::trace!(pattern = self.name, "rejected match: {e}");
                None
            }
        }
    }
}

/// Extract the billing period from the full text of a statement page.
pub fn extract_period(page_text: &str) -> Option<Period> {
    PERIOD_PATTERNS
        .iter()
        .zip(compiled_patterns())
        .find_map(|(pattern, re)| pattern.first_match(re, page_text))
}
