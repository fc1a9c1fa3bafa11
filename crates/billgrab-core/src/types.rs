//! Core data types for billing periods and captured documents.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::Datelike;
use serde::Serialize;

use crate::months::{month_name, month_number};

/// A fixed contract type whose statement is fetched once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DocumentCategory {
    /// Stable identifier used in configuration and on the command line.
    pub id: &'static str,
    /// Human display name used in progress output and mail bodies.
    pub display_name: &'static str,
    /// Text of the contract card on the portal's services page.
    pub nav_label: &'static str,
    /// Filename-safe tag.
    pub tag: &'static str,
}

impl DocumentCategory {
    pub const MOBILE: DocumentCategory = DocumentCategory {
        id: "mobilfunk",
        display_name: "Mobilfunk",
        nav_label: "Mobilfunk-Vertrag",
        tag: "Mobilfunk",
    };

    pub const CABLE: DocumentCategory = DocumentCategory {
        id: "kabel",
        display_name: "Kabel",
        nav_label: "Kabel-Vertrag",
        tag: "Kabel",
    };

    /// All known categories, in processing order.
    pub const ALL: [DocumentCategory; 2] = [Self::MOBILE, Self::CABLE];

    /// Look up a category by identifier (case-insensitive).
    pub fn from_id(id: &str) -> Option<DocumentCategory> {
        Self::ALL
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(id.trim()))
            .copied()
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name)
    }
}

/// The billing period a statement covers.
///
/// Equality and hashing consider only `month` and `year`; `month_name` is
/// presentation and always derived from the month table.
#[derive(Debug, Clone, Serialize)]
pub struct Period {
    month: u8,
    year: u16,
    month_name: &'static str,
}

impl Period {
    /// Build a period from a month number and a four-digit year.
    pub fn new(month: u8, year: u16) -> CoreResult<Self> {
        let month_name = month_name(month).ok_or(CoreError::InvalidMonth(month))?;
        if !(1000..=9999).contains(&year) {
            return Err(CoreError::InvalidYear(year.to_string()));
        }
        Ok(Self {
            month,
            year,
            month_name,
        })
    }

    /// Build a period from a month-table name and a year token.
    ///
    /// The year token must be exactly four ASCII digits.
    pub fn from_month_name(name: &str, year: &str) -> CoreResult<Self> {
        let month = month_number(name).ok_or_else(|| CoreError::UnknownMonth(name.to_string()))?;
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidYear(year.to_string()));
        }
        let year: u16 = year
            .parse()
            .map_err(|_| CoreError::InvalidYear(year.to_string()))?;
        Self::new(month, year)
    }

    /// The period containing the given calendar date.
    pub fn from_date<D: Datelike>(date: &D) -> CoreResult<Self> {
        let year = u16::try_from(date.year())
            .map_err(|_| CoreError::InvalidYear(date.year().to_string()))?;
        Self::new(date.month() as u8, year)
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month_name(&self) -> &'static str {
        self.month_name
    }
}

impl PartialEq for Period {
    fn eq(&self, other: &Self) -> bool {
        self.month == other.month && self.year == other.year
    }
}

impl Eq for Period {}

impl Hash for Period {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.month.hash(state);
        self.year.hash(state);
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month_name, self.year)
    }
}

/// Deterministic attachment filename for a category's statement.
pub fn document_filename(category: &DocumentCategory, period: &Period) -> String {
    format!(
        "{:02}_{}_Rechnung_Vodafone_{}.pdf",
        period.month(),
        period.year(),
        category.tag
    )
}

/// A successfully captured statement.
///
/// The payload is never empty; there is no way to mutate a document after
/// construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    category: DocumentCategory,
    period: Period,
    filename: String,
    payload: Vec<u8>,
}

impl Document {
    pub fn new(category: DocumentCategory, period: Period, payload: Vec<u8>) -> CoreResult<Self> {
        if payload.is_empty() {
            return Err(CoreError::EmptyPayload);
        }
        let filename = document_filename(&category, &period);
        Ok(Self {
            category,
            period,
            filename,
            payload,
        })
    }

    pub fn category(&self) -> &DocumentCategory {
        &self.category
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("category", &self.category.id)
            .field("period", &self.period.to_string())
            .field("filename", &self.filename)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Errors raised while building core values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown month name: {0}")]
    UnknownMonth(String),

    #[error("Month out of range: {0}")]
    InvalidMonth(u8),

    #[error("Invalid year: {0}")]
    InvalidYear(String),

    #[error("Document payload is empty")]
    EmptyPayload,
}

/// Convenience result type.
pub type CoreResult<T> = Result<T, CoreError>;
