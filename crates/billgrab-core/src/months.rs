//! The closed table of localized month names.
//!
//! The portal renders month names in German with canonical capitalization.
//! Lookups are exact: `"februar"` and `"February"` are both unknown.

/// Month names in calendar order. Index `i` is month `i + 1`.
pub const MONTHS: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];

/// Look up the month number (1-12) for a canonical month name.
pub fn month_number(name: &str) -> Option<u8> {
    MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|i| i as u8 + 1)
}

/// Look up the canonical name for a month number (1-12).
pub fn month_name(month: u8) -> Option<&'static str> {
    match month {
        1..=12 => Some(MONTHS[month as usize - 1]),
        _ => None,
    }
}
