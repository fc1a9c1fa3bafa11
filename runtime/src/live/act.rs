//! Text-matched page interactions.
//!
//! The portal's markup changes often and carries few stable ids, so most
//! clicks locate their target by visible text. Each interaction renders to a
//! self-contained script that clicks the first match and returns whether a
//! target was found.

use billgrab_core::{DocumentCategory, ARCHIVE_MARKER};

/// Labels of the "download current statement" control.
pub const CURRENT_DOWNLOAD_LABELS: [&str; 3] =
    ["Rechnung herunterladen", "Rechnung (PDF)", "PDF herunterladen"];

/// Labels of the per-entry download links in the statement archive.
pub const ARCHIVE_DOWNLOAD_LABELS: [&str; 3] = ["Rechnung (PDF)", "PDF", "Herunterladen"];

/// Which element receives the click once a text match is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// The matched element itself.
    Matched,
    /// The closest enclosing link, else the parent element.
    EnclosingLink,
}

/// A click on the first element whose visible text matches.
#[derive(Debug, Clone)]
pub struct TextClick<'a> {
    /// CSS selector of the candidate elements.
    pub selector: &'a str,
    /// Matches when the element text contains any of these.
    pub contains: &'a [&'a str],
    /// Matches when the trimmed element text equals any of these.
    pub equals: &'a [&'a str],
    pub target: ClickTarget,
    /// Strip `disabled` and `aria-disabled` before clicking.
    pub force_enable: bool,
    /// Only consider candidates following the heading containing this text.
    pub after_heading: Option<&'a str>,
    /// Only consider candidates preceding the heading containing this text.
    /// Without such a heading every candidate stays eligible.
    pub before_heading: Option<&'a str>,
}

impl<'a> TextClick<'a> {
    pub fn new(selector: &'a str, contains: &'a [&'a str]) -> Self {
        Self {
            selector,
            contains,
            equals: &[],
            target: ClickTarget::Matched,
            force_enable: false,
            after_heading: None,
            before_heading: None,
        }
    }

    pub fn equals(mut self, equals: &'a [&'a str]) -> Self {
        self.equals = equals;
        self
    }

    pub fn target(mut self, target: ClickTarget) -> Self {
        self.target = target;
        self
    }

    pub fn force_enable(mut self) -> Self {
        self.force_enable = true;
        self
    }

    pub fn after_heading(mut self, heading: &'a str) -> Self {
        self.after_heading = Some(heading);
        self
    }

    pub fn before_heading(mut self, heading: &'a str) -> Self {
        self.before_heading = Some(heading);
        self
    }

    /// Render the page script. It evaluates to `true` when a target was clicked.
    pub fn script(&self) -> String {
        let selector = js_string(self.selector);
        let contains = js_list(self.contains);
        let equals = js_list(self.equals);
        let heading = self.after_heading.map_or_else(|| "null".to_string(), js_string);
        let until = self.before_heading.map_or_else(|| "null".to_string(), js_string);
        let pick = match self.target {
            ClickTarget::Matched => "el",
            ClickTarget::EnclosingLink => "(el.closest('a') || el.parentElement || el)",
        };

        format!(
            r#"(() => {{
    const contains = {contains};
    const equals = {equals};
    const heading = {heading};
    const until = {until};
    const textOf = (el) => (el.innerText || el.textContent || '').trim();
    const headingWith = (label) => Array.from(document.querySelectorAll('h1, h2, h3, h4, h5, h6'))
        .find((h) => textOf(h).includes(label));
    let candidates = Array.from(document.querySelectorAll({selector}));
    if (heading !== null) {{
        const anchor = headingWith(heading);
        if (!anchor) return false;
        candidates = candidates.filter(
            (el) => anchor.compareDocumentPosition(el) & Node.DOCUMENT_POSITION_FOLLOWING
        );
    }}
    if (until !== null) {{
        const limit = headingWith(until);
        if (limit) {{
            candidates = candidates.filter(
                (el) => limit.compareDocumentPosition(el) & Node.DOCUMENT_POSITION_PRECEDING
            );
        }}
    }}
    const el = candidates.find((c) => {{
        const text = textOf(c);
        return contains.some((l) => text.includes(l)) || equals.includes(text);
    }});
    if (!el) return false;
    const target = {pick};
    if ({force}) {{
        target.removeAttribute('disabled');
        target.removeAttribute('aria-disabled');
        target.disabled = false;
    }}
    target.click();
    return true;
}})()"#,
            force = self.force_enable,
        )
    }
}

/// Click the contract card of `category` on the services page.
pub fn contract_card_script(category: &DocumentCategory) -> String {
    let labels = [category.nav_label];
    TextClick::new("h2", &labels)
        .target(ClickTarget::EnclosingLink)
        .script()
}

/// Open the statements view through its link.
pub fn statements_link_script() -> String {
    TextClick::new("a", &["Meine Rechnungen"])
        .equals(&["Rechnungen"])
        .script()
}

/// Open the statements view through a button, used when no link exists.
pub fn statements_button_script() -> String {
    TextClick::new("button", &["Rechnungen"]).script()
}

/// Click the download control of the current statement.
///
/// Archive entries share the "Rechnung (PDF)" label, so anything below the
/// archive heading is out of reach.
pub fn current_download_script() -> String {
    TextClick::new("button", &CURRENT_DOWNLOAD_LABELS)
        .before_heading(ARCHIVE_MARKER)
        .force_enable()
        .script()
}

/// Click the download link of the newest archive entry.
pub fn archive_download_script() -> String {
    TextClick::new("a, button", &ARCHIVE_DOWNLOAD_LABELS)
        .after_heading(ARCHIVE_MARKER)
        .force_enable()
        .script()
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "''".to_string())
}

fn js_list(items: &[&str]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}
