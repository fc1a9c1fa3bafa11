//! Configuration loading and resolution.
//!
//! The configuration file is TOML. Every section is optional; missing keys
//! fall back to defaults, and an empty file is a valid (if useless)
//! configuration. Portal credentials are checked only when a run needs them.

use crate::error::ConfigError;
use billgrab_core::DocumentCategory;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "billgrab.toml";

/// Default mail subject.
pub const DEFAULT_SUBJECT: &str = "Deine PDF-Rechnungen von Vodafone";

/// Resolve the configuration file path.
///
/// Priority: explicit path, `BILLGRAB_CONFIG`, `./billgrab.toml`, then
/// `<config dir>/billgrab/billgrab.toml`. When nothing exists the
/// working-directory path is returned so the load error names it.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(env_path) = std::env::var("BILLGRAB_CONFIG") {
        return PathBuf::from(env_path);
    }

    let cwd_config = PathBuf::from(CONFIG_FILE);
    if cwd_config.exists() {
        return cwd_config;
    }

    if let Some(dir) = dirs::config_dir() {
        let user_config = dir.join("billgrab").join(CONFIG_FILE);
        if user_config.exists() {
            return user_config;
        }
    }

    cwd_config
}

/// Where captured statements go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyKind {
    #[default]
    Mail,
    Webhook,
    None,
}

/// Fully parsed configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Category ids to fetch, in order. Empty means all known categories.
    pub categories: Vec<String>,
    pub notify: NotifyKind,
    pub portal: PortalSettings,
    pub email: EmailSettings,
    pub smtp: SmtpSettings,
    pub webhook: WebhookSettings,
    pub browser: BrowserOptions,
    pub timing: Timings,
}

impl Config {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    /// Parse configuration from TOML text.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `BILLGRAB_*` environment overrides for secrets.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply secret overrides from an arbitrary lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(user) = lookup("BILLGRAB_PORTAL_USER") {
            self.portal.user = user;
        }
        if let Some(pass) = lookup("BILLGRAB_PORTAL_PASS") {
            self.portal.pass = pass;
        }
        if let Some(pass) = lookup("BILLGRAB_SMTP_PASS") {
            self.smtp.pass = pass;
        }
    }

    /// Categories to process, in configured order.
    ///
    /// `requested` (from the command line) takes precedence over the file.
    pub fn selected_categories(
        &self,
        requested: &[String],
    ) -> Result<Vec<DocumentCategory>, ConfigError> {
        let ids = if requested.is_empty() {
            &self.categories
        } else {
            requested
        };
        if ids.is_empty() {
            return Ok(DocumentCategory::ALL.to_vec());
        }

        let mut selected: Vec<DocumentCategory> = Vec::with_capacity(ids.len());
        for id in ids {
            let category = DocumentCategory::from_id(id)
                .ok_or_else(|| ConfigError::Invalid(format!("unknown category: {id}")))?;
            if !selected.contains(&category) {
                selected.push(category);
            }
        }
        Ok(selected)
    }
}

/// Portal account and entry points.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSettings {
    pub user: String,
    pub pass: String,
    pub login_url: String,
    pub services_url: String,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            user: String::new(),
            pass: String::new(),
            login_url: "https://www.vodafone.de/meinvodafone/account/login".to_string(),
            services_url: "https://www.vodafone.de/meinvodafone/services/".to_string(),
        }
    }
}

impl fmt::Debug for PortalSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalSettings")
            .field("user", &self.user)
            .field("pass", &redact(&self.pass))
            .field("login_url", &self.login_url)
            .field("services_url", &self.services_url)
            .finish()
    }
}

impl PortalSettings {
    /// Resolved credentials; both fields must be non-empty.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        if self.user.trim().is_empty() {
            return Err(ConfigError::Missing("portal.user"));
        }
        if self.pass.is_empty() {
            return Err(ConfigError::Missing("portal.pass"));
        }
        Ok(Credentials {
            user: self.user.trim().to_string(),
            pass: self.pass.clone(),
        })
    }

    /// Validated portal entry points.
    pub fn endpoints(&self) -> Result<PortalEndpoints, ConfigError> {
        for (key, value) in [
            ("portal.login_url", &self.login_url),
            ("portal.services_url", &self.services_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{key}: {e}")))?;
        }
        Ok(PortalEndpoints {
            login_url: self.login_url.clone(),
            services_url: self.services_url.clone(),
        })
    }
}

/// Portal login identity and secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &redact(&self.pass))
            .finish()
    }
}

/// URLs the pipeline navigates to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalEndpoints {
    pub login_url: String,
    pub services_url: String,
}

impl Default for PortalEndpoints {
    fn default() -> Self {
        let portal = PortalSettings::default();
        Self {
            login_url: portal.login_url,
            services_url: portal.services_url,
        }
    }
}

/// Mail envelope and subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub from: String,
    pub to: String,
    pub subject: Option<String>,
}

impl EmailSettings {
    pub fn subject(&self) -> &str {
        self.subject
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SUBJECT)
    }
}

/// SMTP relay account.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 465,
            user: String::new(),
            pass: String::new(),
        }
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &redact(&self.pass))
            .finish()
    }
}

/// Webhook target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    pub url: String,
}

/// Browser session construction options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    pub headless: bool,
    pub disable_gpu: bool,
    pub no_sandbox: bool,
    pub user_agent: Option<String>,
    /// Hide the `navigator.webdriver` automation signature.
    pub suppress_automation: bool,
    pub chrome_path: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            disable_gpu: true,
            no_sandbox: true,
            user_agent: None,
            suppress_automation: true,
            chrome_path: None,
        }
    }
}

/// Settle delays, poll bounds and the overall run deadline, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Pause after each navigation step.
    pub settle_ms: u64,
    /// Pause after submitting the login form.
    pub login_settle_ms: u64,
    /// Pause after the cookie banner.
    pub banner_settle_ms: u64,
    /// Interval of readiness and capture polls.
    pub poll_interval_ms: u64,
    /// Upper bound of readiness poll cycles.
    pub max_polls: u32,
    /// How long a triggered capture may take to appear.
    pub capture_wait_ms: u64,
    /// Bound for the login form to become visible.
    pub login_form_timeout_ms: u64,
    /// Per-navigation timeout passed to the driver.
    pub navigation_timeout_ms: u64,
    /// Deadline for the whole run.
    pub run_timeout_ms: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle_ms: 3_000,
            login_settle_ms: 5_000,
            banner_settle_ms: 1_000,
            poll_interval_ms: 1_000,
            max_polls: 15,
            capture_wait_ms: 5_000,
            login_form_timeout_ms: 30_000,
            navigation_timeout_ms: 60_000,
            run_timeout_ms: 5 * 60 * 1_000,
        }
    }
}

impl Timings {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }

    pub fn banner_settle(&self) -> Duration {
        Duration::from_millis(self.banner_settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn capture_wait(&self) -> Duration {
        Duration::from_millis(self.capture_wait_ms)
    }

    /// Number of queue polls covering the capture wait; at least one.
    pub fn capture_polls(&self) -> u64 {
        if self.poll_interval_ms == 0 {
            return 1;
        }
        self.capture_wait_ms.div_ceil(self.poll_interval_ms).max(1)
    }

    pub fn login_form_timeout(&self) -> Duration {
        Duration::from_millis(self.login_form_timeout_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}
