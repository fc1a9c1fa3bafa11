//! Scripted in-memory portal for driving the pipeline without a browser.
//!
//! Scripts are recognized by exact text, using the same builders the
//! runtime evaluates. Anything else fails like a broken page would.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use billgrab_core::DocumentCategory;
use billgrab_runtime::capture::{HARVEST_SCRIPT, INSTALL_SCRIPT, QUEUE_LENGTH_SCRIPT};
use billgrab_runtime::config::{Credentials, PortalEndpoints, Timings};
use billgrab_runtime::live::act;
use billgrab_runtime::live::session::{
    COOKIE_REJECT_BUTTON, LOGIN_FORM_VISIBLE_SCRIPT, USERNAME_FIELD,
};
use billgrab_runtime::renderer::{NavigationResult, RenderContext, PAGE_TEXT_SCRIPT};
use billgrab_runtime::Pipeline;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One contract's statements view.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub text: String,
    pub has_card: bool,
    pub has_link: bool,
    /// Download control of the current statement is rendered.
    pub current_control: bool,
    /// PDF the current control generates, if any.
    pub current_pdf: Option<Vec<u8>>,
    pub archive_control: bool,
    pub archive_pdf: Option<Vec<u8>>,
    /// Page text reads answered with the contract page before the
    /// statements view shows up.
    pub loading_reads: usize,
    /// Queue polls a triggered capture stays invisible for.
    pub capture_delay: usize,
}

impl FakePage {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            has_card: true,
            has_link: true,
            ..Default::default()
        }
    }

    pub fn with_current(mut self, pdf: Option<&[u8]>) -> Self {
        self.current_control = true;
        self.current_pdf = pdf.map(<[u8]>::to_vec);
        self
    }

    pub fn with_archive(mut self, pdf: Option<&[u8]>) -> Self {
        self.archive_control = true;
        self.archive_pdf = pdf.map(<[u8]>::to_vec);
        self
    }

    pub fn rendering_after(mut self, reads: usize) -> Self {
        self.loading_reads = reads;
        self
    }

    pub fn capturing_after(mut self, polls: usize) -> Self {
        self.capture_delay = polls;
        self
    }

    pub fn without_card(mut self) -> Self {
        self.has_card = false;
        self
    }
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub pages: HashMap<&'static str, FakePage>,
    pub selected: Option<&'static str>,
    pub login_form_missing: bool,
    /// The login form stays on screen after submit.
    pub login_rejected: bool,
    pub banner_shown: bool,
    pub navigate_delay: Option<Duration>,
    pub hook_installed: bool,
    pub wraps: u32,
    pub queue: Vec<String>,
    /// Captures fired but not yet visible in the queue.
    pub pending: Vec<String>,
    pub pending_polls: usize,
    pub queue_polls: usize,
    pub text_reads: usize,
    pub harvested: Vec<usize>,
    pub log: Vec<String>,
}

impl FakeState {
    fn page(&self) -> Option<&FakePage> {
        self.selected.and_then(|label| self.pages.get(label))
    }

    fn fire(&mut self, pdf: Option<Vec<u8>>, delay: usize) {
        if let Some(pdf) = pdf {
            let url = format!("data:application/pdf;base64,{}", STANDARD.encode(pdf));
            let target = if delay == 0 {
                &mut self.queue
            } else {
                self.pending_polls = delay;
                &mut self.pending
            };
            for _ in 0..self.wraps {
                target.push(url.clone());
            }
        }
    }

    fn poll_queue(&mut self) -> usize {
        self.queue_polls += 1;
        if self.pending_polls > 0 {
            self.pending_polls -= 1;
        } else {
            let arrived = std::mem::take(&mut self.pending);
            self.queue.extend(arrived);
        }
        self.queue.len()
    }

    fn read_text(&mut self) -> String {
        self.text_reads += 1;
        match self.page() {
            Some(page) if self.text_reads <= page.loading_reads => CONTRACT_PAGE.to_string(),
            Some(page) => page.text.clone(),
            None => String::new(),
        }
    }
}

/// A portal with a scripted page per contract.
#[derive(Clone, Default)]
pub struct FakePortal {
    state: Arc<Mutex<FakeState>>,
}

impl FakePortal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, category: &DocumentCategory, page: FakePage) -> Self {
        self.state().pages.insert(category.nav_label, page);
        self
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state poisoned")
    }

    pub fn log(&self) -> Vec<String> {
        self.state().log.clone()
    }

    pub fn logged(&self, entry: &str) -> bool {
        self.state().log.iter().any(|e| e == entry)
    }

    pub fn context(&self) -> Box<dyn RenderContext> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl RenderContext for FakePortal {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        let delay = self.state().navigate_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state();
        state.log.push(format!("navigate:{url}"));
        state.selected = None;
        state.hook_installed = false;
        state.wraps = 0;
        state.queue.clear();
        state.pending.clear();
        state.pending_polls = 0;
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 1,
        })
    }

    async fn execute_js(&self, script: &str) -> Result<Value> {
        let mut state = self.state();

        if script == INSTALL_SCRIPT {
            state.log.push("install".into());
            state.queue.clear();
            if state.hook_installed {
                return Ok(json!("present"));
            }
            state.hook_installed = true;
            state.wraps += 1;
            return Ok(json!("installed"));
        }
        if script == QUEUE_LENGTH_SCRIPT {
            return Ok(json!(state.poll_queue()));
        }
        if script == HARVEST_SCRIPT {
            let queue = std::mem::take(&mut state.queue);
            state.harvested.push(queue.len());
            return Ok(json!(queue));
        }
        if script == PAGE_TEXT_SCRIPT {
            return Ok(json!(state.read_text()));
        }
        if script == LOGIN_FORM_VISIBLE_SCRIPT {
            return Ok(json!(state.login_rejected));
        }
        if script == act::statements_link_script() {
            state.log.push("statements-link".into());
            return Ok(json!(state.page().is_some_and(|p| p.has_link)));
        }
        if script == act::statements_button_script() {
            state.log.push("statements-button".into());
            return Ok(json!(false));
        }
        if script == act::current_download_script() {
            state.log.push("trigger:current".into());
            let Some(page) = state.page().cloned() else {
                return Ok(json!(false));
            };
            state.fire(page.current_pdf, page.capture_delay);
            return Ok(json!(page.current_control));
        }
        if script == act::archive_download_script() {
            state.log.push("trigger:archive".into());
            let Some(page) = state.page().cloned() else {
                return Ok(json!(false));
            };
            state.fire(page.archive_pdf, page.capture_delay);
            return Ok(json!(page.archive_control));
        }
        for category in DocumentCategory::ALL {
            if script == act::contract_card_script(&category) {
                state.log.push(format!("card:{}", category.nav_label));
                let found = state
                    .pages
                    .get(category.nav_label)
                    .is_some_and(|p| p.has_card);
                if found {
                    state.selected = Some(category.nav_label);
                    state.text_reads = 0;
                }
                return Ok(json!(found));
            }
        }
        Err(anyhow!("unexpected script: {script}"))
    }

    async fn wait_visible(&self, selector: &str, _timeout: Duration) -> Result<()> {
        let state = self.state();
        if selector == USERNAME_FIELD && state.login_form_missing {
            bail!("{selector} not visible");
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let mut state = self.state();
        if selector == COOKIE_REJECT_BUTTON && !state.banner_shown {
            bail!("no element matches {selector}");
        }
        state.log.push(format!("click:{selector}"));
        Ok(())
    }

    async fn send_keys(&self, selector: &str, text: &str) -> Result<()> {
        self.state().log.push(format!("type:{selector}={text}"));
        Ok(())
    }

    async fn get_url(&self) -> Result<String> {
        Ok(String::new())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }

    async fn sleep(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        user: "kunde".into(),
        pass: "geheim".into(),
    }
}

/// February 2026, the month most scenarios treat as current.
pub fn february_2026() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 10).expect("valid date")
}

pub fn pipeline() -> Pipeline {
    Pipeline::new(credentials(), PortalEndpoints::default(), Timings::default())
        .with_today(february_2026())
}

/// What a contract page shows before its statements view renders.
pub const CONTRACT_PAGE: &str = "Mobilfunk-Vertrag\nTarif\nMeine Rechnungen";

pub const PDF: &[u8] = b"%PDF-1.4 statement";
pub const ARCHIVE_PDF: &[u8] = b"%PDF-1.4 archived statement";
