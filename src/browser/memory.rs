use super::Browser;
use anyhow::{bail, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// What a [`MemoryBrowser`] was asked to do. Shared, so it stays readable
/// after the browser itself has been handed to the engine.
#[derive(Debug, Clone, Default)]
pub struct BrowserLog {
    /// Every `goto` call, including failed ones.
    pub visits: Vec<String>,
    /// (selector, text) pairs typed.
    pub typed: Vec<(String, String)>,
    pub clicks: Vec<String>,
    pub quit_calls: usize,
}

/// Browser over an in-memory site: URL -> HTML.
#[derive(Debug, Default)]
pub struct MemoryBrowser {
    pages: HashMap<String, String>,
    /// Page to land on after clicking anything on the key page.
    on_click: HashMap<String, String>,
    /// Remaining forced failures per URL.
    failures: HashMap<String, u32>,
    current: Option<String>,
    log: Arc<Mutex<BrowserLog>>,
}

impl MemoryBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_redirect_on_click(mut self, from: &str, to: &str) -> Self {
        self.on_click.insert(from.to_string(), to.to_string());
        self
    }

    pub fn with_failures(mut self, url: &str, times: u32) -> Self {
        self.failures.insert(url.to_string(), times);
        self
    }

    pub fn log(&self) -> Arc<Mutex<BrowserLog>> {
        Arc::clone(&self.log)
    }

    fn record<F: FnOnce(&mut BrowserLog)>(&self, f: F) {
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut log);
    }

    fn current_html(&self) -> Result<&str> {
        match self.current.as_ref().and_then(|url| self.pages.get(url)) {
            Some(html) => Ok(html),
            None => bail!("No page loaded"),
        }
    }

    fn require_element(&self, selector: &str) -> Result<()> {
        let parsed = match Selector::parse(selector) {
            Ok(parsed) => parsed,
            Err(e) => bail!("Invalid selector {}: {:?}", selector, e),
        };
        let document = Html::parse_document(self.current_html()?);
        if document.select(&parsed).next().is_none() {
            bail!("No element matches {}", selector);
        }
        Ok(())
    }
}

#[async_trait]
impl Browser for MemoryBrowser {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.record(|log| log.visits.push(url.to_string()));

        if let Some(remaining) = self.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                bail!("Simulated network failure for {}", url);
            }
        }

        if !self.pages.contains_key(url) {
            bail!("No page at {}", url);
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.current.clone().unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn page_source(&mut self) -> Result<String> {
        self.current_html().map(str::to_string)
    }

    async fn type_into(&mut self, selector: &str, text: &str) -> Result<()> {
        self.require_element(selector)?;
        self.record(|log| log.typed.push((selector.to_string(), text.to_string())));
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        self.require_element(selector)?;
        self.record(|log| log.clicks.push(selector.to_string()));

        let target = self.current.as_ref().and_then(|url| self.on_click.get(url)).cloned();
        if let Some(target) = target {
            if self.pages.contains_key(&target) {
                self.current = Some(target);
            }
        }
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        self.record(|log| log.quit_calls += 1);
        self.current = None;
        Ok(())
    }
}
