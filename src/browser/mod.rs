//! Browser Capability Module
//!
//! The engine drives the browser only through [`Browser`]: navigate, read the
//! page, type into and click elements located by CSS selector, quit.
//! `webdriver` talks to a real Chrome through ChromeDriver; `memory` serves
//! canned pages.

mod memory;
mod webdriver;

pub use memory::{BrowserLog, MemoryBrowser};
pub use webdriver::{BrowserOptions, WebDriverBrowser, DEFAULT_WEBDRIVER_URL};

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Browser: Send {
    async fn goto(&mut self, url: &str) -> Result<()>;

    async fn current_url(&mut self) -> Result<String>;

    /// Full HTML of the current page.
    async fn page_source(&mut self) -> Result<String>;

    /// Fails when no element matches `selector`.
    async fn type_into(&mut self, selector: &str, text: &str) -> Result<()>;

    /// Fails when no element matches `selector`.
    async fn click(&mut self, selector: &str) -> Result<()>;

    async fn quit(&mut self) -> Result<()>;
}
