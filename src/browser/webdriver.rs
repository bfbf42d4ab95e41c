use super::Browser;
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::path::PathBuf;
use thirtyfour::prelude::*;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub webdriver_url: String,
    pub headless: bool,
    /// Chrome executable, for non-standard install locations.
    pub binary: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: false,
            binary: None,
        }
    }
}

/// Chrome driven through a running ChromeDriver.
pub struct WebDriverBrowser {
    driver: Option<WebDriver>,
}

impl WebDriverBrowser {
    pub async fn launch(options: &BrowserOptions) -> Result<Self> {
        info!("Configuring browser (headless: {})", options.headless);

        let mut args = vec![
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--window-size=1920,1080",
            "--disable-blink-features=AutomationControlled",
            "--log-level=3",
        ];
        if options.headless {
            args.push("--headless=new");
            args.push("--disable-gpu");
        }

        let mut caps = DesiredCapabilities::chrome();
        caps.add_chrome_option("args", args)?;
        if let Some(binary) = &options.binary {
            caps.add_chrome_option("binary", binary.to_string_lossy().to_string())?;
        }

        let driver = WebDriver::new(&options.webdriver_url, caps)
            .await
            .with_context(|| format!("Failed to connect to ChromeDriver at {}", options.webdriver_url))?;

        Ok(Self { driver: Some(driver) })
    }

    fn driver(&self) -> Result<&WebDriver> {
        self.driver.as_ref().context("Browser already closed")
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn goto(&mut self, url: &str) -> Result<()> {
        debug!("GET {}", url);
        self.driver()?
            .goto(url)
            .await
            .with_context(|| format!("Failed to navigate to {}", url))?;

        // Wait for a body before anyone reads the page
        self.driver()?
            .query(By::Tag("body"))
            .first()
            .await
            .context("Failed to find body element")?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        let url = self
            .driver()?
            .current_url()
            .await
            .context("Failed to read current URL")?;
        Ok(url.to_string())
    }

    async fn page_source(&mut self) -> Result<String> {
        self.driver()?
            .source()
            .await
            .context("Failed to get page source")
    }

    async fn type_into(&mut self, selector: &str, text: &str) -> Result<()> {
        let element = self
            .driver()?
            .find(By::Css(selector))
            .await
            .with_context(|| format!("No element matches {}", selector))?;
        element
            .send_keys(text)
            .await
            .with_context(|| format!("Failed to type into {}", selector))?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        let element = self
            .driver()?
            .find(By::Css(selector))
            .await
            .with_context(|| format!("No element matches {}", selector))?;
        element
            .click()
            .await
            .with_context(|| format!("Failed to click {}", selector))?;
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        if let Some(driver) = self.driver.take() {
            driver.quit().await.context("Failed to quit browser")?;
        }
        Ok(())
    }
}
