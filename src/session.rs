//! Session Manager Module
//!
//! Owns the browser for the whole run: signs in, hands out the browser to
//! the navigator, and quits it exactly once.

use crate::browser::Browser;
use crate::config::ScrapeConfig;
use crate::credentials::Credentials;
use crate::error::ScrapeError;
use log::{debug, info, warn};
use tokio::time::{sleep, Instant};

/// An authenticated browser. Close it with [`Session::close`] on every path.
pub struct Session<B: Browser> {
    browser: Option<B>,
}

impl<B: Browser> Session<B> {
    /// Sign in and return a ready session. On failure the browser is quit
    /// before the error is returned.
    pub async fn open(
        mut browser: B,
        credentials: &Credentials,
        config: &ScrapeConfig,
    ) -> Result<Self, ScrapeError> {
        match sign_in(&mut browser, credentials, config).await {
            Ok(()) => Ok(Self { browser: Some(browser) }),
            Err(e) => {
                if let Err(quit_err) = browser.quit().await {
                    warn!("Failed to quit browser after sign-in failure: {:#}", quit_err);
                }
                Err(e)
            }
        }
    }

    pub fn is_open(&self) -> bool {
        self.browser.is_some()
    }

    pub fn browser(&mut self) -> Result<&mut B, ScrapeError> {
        self.browser
            .as_mut()
            .ok_or_else(|| ScrapeError::Browser("session already closed".to_string()))
    }

    /// Release the browser. Calling it again is a no-op.
    pub async fn close(&mut self) {
        if let Some(mut browser) = self.browser.take() {
            match browser.quit().await {
                Ok(()) => info!("Browser closed"),
                Err(e) => warn!("Failed to quit browser: {:#}", e),
            }
        }
    }
}

impl<B: Browser> Drop for Session<B> {
    fn drop(&mut self) {
        if self.browser.is_some() {
            warn!("Session dropped without close(); the browser process may still be running");
        }
    }
}

async fn sign_in<B: Browser>(
    browser: &mut B,
    credentials: &Credentials,
    config: &ScrapeConfig,
) -> Result<(), ScrapeError> {
    let site = &config.site;
    let login = &config.login;
    info!("Signing in as {}", credentials.username);

    browser.goto(&site.login_url).await.map_err(|e| {
        ScrapeError::Authentication(format!("could not load sign-in page {}: {:#}", site.login_url, e))
    })?;

    browser
        .type_into(&login.username, &credentials.username)
        .await
        .map_err(|e| ScrapeError::Authentication(format!("username field not found: {:#}", e)))?;
    browser
        .type_into(&login.password, &credentials.password)
        .await
        .map_err(|e| ScrapeError::Authentication(format!("password field not found: {:#}", e)))?;
    browser
        .click(&login.submit)
        .await
        .map_err(|e| ScrapeError::Authentication(format!("submit button not found: {:#}", e)))?;

    // Client-side redirects land after the submit returns
    sleep(config.timing.login_settle()).await;

    wait_for_redirect(browser, config).await
}

async fn wait_for_redirect<B: Browser>(browser: &mut B, config: &ScrapeConfig) -> Result<(), ScrapeError> {
    let timeout = config.timing.login_timeout();
    let deadline = Instant::now() + timeout;
    let marker = &config.site.login_url_marker;

    loop {
        let url = browser.current_url().await.map_err(|e| {
            ScrapeError::Authentication(format!("could not read URL after sign-in: {:#}", e))
        })?;

        if !url.contains(marker.as_str()) {
            info!("Signed in, landed on {}", url);
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(ScrapeError::Authentication(format!(
                "still on sign-in page {} after {:?}",
                url, timeout
            )));
        }

        debug!("Waiting for post-login redirect ({})", url);
        sleep(config.timing.login_poll()).await;
    }
}
