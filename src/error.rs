//! Error Taxonomy Module
//!
//! Page- and session-level failures that escape to the engine. Field-level
//! failures never show up here: the extractor recovers them as absent values.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Missing/invalid credentials, malformed company identifier or config.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Sign-in could not be confirmed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A page transition failed after every retry.
    #[error("navigation to {url} failed after {attempts} attempts: {reason}")]
    Navigation {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// Repeated pages that added no new review.
    #[error("no new reviews on {pages} consecutive pages (last page: {url})")]
    Stuck { pages: u32, url: String },

    /// The browser could not be launched or reached.
    #[error("browser unavailable: {0}")]
    Browser(String),
}

impl ScrapeError {
    /// Stable identifier written to run summaries.
    pub fn code(&self) -> &'static str {
        match self {
            ScrapeError::Configuration(_) => "configuration_error",
            ScrapeError::Authentication(_) => "authentication_error",
            ScrapeError::Navigation { .. } => "navigation_error",
            ScrapeError::Stuck { .. } => "stuck_error",
            ScrapeError::Browser(_) => "browser_error",
        }
    }

    /// Errors after which the accumulated dataset is still worth writing.
    pub fn keeps_partial_results(&self) -> bool {
        matches!(self, ScrapeError::Navigation { .. } | ScrapeError::Stuck { .. })
    }
}
