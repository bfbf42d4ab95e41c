//! Configuration Module
//!
//! Site URLs, CSS selectors, rating scale and timing. Everything has a
//! built-in default matching the review site's markup; a YAML file can
//! override any subset of it.

use crate::error::ScrapeError;
use anyhow::{Context, Result};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub site: SiteConfig,
    pub login: LoginSelectors,
    pub selectors: ReviewSelectorConfig,
    pub rating_scale: RatingScale,
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    pub base_url: String,
    pub login_url: String,
    /// Substring of the URL that means "still on the sign-in page".
    pub login_url_marker: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.glassdoor.com".to_string(),
            login_url: "https://www.glassdoor.com/profile/login_input.htm".to_string(),
            login_url_marker: "login".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginSelectors {
    pub username: String,
    pub password: String,
    pub submit: String,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            username: "input[name='username']".to_string(),
            password: "input[name='password']".to_string(),
            submit: "button[type='submit']".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReviewSelectorConfig {
    pub review: String,
    /// Attribute of the review node carrying the site's review id.
    pub review_id_attribute: String,
    pub date: String,
    pub author: String,
    pub location: String,
    pub title: String,
    pub tenure: String,
    pub helpful: String,
    pub pros: String,
    pub cons: String,
    pub advice: String,
    pub overall_rating: String,
    pub sub_rating_item: String,
    pub sub_rating_label: String,
    pub sub_rating_value: String,
    pub next_page: String,
}

impl Default for ReviewSelectorConfig {
    fn default() -> Self {
        Self {
            review: "li.empReview".to_string(),
            review_id_attribute: "id".to_string(),
            date: "time.date".to_string(),
            author: "span.authorJobTitle".to_string(),
            location: "span.authorLocation".to_string(),
            title: ".summary".to_string(),
            tenure: "p.mainText".to_string(),
            helpful: ".helpfulReviews, .helpfulCount".to_string(),
            pros: ".pros".to_string(),
            cons: ".cons".to_string(),
            advice: ".adviceMgmt".to_string(),
            overall_rating: "span.rating span.value-title".to_string(),
            sub_rating_item: ".subRatings li".to_string(),
            sub_rating_label: ".minor".to_string(),
            sub_rating_value: "span.gdBars".to_string(),
            next_page: "li.next a[href], a.pagination__ArrowStyle__nextArrow[href]".to_string(),
        }
    }
}

/// Selectors compiled once per run.
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub review: Selector,
    pub review_id_attribute: String,
    pub date: Selector,
    pub author: Selector,
    pub location: Selector,
    pub title: Selector,
    pub tenure: Selector,
    pub helpful: Selector,
    pub pros: Selector,
    pub cons: Selector,
    pub advice: Selector,
    pub overall_rating: Selector,
    pub sub_rating_item: Selector,
    pub sub_rating_label: Selector,
    pub sub_rating_value: Selector,
    pub next_page: Selector,
}

impl ReviewSelectorConfig {
    pub fn compile(&self) -> Result<CompiledSelectors, ScrapeError> {
        Ok(CompiledSelectors {
            review: parse_selector("review", &self.review)?,
            review_id_attribute: self.review_id_attribute.clone(),
            date: parse_selector("date", &self.date)?,
            author: parse_selector("author", &self.author)?,
            location: parse_selector("location", &self.location)?,
            title: parse_selector("title", &self.title)?,
            tenure: parse_selector("tenure", &self.tenure)?,
            helpful: parse_selector("helpful", &self.helpful)?,
            pros: parse_selector("pros", &self.pros)?,
            cons: parse_selector("cons", &self.cons)?,
            advice: parse_selector("advice", &self.advice)?,
            overall_rating: parse_selector("overall_rating", &self.overall_rating)?,
            sub_rating_item: parse_selector("sub_rating_item", &self.sub_rating_item)?,
            sub_rating_label: parse_selector("sub_rating_label", &self.sub_rating_label)?,
            sub_rating_value: parse_selector("sub_rating_value", &self.sub_rating_value)?,
            next_page: parse_selector("next_page", &self.next_page)?,
        })
    }

    /// (name, raw selector) pairs, used by the config validator.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("review", self.review.as_str()),
            ("date", self.date.as_str()),
            ("author", self.author.as_str()),
            ("location", self.location.as_str()),
            ("title", self.title.as_str()),
            ("tenure", self.tenure.as_str()),
            ("helpful", self.helpful.as_str()),
            ("pros", self.pros.as_str()),
            ("cons", self.cons.as_str()),
            ("advice", self.advice.as_str()),
            ("overall_rating", self.overall_rating.as_str()),
            ("sub_rating_item", self.sub_rating_item.as_str()),
            ("sub_rating_label", self.sub_rating_label.as_str()),
            ("sub_rating_value", self.sub_rating_value.as_str()),
            ("next_page", self.next_page.as_str()),
        ]
    }
}

pub fn parse_selector(name: &str, raw: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(raw).map_err(|e| {
        ScrapeError::Configuration(format!("invalid '{}' selector '{}': {:?}", name, raw, e))
    })
}

/// Numeric scale the site displays ratings on. Values outside it are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RatingScale {
    pub min: f32,
    pub max: f32,
}

impl Default for RatingScale {
    fn default() -> Self {
        Self { min: 1.0, max: 5.0 }
    }
}

impl RatingScale {
    pub fn accept(&self, value: f32) -> Option<f32> {
        (value.is_finite() && value >= self.min && value <= self.max).then_some(value)
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }
}

/// Durations in milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Fixed wait after submitting the sign-in form.
    pub login_settle_ms: u64,
    /// Upper bound on waiting for the post-login redirect.
    pub login_timeout_ms: u64,
    pub login_poll_ms: u64,
    /// Wait after each page load before reading the page.
    pub page_settle_ms: u64,
    pub navigation_attempts: u32,
    pub backoff_base_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            login_settle_ms: 1_000,
            login_timeout_ms: 10_000,
            login_poll_ms: 500,
            page_settle_ms: 1_000,
            navigation_attempts: 3,
            backoff_base_ms: 500,
        }
    }
}

impl TimingConfig {
    /// No waiting at all; for in-memory browsers.
    pub fn immediate() -> Self {
        Self {
            login_settle_ms: 0,
            login_timeout_ms: 0,
            login_poll_ms: 0,
            page_settle_ms: 0,
            navigation_attempts: 3,
            backoff_base_ms: 0,
        }
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.login_timeout_ms)
    }

    pub fn login_poll(&self) -> Duration {
        Duration::from_millis(self.login_poll_ms)
    }

    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    /// Wait before retry number `attempt` (1-based): base, 2*base, 4*base, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(10);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}

pub fn load_config(path: &Path) -> Result<ScrapeConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {:?}", path))?;

    let config: ScrapeConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config YAML {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selectors_compile() {
        assert!(ReviewSelectorConfig::default().compile().is_ok());
    }

    #[test]
    fn test_invalid_selector_is_configuration_error() {
        let selectors = ReviewSelectorConfig {
            pros: "p[[".to_string(),
            ..Default::default()
        };
        match selectors.compile() {
            Err(ScrapeError::Configuration(msg)) => assert!(msg.contains("pros")),
            other => panic!("expected configuration error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
rating_scale:
  max: 10
selectors:
  review: "div.review"
"#;
        let config: ScrapeConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.selectors.review, "div.review");
        assert_eq!(config.selectors.pros, ".pros");
        assert_eq!(config.rating_scale, RatingScale { min: 1.0, max: 10.0 });
        assert_eq!(config.timing.navigation_attempts, 3);
    }

    #[test]
    fn test_rating_scale_bounds() {
        let scale = RatingScale::default();
        assert_eq!(scale.accept(4.5), Some(4.5));
        assert_eq!(scale.accept(0.0), None);
        assert_eq!(scale.accept(5.5), None);
        assert_eq!(scale.accept(f32::NAN), None);
    }

    #[test]
    fn test_backoff_doubles() {
        let timing = TimingConfig::default();
        assert_eq!(timing.backoff(1), Duration::from_millis(500));
        assert_eq!(timing.backoff(2), Duration::from_millis(1_000));
        assert_eq!(timing.backoff(3), Duration::from_millis(2_000));
    }
}
