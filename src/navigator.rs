//! Navigator Module
//!
//! Builds the review-listing URL, loads pages with bounded retry, finds the
//! next page, and decides after every page whether to keep going.

use crate::browser::Browser;
use crate::config::{CompiledSelectors, TimingConfig};
use crate::dom::{Node, PageDocument};
use crate::error::ScrapeError;
use crate::session::Session;
use crate::types::StopReason;
use chrono::NaiveDate;
use log::{debug, info, warn};
use scraper::Selector;
use std::collections::HashSet;
use tokio::time::sleep;
use url::Url;

/// What the user asked to scrape.
#[derive(Debug, Clone, PartialEq)]
pub enum CompanyTarget {
    /// Human-readable company name, e.g. "Acme Corp".
    Name(String),
    /// Fully-qualified listing URL, used as-is.
    Url(Url),
}

impl CompanyTarget {
    pub fn parse(identifier: &str) -> Result<Self, ScrapeError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(ScrapeError::Configuration("company identifier is empty".to_string()));
        }

        let lower = identifier.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(identifier).map_err(|e| {
                ScrapeError::Configuration(format!("malformed company URL '{}': {}", identifier, e))
            })?;
            return Ok(CompanyTarget::Url(url));
        }

        Ok(CompanyTarget::Name(identifier.to_string()))
    }

    /// Listing URL for this target. Names become
    /// `{base}/Reviews/{Name-With-Dashes}-reviews-SRCH_KE0,{len}.htm`,
    /// `len` being the character length of the name.
    pub fn start_url(&self, base_url: &str) -> Result<Url, ScrapeError> {
        match self {
            CompanyTarget::Url(url) => Ok(url.clone()),
            CompanyTarget::Name(name) => {
                let slug = name.split_whitespace().collect::<Vec<_>>().join("-");
                let raw = format!(
                    "{}/Reviews/{}-reviews-SRCH_KE0,{}.htm",
                    base_url.trim_end_matches('/'),
                    slug,
                    name.chars().count()
                );
                Url::parse(&raw).map_err(|e| {
                    ScrapeError::Configuration(format!("cannot build listing URL for '{}': {}", name, e))
                })
            }
        }
    }
}

pub fn build_start_url(identifier: &str, base_url: &str) -> Result<Url, ScrapeError> {
    CompanyTarget::parse(identifier)?.start_url(base_url)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageDecision {
    /// Load `next_url` and harvest it.
    Continue { next_url: String },
    Stop(StopReason),
}

/// Caller-supplied limits.
#[derive(Debug, Clone)]
pub struct StopPolicy {
    pub max_pages: Option<u32>,
    /// Oldest review date worth keeping.
    pub min_date: Option<NaiveDate>,
    /// Consecutive pages without a new review before giving up.
    pub stuck_after: u32,
}

impl Default for StopPolicy {
    fn default() -> Self {
        Self {
            max_pages: None,
            min_date: None,
            stuck_after: 2,
        }
    }
}

impl StopPolicy {
    pub fn keeps(&self, date: Option<NaiveDate>) -> bool {
        match (self.min_date, date) {
            (None, _) => true,
            (Some(cutoff), Some(date)) => date >= cutoff,
            (Some(_), None) => false,
        }
    }
}

/// Outcome of harvesting one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSummary {
    pub url: String,
    /// Review elements found.
    pub nodes: usize,
    /// Records the extractor produced.
    pub parsed: usize,
    pub added: usize,
    pub duplicates: usize,
    /// Nodes that were not reviews at all.
    pub skipped: usize,
    /// Parsed records dropped by the date cutoff.
    pub below_cutoff: usize,
    pub oldest_date: Option<NaiveDate>,
    pub next_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PageCursor {
    /// Pages harvested so far.
    pub pages_visited: u32,
    pub url: String,
    pub reviews_seen: usize,
    /// Consecutive pages that added nothing to the dataset.
    pub consecutive_empty: u32,
    /// URLs loaded, or about to be loaded.
    pub visited: HashSet<String>,
    pub decision: PageDecision,
}

impl PageCursor {
    pub fn new(start_url: &str) -> Self {
        Self {
            pages_visited: 0,
            url: start_url.to_string(),
            reviews_seen: 0,
            consecutive_empty: 0,
            visited: HashSet::from([start_url.to_string()]),
            decision: PageDecision::Continue {
                next_url: start_url.to_string(),
            },
        }
    }

    /// Fold one page into the cursor and re-evaluate the stop decision.
    pub fn record(&mut self, summary: &PageSummary, policy: &StopPolicy) -> PageDecision {
        self.pages_visited += 1;
        self.url = summary.url.clone();
        self.reviews_seen += summary.parsed;
        // Pages of duplicates or cut-off reviews make no progress either
        self.consecutive_empty = if summary.added == 0 {
            self.consecutive_empty + 1
        } else {
            0
        };
        self.visited.insert(summary.url.clone());
        self.decision = evaluate_stop(summary, self, policy);
        if let PageDecision::Continue { next_url } = &self.decision {
            self.visited.insert(next_url.clone());
        }
        self.decision.clone()
    }
}

/// Stop precedence: stuck, date cutoff, page limit, no next page.
/// A next link back to a page already loaded counts as no next page.
pub fn evaluate_stop(summary: &PageSummary, cursor: &PageCursor, policy: &StopPolicy) -> PageDecision {
    if policy.stuck_after > 0 && cursor.consecutive_empty >= policy.stuck_after {
        return PageDecision::Stop(StopReason::Stuck);
    }

    if let (Some(cutoff), Some(oldest)) = (policy.min_date, summary.oldest_date) {
        if oldest < cutoff {
            return PageDecision::Stop(StopReason::DateCutoff);
        }
    }

    if let Some(max_pages) = policy.max_pages {
        if cursor.pages_visited >= max_pages {
            return PageDecision::Stop(StopReason::Limit);
        }
    }

    match &summary.next_url {
        Some(next_url) if !cursor.visited.contains(next_url) => PageDecision::Continue {
            next_url: next_url.clone(),
        },
        _ => PageDecision::Stop(StopReason::Exhausted),
    }
}

/// The current page as read from the browser.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: String,
    pub source: String,
}

impl PageSnapshot {
    pub fn document(&self) -> PageDocument {
        PageDocument::parse(&self.source)
    }
}

pub struct Navigator {
    timing: TimingConfig,
    review: Selector,
    next_page: Selector,
}

impl Navigator {
    pub fn new(timing: &TimingConfig, selectors: &CompiledSelectors) -> Self {
        Self {
            timing: timing.clone(),
            review: selectors.review.clone(),
            next_page: selectors.next_page.clone(),
        }
    }

    /// Load `url`, retrying with exponential backoff.
    pub async fn load<B: Browser>(&self, session: &mut Session<B>, url: &str) -> Result<(), ScrapeError> {
        let attempts = self.timing.navigation_attempts.max(1);
        let browser = session.browser()?;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match browser.goto(url).await {
                Ok(()) => {
                    debug!("Loaded {} (attempt {})", url, attempt);
                    sleep(self.timing.page_settle()).await;
                    return Ok(());
                }
                Err(e) => {
                    warn!("Attempt {}/{} to load {} failed: {:#}", attempt, attempts, url, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        sleep(self.timing.backoff(attempt)).await;
                    }
                }
            }
        }

        Err(ScrapeError::Navigation {
            url: url.to_string(),
            attempts,
            reason: last_error.map(|e| format!("{:#}", e)).unwrap_or_default(),
        })
    }

    /// Read the current page. `loaded_url` stands in when the browser
    /// cannot report where it is.
    pub async fn snapshot<B: Browser>(
        &self,
        session: &mut Session<B>,
        loaded_url: &str,
    ) -> Result<PageSnapshot, ScrapeError> {
        let browser = session.browser()?;
        let url = match browser.current_url().await {
            Ok(url) if !url.is_empty() => url,
            Ok(_) => loaded_url.to_string(),
            Err(e) => {
                warn!("Could not read current URL, assuming {}: {:#}", loaded_url, e);
                loaded_url.to_string()
            }
        };
        let source = browser.page_source().await.map_err(|e| ScrapeError::Navigation {
            url: url.clone(),
            attempts: 1,
            reason: format!("{:#}", e),
        })?;
        Ok(PageSnapshot { url, source })
    }

    /// Review elements on the page; empty is a valid answer.
    pub fn current_page_elements<'d>(&self, document: &'d PageDocument) -> Vec<Node<'d>> {
        document.find_all(&self.review)
    }

    /// Absolute URL of the next page, if the page links to one.
    pub fn next_page_url(&self, document: &PageDocument, current_url: &str) -> Option<String> {
        let href = document.find(&self.next_page)?.attribute("href")?;
        if href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
            return None;
        }

        let next = match Url::parse(current_url) {
            Ok(base) => base.join(&href).ok()?,
            Err(_) => Url::parse(&href).ok()?,
        };
        let next = next.to_string();
        (next != current_url).then_some(next)
    }

    /// Move to the page a `Continue` decision points at.
    pub async fn advance<B: Browser>(&self, session: &mut Session<B>, next_url: &str) -> Result<(), ScrapeError> {
        info!("Advancing to {}", next_url);
        self.load(session, next_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReviewSelectorConfig;

    const BASE: &str = "https://www.glassdoor.com";

    fn summary(parsed: usize, oldest: Option<&str>, next: bool) -> PageSummary {
        PageSummary {
            url: "https://example.com/p".to_string(),
            nodes: parsed,
            parsed,
            added: parsed,
            oldest_date: oldest.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            next_url: next.then(|| "https://example.com/next".to_string()),
            ..Default::default()
        }
    }

    fn summary_at(url: &str, parsed: usize, added: usize, next: &str) -> PageSummary {
        PageSummary {
            url: url.to_string(),
            nodes: parsed,
            parsed,
            added,
            next_url: Some(next.to_string()),
            ..Default::default()
        }
    }

    fn is_continue(decision: PageDecision) -> bool {
        matches!(decision, PageDecision::Continue { .. })
    }

    fn navigator() -> Navigator {
        let selectors = ReviewSelectorConfig::default().compile().unwrap();
        Navigator::new(&TimingConfig::immediate(), &selectors)
    }

    #[test]
    fn test_start_url_from_name() {
        let url = build_start_url("Acme Corp", BASE).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.glassdoor.com/Reviews/Acme-Corp-reviews-SRCH_KE0,9.htm"
        );
    }

    #[test]
    fn test_start_url_collapses_spaces() {
        let url = build_start_url("  Premise   Data Corporation ", BASE).unwrap();
        assert!(url.as_str().contains("/Reviews/Premise-Data-Corporation-reviews-SRCH_KE0,"));
    }

    #[test]
    fn test_start_url_accepts_full_url() {
        let raw = "https://www.glassdoor.com/Reviews/Premise-Data-Reviews-E952471.htm";
        assert_eq!(build_start_url(raw, BASE).unwrap().as_str(), raw);
        assert!(matches!(
            build_start_url("https://", BASE),
            Err(ScrapeError::Configuration(_))
        ));
        assert!(matches!(build_start_url("   ", BASE), Err(ScrapeError::Configuration(_))));
    }

    #[test]
    fn test_continue_while_next_page_exists() {
        let policy = StopPolicy::default();
        let mut cursor = PageCursor::new("start");
        assert_eq!(
            cursor.record(&summary(10, None, true), &policy),
            PageDecision::Continue { next_url: "https://example.com/next".to_string() }
        );
        assert_eq!(
            cursor.record(&summary(10, None, false), &policy),
            PageDecision::Stop(StopReason::Exhausted)
        );
        assert_eq!(cursor.reviews_seen, 20);
    }

    #[test]
    fn test_page_limit_is_exact() {
        let policy = StopPolicy { max_pages: Some(2), ..Default::default() };
        let mut cursor = PageCursor::new("start");
        assert!(is_continue(cursor.record(&summary(10, None, true), &policy)));
        assert_eq!(
            cursor.record(&summary(10, None, true), &policy),
            PageDecision::Stop(StopReason::Limit)
        );
    }

    #[test]
    fn test_date_cutoff_only_when_crossed() {
        let policy = StopPolicy {
            min_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            ..Default::default()
        };
        let mut cursor = PageCursor::new("start");
        assert!(is_continue(cursor.record(&summary(10, Some("2020-01-01"), true), &policy)));
        assert_eq!(
            cursor.record(&summary(10, Some("2019-12-31"), true), &policy),
            PageDecision::Stop(StopReason::DateCutoff)
        );
    }

    #[test]
    fn test_two_empty_pages_are_stuck() {
        let policy = StopPolicy::default();
        let mut cursor = PageCursor::new("https://a.test/p1");
        cursor.record(&summary_at("https://a.test/p1", 10, 10, "https://a.test/p2"), &policy);
        assert!(is_continue(cursor.record(&summary_at("https://a.test/p2", 0, 0, "https://a.test/p3"), &policy)));
        assert_eq!(
            cursor.record(&summary(0, None, false), &policy),
            PageDecision::Stop(StopReason::Stuck)
        );
        assert_eq!(cursor.consecutive_empty, 2);
    }

    #[test]
    fn test_single_empty_last_page_is_exhausted() {
        let policy = StopPolicy::default();
        let mut cursor = PageCursor::new("start");
        assert_eq!(
            cursor.record(&summary(0, None, false), &policy),
            PageDecision::Stop(StopReason::Exhausted)
        );
    }

    #[test]
    fn test_link_back_to_loaded_page_is_exhausted() {
        let policy = StopPolicy::default();
        let mut cursor = PageCursor::new("https://a.test/p1");
        assert!(is_continue(cursor.record(&summary_at("https://a.test/p1", 10, 10, "https://a.test/p2"), &policy)));
        assert_eq!(
            cursor.record(&summary_at("https://a.test/p2", 10, 10, "https://a.test/p1"), &policy),
            PageDecision::Stop(StopReason::Exhausted)
        );
    }

    #[test]
    fn test_pages_without_new_reviews_are_stuck() {
        let policy = StopPolicy::default();
        let mut cursor = PageCursor::new("https://a.test/p1");
        cursor.record(&summary_at("https://a.test/p1", 10, 10, "https://a.test/p2"), &policy);
        assert!(is_continue(cursor.record(&summary_at("https://a.test/p2", 10, 0, "https://a.test/p3"), &policy)));
        assert_eq!(
            cursor.record(&summary_at("https://a.test/p3", 10, 0, "https://a.test/p4"), &policy),
            PageDecision::Stop(StopReason::Stuck)
        );
    }

    #[test]
    fn test_cutoff_drops_undated_reviews() {
        let policy = StopPolicy {
            min_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            ..Default::default()
        };
        assert!(!policy.keeps(None));
        assert!(policy.keeps(NaiveDate::from_ymd_opt(2021, 5, 1)));
        assert!(StopPolicy::default().keeps(None));
    }

    #[test]
    fn test_next_page_url_resolves_relative_links() {
        let doc = PageDocument::parse(
            r#"<ul class="pagination"><li class="next"><a href="/Reviews/Acme-Corp-reviews-SRCH_KE0,9_IP2.htm">Next</a></li></ul>"#,
        );
        let next = navigator().next_page_url(
            &doc,
            "https://www.glassdoor.com/Reviews/Acme-Corp-reviews-SRCH_KE0,9.htm",
        );
        assert_eq!(
            next.as_deref(),
            Some("https://www.glassdoor.com/Reviews/Acme-Corp-reviews-SRCH_KE0,9_IP2.htm")
        );
    }

    #[test]
    fn test_disabled_next_link_means_no_next_page() {
        let doc = PageDocument::parse(r#"<li class="next"><span class="disabled">Next</span></li>"#);
        assert!(navigator().next_page_url(&doc, "https://example.com/").is_none());

        let doc = PageDocument::parse(r##"<li class="next"><a href="#">Next</a></li>"##);
        assert!(navigator().next_page_url(&doc, "https://example.com/").is_none());
    }
}
