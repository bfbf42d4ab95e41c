//! Scrape Engine Module
//!
//! Drives one run: sign in, load the listing, then harvest page after page
//! until the stop policy says otherwise. The browser is closed on every exit
//! path and whatever was accumulated is returned with the outcome.

use crate::accumulator::ResultAccumulator;
use crate::browser::Browser;
use crate::config::ScrapeConfig;
use crate::credentials::Credentials;
use crate::error::ScrapeError;
use crate::extractor::ReviewExtractor;
use crate::navigator::{CompanyTarget, Navigator, PageCursor, PageDecision, PageSnapshot, PageSummary, StopPolicy};
use crate::session::Session;
use crate::types::{ReviewDataset, StopReason};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineState {
    Init,
    Authenticating,
    Navigating,
    Extracting,
    Finalizing,
    Done,
    Failed,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Pagination ended normally.
    Stopped(StopReason),
    /// Ended early on an error; the dataset holds everything gathered before it.
    Incomplete(ScrapeError),
    /// Nothing could be scraped; the dataset is empty.
    Failed(ScrapeError),
}

impl RunOutcome {
    pub fn code(&self) -> &'static str {
        match self {
            RunOutcome::Stopped(_) => "ok",
            RunOutcome::Incomplete(e) | RunOutcome::Failed(e) => e.code(),
        }
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            RunOutcome::Stopped(reason) => Some(*reason),
            RunOutcome::Incomplete(ScrapeError::Stuck { .. }) => Some(StopReason::Stuck),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ScrapeError> {
        match self {
            RunOutcome::Stopped(_) => None,
            RunOutcome::Incomplete(e) | RunOutcome::Failed(e) => Some(e),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    pub pages_visited: u32,
    pub duplicates: usize,
    pub skipped_nodes: usize,
    pub below_cutoff: usize,
}

impl RunStats {
    fn absorb(&mut self, page: &PageSummary) {
        self.pages_visited += 1;
        self.duplicates += page.duplicates;
        self.skipped_nodes += page.skipped;
        self.below_cutoff += page.below_cutoff;
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub dataset: ReviewDataset,
    pub outcome: RunOutcome,
    pub final_state: EngineState,
    pub stats: RunStats,
    pub elapsed_secs: f64,
}

/// Machine-readable run result.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub outcome: &'static str,
    pub stop_reason: Option<StopReason>,
    pub error: Option<String>,
    pub incomplete: bool,
    pub final_state: EngineState,
    pub records: usize,
    pub pages_visited: u32,
    pub duplicates: usize,
    pub skipped_nodes: usize,
    pub below_cutoff: usize,
    pub elapsed_secs: f64,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            outcome: self.outcome.code(),
            stop_reason: self.outcome.stop_reason(),
            error: self.outcome.error().map(|e| e.to_string()),
            incomplete: !matches!(self.outcome, RunOutcome::Stopped(_)),
            final_state: self.final_state,
            records: self.dataset.len(),
            pages_visited: self.stats.pages_visited,
            duplicates: self.stats.duplicates,
            skipped_nodes: self.stats.skipped_nodes,
            below_cutoff: self.stats.below_cutoff,
            elapsed_secs: self.elapsed_secs,
        }
    }
}

pub struct Engine {
    config: ScrapeConfig,
    policy: StopPolicy,
    extractor: ReviewExtractor,
    navigator: Navigator,
    cancel: CancellationToken,
    state: EngineState,
    history: Vec<EngineState>,
}

impl Engine {
    pub fn new(config: ScrapeConfig, policy: StopPolicy) -> Result<Self, ScrapeError> {
        if !config.rating_scale.is_valid() {
            return Err(ScrapeError::Configuration(format!(
                "invalid rating scale {}..{}",
                config.rating_scale.min, config.rating_scale.max
            )));
        }
        if policy.max_pages == Some(0) {
            return Err(ScrapeError::Configuration("page limit must be at least 1".to_string()));
        }
        let selectors = config.selectors.compile()?;
        let navigator = Navigator::new(&config.timing, &selectors);
        let extractor = ReviewExtractor::new(selectors, config.rating_scale);

        Ok(Self {
            config,
            policy,
            extractor,
            navigator,
            cancel: CancellationToken::new(),
            state: EngineState::Init,
            history: vec![EngineState::Init],
        })
    }

    /// Cancellation is honoured between pages.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// States entered during the last run, in order.
    pub fn history(&self) -> &[EngineState] {
        &self.history
    }

    fn transition(&mut self, next: EngineState) {
        debug!("Engine state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    pub async fn run<B: Browser>(
        &mut self,
        mut browser: B,
        credentials: &Credentials,
        target: &CompanyTarget,
    ) -> RunReport {
        let started = Instant::now();
        self.state = EngineState::Init;
        self.history = vec![EngineState::Init];

        let start_url = match target.start_url(&self.config.site.base_url) {
            Ok(url) => url.to_string(),
            Err(e) => {
                if let Err(quit_err) = browser.quit().await {
                    warn!("Failed to quit browser: {:#}", quit_err);
                }
                return self.failed(e, started);
            }
        };
        info!("Target listing: {}", start_url);

        self.transition(EngineState::Authenticating);
        let mut session = match Session::open(browser, credentials, &self.config).await {
            Ok(session) => session,
            Err(e) => return self.failed(e, started),
        };

        let mut accumulator = ResultAccumulator::new();
        let mut stats = RunStats::default();
        let result = self.paginate(&mut session, &start_url, &mut accumulator, &mut stats).await;

        session.close().await;

        let outcome = match result {
            Ok(reason) => {
                info!("Stopped: {:?}", reason);
                self.transition(EngineState::Finalizing);
                RunOutcome::Stopped(reason)
            }
            Err(e) => {
                warn!("Run incomplete ({}): {}", e.code(), e);
                self.transition(EngineState::Failed);
                RunOutcome::Incomplete(e)
            }
        };

        let dataset = accumulator.finalize();
        if matches!(outcome, RunOutcome::Stopped(_)) {
            self.transition(EngineState::Done);
        }

        let elapsed_secs = started.elapsed().as_secs_f64();
        info!(
            "Collected {} reviews from {} pages ({} duplicates) in {:.1} seconds",
            dataset.len(),
            stats.pages_visited,
            stats.duplicates,
            elapsed_secs
        );

        RunReport {
            dataset,
            outcome,
            final_state: self.state,
            stats,
            elapsed_secs,
        }
    }

    fn failed(&mut self, e: ScrapeError, started: Instant) -> RunReport {
        error!("Run failed ({}): {}", e.code(), e);
        self.transition(EngineState::Failed);
        RunReport {
            dataset: ReviewDataset::default(),
            outcome: RunOutcome::Failed(e),
            final_state: self.state,
            stats: RunStats::default(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        }
    }

    async fn paginate<B: Browser>(
        &mut self,
        session: &mut Session<B>,
        start_url: &str,
        accumulator: &mut ResultAccumulator,
        stats: &mut RunStats,
    ) -> Result<StopReason, ScrapeError> {
        self.transition(EngineState::Navigating);
        self.navigator.load(session, start_url).await?;
        let mut cursor = PageCursor::new(start_url);
        let mut loaded_url = start_url.to_string();

        loop {
            self.transition(EngineState::Extracting);
            let snapshot = self.navigator.snapshot(session, &loaded_url).await?;
            let page = self.harvest(&snapshot, accumulator);
            stats.absorb(&page);

            info!(
                "Page {}: {} reviews, {} new, {} duplicates ({} total)",
                cursor.pages_visited + 1,
                page.parsed,
                page.added,
                page.duplicates,
                accumulator.len()
            );

            let next_url = match cursor.record(&page, &self.policy) {
                PageDecision::Stop(StopReason::Stuck) => {
                    return Err(ScrapeError::Stuck {
                        pages: cursor.consecutive_empty,
                        url: cursor.url.clone(),
                    })
                }
                PageDecision::Stop(reason) => return Ok(reason),
                PageDecision::Continue { next_url } => next_url,
            };

            if self.cancel.is_cancelled() {
                info!("Cancellation requested, stopping after page {}", cursor.pages_visited);
                return Ok(StopReason::Cancelled);
            }

            self.transition(EngineState::Navigating);
            self.navigator.advance(session, &next_url).await?;
            loaded_url = next_url;
        }
    }

    /// Extract and accumulate every review on the page.
    fn harvest(&self, snapshot: &PageSnapshot, accumulator: &mut ResultAccumulator) -> PageSummary {
        let document = snapshot.document();
        let nodes = self.navigator.current_page_elements(&document);
        let mut page = PageSummary {
            url: snapshot.url.clone(),
            nodes: nodes.len(),
            next_url: self.navigator.next_page_url(&document, &snapshot.url),
            ..Default::default()
        };

        for node in &nodes {
            let Some(record) = self.extractor.extract(node) else {
                page.skipped += 1;
                continue;
            };
            page.parsed += 1;

            if let Some(date) = record.review_date {
                page.oldest_date = Some(page.oldest_date.map_or(date, |oldest| oldest.min(date)));
            }

            if !self.policy.keeps(record.review_date) {
                page.below_cutoff += 1;
                continue;
            }

            if accumulator.add(record) {
                page.added += 1;
            } else {
                page.duplicates += 1;
            }
        }

        page
    }
}
