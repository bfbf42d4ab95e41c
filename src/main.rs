use anyhow::Result;
use chrono::NaiveDate;
use clap::Parser;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use review_harvest::browser::{BrowserOptions, WebDriverBrowser, DEFAULT_WEBDRIVER_URL};
use review_harvest::config::{load_config, ScrapeConfig};
use review_harvest::credentials::{CredentialSource, DEFAULT_SECRET_FILE};
use review_harvest::engine::{Engine, RunOutcome, RunSummary};
use review_harvest::navigator::{CompanyTarget, StopPolicy};
use review_harvest::storage::{save_dataset, save_summary, OutputFormat};
use review_harvest::{logging, ScrapeError};

const DEFAULT_COMPANY: &str =
    "https://www.glassdoor.com/Overview/Working-at-Premise-Data-Corporation-EI_IE952471.11,35.htm";

const EXIT_CONFIGURATION: u8 = 1;
const EXIT_SESSION: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "review_harvest",
    about = "Sign in to the review site and export a company's employee reviews"
)]
struct Cli {
    /// Company name ("Acme Corp") or full review-listing URL.
    #[arg(short, long, default_value = DEFAULT_COMPANY)]
    name: String,

    /// Where to write the dataset.
    #[arg(short, long, default_value = "reviews.csv")]
    output: PathBuf,

    /// Output format; inferred from the output extension when omitted.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Email address used to sign in.
    #[arg(long)]
    username: Option<String>,

    /// Password used to sign in.
    #[arg(short, long)]
    password: Option<String>,

    /// JSON file with "username" and "password" keys.
    #[arg(short, long)]
    credentials: Option<PathBuf>,

    /// Run Chrome without a window.
    #[arg(long, default_value_t = false)]
    headless: bool,

    /// Chrome executable, for non-standard install locations.
    #[arg(short, long)]
    browser: Option<PathBuf>,

    /// ChromeDriver endpoint.
    #[arg(long, env = "WEBDRIVER_URL", default_value = DEFAULT_WEBDRIVER_URL)]
    webdriver_url: String,

    /// Stop after this many pages.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Keep only reviews on or after this date (YYYY-MM-DD) and stop once older ones appear.
    #[arg(long)]
    min_date: Option<NaiveDate>,

    /// YAML file overriding site URLs, selectors, rating scale and timing.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a JSON run summary here.
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Debug logging.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_CONFIGURATION)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    // Everything that can be wrong with the invocation fails here, before a browser exists
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ScrapeConfig::default(),
    };

    let credentials = CredentialSource {
        username: cli.username.clone(),
        password: cli.password.clone(),
        file: cli.credentials.clone(),
        default_file: Some(PathBuf::from(DEFAULT_SECRET_FILE)),
    }
    .resolve()?;

    let target = CompanyTarget::parse(&cli.name)?;
    let policy = StopPolicy {
        max_pages: cli.max_pages,
        min_date: cli.min_date,
        ..Default::default()
    };
    let format = cli.format.unwrap_or_else(|| OutputFormat::from_path(&cli.output));

    let cancel = CancellationToken::new();
    let mut engine = Engine::new(config, policy)?.with_cancellation(cancel.clone());

    let options = BrowserOptions {
        webdriver_url: cli.webdriver_url.clone(),
        headless: cli.headless,
        binary: cli.browser.clone(),
    };
    let browser = match WebDriverBrowser::launch(&options).await {
        Ok(browser) => browser,
        Err(e) => {
            let e = ScrapeError::Browser(format!("{:#}", e));
            error!("{}", e);
            return Ok(ExitCode::from(EXIT_SESSION));
        }
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current page");
            cancel.cancel();
        }
    });

    let report = engine.run(browser, &credentials, &target).await;

    if let Some(path) = &cli.summary {
        write_summary(path, &report.summary());
    }

    if let Some(code) = failure_status(&report.outcome) {
        return Ok(ExitCode::from(code));
    }
    if let RunOutcome::Incomplete(e) = &report.outcome {
        warn!("Writing partial results: {}", e);
    }

    save_dataset(&cli.output, &report.dataset, format)?;
    info!("Wrote {} reviews to {:?}", report.dataset.len(), cli.output);

    Ok(ExitCode::SUCCESS)
}

/// Exit status of a run that produced nothing worth writing.
fn failure_status(outcome: &RunOutcome) -> Option<u8> {
    match outcome {
        RunOutcome::Failed(ScrapeError::Configuration(_)) => Some(EXIT_CONFIGURATION),
        RunOutcome::Failed(_) => Some(EXIT_SESSION),
        RunOutcome::Incomplete(_) | RunOutcome::Stopped(_) => None,
    }
}

/// A summary that cannot be written is logged; it never changes the exit status.
fn write_summary(path: &Path, summary: &RunSummary) -> bool {
    match save_summary(path, summary) {
        Ok(()) => {
            info!("Wrote run summary to {:?}", path);
            true
        }
        Err(e) => {
            error!("Failed to write run summary to {:?}: {:#}", path, e);
            false
        }
    }
}
