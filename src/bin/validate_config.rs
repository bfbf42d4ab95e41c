//! Config Validation Binary
//!
//! Validates a scraper YAML config before a run:
//! - Every selector parses as CSS
//! - Site URLs are absolute http(s) URLs
//! - The rating scale and timing values make sense

use anyhow::{Context, Result};
use review_harvest::config::{load_config, parse_selector, ScrapeConfig};
use std::path::PathBuf;
use url::Url;

fn check_url(name: &str, raw: &str, errors: &mut Vec<String>) {
    match Url::parse(raw) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(format!("{} has unsupported scheme '{}': {}", name, url.scheme(), raw)),
        Err(e) => errors.push(format!("{} is not a valid URL ({}): {}", name, e, raw)),
    }
}

fn validate(config: &ScrapeConfig) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (name, raw) in config.selectors.entries() {
        if let Err(e) = parse_selector(name, raw) {
            errors.push(e.to_string());
        }
    }
    for (name, raw) in [
        ("login.username", config.login.username.as_str()),
        ("login.password", config.login.password.as_str()),
        ("login.submit", config.login.submit.as_str()),
    ] {
        if let Err(e) = parse_selector(name, raw) {
            errors.push(e.to_string());
        }
    }
    if config.selectors.review_id_attribute.trim().is_empty() {
        warnings.push("selectors.review_id_attribute is empty; duplicates will be detected by content only".to_string());
    }

    check_url("site.base_url", &config.site.base_url, &mut errors);
    check_url("site.login_url", &config.site.login_url, &mut errors);

    if config.site.login_url_marker.is_empty() {
        errors.push("site.login_url_marker is empty; every URL would look like the sign-in page".to_string());
    } else if !config.site.login_url.contains(&config.site.login_url_marker) {
        warnings.push(format!(
            "site.login_url does not contain login_url_marker '{}'; sign-in would be confirmed immediately",
            config.site.login_url_marker
        ));
    }

    if !config.rating_scale.is_valid() {
        errors.push(format!(
            "rating_scale min ({}) must be below max ({})",
            config.rating_scale.min, config.rating_scale.max
        ));
    }

    if config.timing.navigation_attempts == 0 {
        warnings.push("timing.navigation_attempts is 0 (will be treated as 1)".to_string());
    }
    if config.timing.login_timeout_ms < config.timing.login_poll_ms {
        warnings.push("timing.login_timeout_ms is shorter than login_poll_ms; the redirect is checked once".to_string());
    }

    (errors, warnings)
}

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: validate_config <config.yml>")?;

    println!("=== Scraper Config Validator ===");

    let config = load_config(&path)
        .with_context(|| format!("Failed to load {:?}", path))?;

    let (errors, warnings) = validate(&config);

    if errors.is_empty() && warnings.is_empty() {
        println!("✓ {:?} is valid", path);
        return Ok(());
    }

    if !errors.is_empty() {
        println!("\n❌ ERRORS (must fix):");
        for error in &errors {
            println!("  - {}", error);
        }
    }

    if !warnings.is_empty() {
        println!("\n⚠️  WARNINGS:");
        for warning in &warnings {
            println!("  - {}", warning);
        }
    }

    if !errors.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
