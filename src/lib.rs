//! Review Harvest Library
//!
//! Browser-driven scraping of employee reviews into a fixed-schema dataset.

pub mod accumulator;
pub mod browser;
pub mod config;
pub mod credentials;
pub mod dom;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod navigator;
pub mod session;
pub mod storage;
pub mod types;

pub use error::ScrapeError;
pub use types::*;
