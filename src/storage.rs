use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use anyhow::{Result, Context};
use serde::Serialize;

use crate::types::{ReviewDataset, COLUMNS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    /// `.json` means JSON, anything else CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}

pub fn save_dataset(path: &Path, dataset: &ReviewDataset, format: OutputFormat) -> Result<()> {
    create_parent_dir(path)?;
    match format {
        OutputFormat::Csv => save_csv(path, dataset),
        OutputFormat::Json => save_json(path, dataset),
    }
}

/// CSV with the header row always present, even for an empty dataset.
pub fn save_csv(path: &Path, dataset: &ReviewDataset) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {:?}", path))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));

    writer.write_record(COLUMNS)
        .context("Failed to write CSV header")?;

    for row in dataset.rows() {
        writer.serialize(&row)
            .context("Failed to write CSV row")?;
    }

    writer.flush()
        .with_context(|| format!("Failed to flush {:?}", path))?;
    Ok(())
}

/// JSON array of row objects; absent values are `null`.
pub fn save_json(path: &Path, dataset: &ReviewDataset) -> Result<()> {
    let json = serde_json::to_string_pretty(&dataset.rows())?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write reviews to {:?}", path))?;
    Ok(())
}

pub fn save_summary<T: Serialize>(path: &Path, summary: &T) -> Result<()> {
    create_parent_dir(path)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, summary)
        .context("Failed to serialize run summary")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn create_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }
    Ok(())
}
