use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{Result, ScrapeError};
use crate::parser::{self, Extraction, Field, Markers};
use crate::store::Store;

/// CSV name used when exporting every fetched tool regardless of category.
pub const ALL_TOOLS: &str = "all";

#[derive(Debug, Default)]
pub struct ExportReport {
    pub path: Option<PathBuf>,
    pub rows: usize,
    /// Written, but with sections missing.
    pub partial: Vec<(String, Vec<Field>)>,
    /// Left out, with the reason.
    pub skipped: Vec<(String, String)>,
}

pub fn header(markers: &Markers) -> Vec<&'static str> {
    if markers.has_date() {
        vec!["Tool", "Description", "Date", "Features", "Use Cases"]
    } else {
        vec!["Tool", "Description", "Features", "Use Cases"]
    }
}

/// Write the header, then one row per tool that has a description.
/// Tools without one (or without a raw record) are reported, not fatal.
pub fn write_summary<W: Write>(
    writer: W,
    entries: Vec<(String, Result<String>)>,
    markers: &Markers,
) -> Result<ExportReport> {
    let extracted: Vec<(String, Result<Extraction>)> = entries
        .into_par_iter()
        .map(|(tool, raw)| {
            let extraction = raw.map(|text| parser::extract(&text, markers));
            (tool, extraction)
        })
        .collect();

    let mut out = csv::Writer::from_writer(writer);
    out.write_record(header(markers))?;

    let mut report = ExportReport::default();
    for (tool, extraction) in extracted {
        let extraction = match extraction {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("Skipping {}: {}", tool, e);
                report.skipped.push((tool, e.to_string()));
                continue;
            }
        };

        let record = match extraction {
            Extraction::Complete(record) => record,
            Extraction::Partial { record, missing } => {
                report.partial.push((tool.clone(), missing));
                record
            }
            Extraction::Unusable(reason) => {
                warn!("Description for {} not found ({})", tool, reason);
                report.skipped.push((tool, reason.to_string()));
                continue;
            }
        };

        let mut row = vec![tool, record.description.unwrap_or_default()];
        if markers.has_date() {
            row.push(record.date.unwrap_or_default());
        }
        row.push(record.features.join(" "));
        row.push(record.use_cases.join(" "));
        out.write_record(&row)?;
        report.rows += 1;
    }

    out.flush().map_err(|e| ScrapeError::Csv(e.into()))?;
    Ok(report)
}

/// `csv/<category>.csv` from the tools listed for the category.
pub fn export_category(store: &Store, category: &str, markers: &Markers) -> Result<ExportReport> {
    let tools = store.read_category(category)?;
    export_tools(store, category, tools, markers)
}

/// `csv/all.csv` from every raw record in the store.
pub fn export_store(store: &Store, markers: &Markers) -> Result<ExportReport> {
    let tools = store.list_raw_tools()?;
    export_tools(store, ALL_TOOLS, tools, markers)
}

fn export_tools(
    store: &Store,
    name: &str,
    tools: Vec<String>,
    markers: &Markers,
) -> Result<ExportReport> {
    let entries: Vec<(String, Result<String>)> = tools
        .into_iter()
        .map(|tool| {
            let raw = store.read_raw(&tool);
            (tool, raw)
        })
        .collect();

    let path = store.csv_path(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ScrapeError::io(parent, e))?;
    }
    let file = File::create(&path).map_err(|e| ScrapeError::io(&path, e))?;

    let mut report = write_summary(file, entries, markers)?;
    info!(
        "Wrote {} rows to {} ({} skipped)",
        report.rows,
        path.display(),
        report.skipped.len()
    );
    report.path = Some(path);
    Ok(report)
}
