//! Benchmark result aggregation.
//!
//! Each category (scores, sizes, ...) has one baseline results file and a
//! number of treatment results files, one per code-transformation technique.
//! Every treatment measurement is divided by the baseline measurement for the
//! same benchmark, the combined table is written as CSV, and each column's mean
//! ratio is reported together with the number of benchmarks behind it.
//!
//! A treatment value of `0.0` marks a run that failed upstream. Such entries,
//! like missing ones, produce [`Ratio::Undefined`] and are excluded from that
//! treatment's mean only.

mod aggregate;
pub mod cli;
pub mod config;
mod error;
mod results;
mod summary;

use std::path::PathBuf;

use serde::Serialize;

pub use aggregate::{aggregate, AggregatedRow, Ratio};
pub use config::{CategoryConfig, Roster, Source};
pub use error::ReportError;
pub use results::{ReadOptions, ResultSet};
pub use summary::{
    write_aggregated, write_aggregated_to_path, Summary, SummaryTable, TreatmentMean,
};

/// Outcome of one category run.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: String,
    pub output: PathBuf,
    pub summary: Summary,
    /// Baseline benchmark names in ascending order (the rows of the output table).
    pub benchmarks: Vec<String>,
}

/// Read, normalize, write and summarize one category.
///
/// Any missing file or malformed row aborts the category; nothing is retried.
pub fn run_category(
    config: &CategoryConfig,
    options: &ReadOptions,
) -> Result<CategoryReport, ReportError> {
    log::info!(
        "aggregating {} ({} treatments against {})",
        config.name,
        config.treatments.len(),
        config.baseline.path.display()
    );

    let baseline = ResultSet::from_path(&config.baseline.path, options)?;
    let treatments = config
        .treatments
        .iter()
        .map(|source| ResultSet::from_path(&source.path, options))
        .collect::<Result<Vec<_>, _>>()?;

    let treatment_refs: Vec<&ResultSet> = treatments.iter().collect();
    let rows = aggregate(&baseline, &treatment_refs);
    let summary = write_aggregated_to_path(&config.output, &rows, &config.column_names())?;
    log::info!("wrote {} rows to {}", rows.len(), config.output.display());

    Ok(CategoryReport {
        category: config.name.clone(),
        output: config.output.clone(),
        summary,
        benchmarks: baseline.names().map(str::to_string).collect(),
    })
}
