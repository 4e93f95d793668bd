use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::{AggregatedRow, ReportError};

/// Running `(sum, count)` of defined ratios per column.
///
/// Each column is averaged over the rows where *that* column is defined, so
/// two treatments may be averaged over different benchmark subsets. A failure
/// in one treatment never removes a benchmark from another treatment's mean.
#[derive(Debug, Clone)]
pub struct SummaryTable {
    columns: Vec<ColumnTotal>,
}

#[derive(Debug, Clone)]
struct ColumnTotal {
    name: String,
    sum: f64,
    count: usize,
}

impl SummaryTable {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            columns: names
                .iter()
                .map(|name| ColumnTotal {
                    name: name.as_ref().to_string(),
                    sum: 0.0,
                    count: 0,
                })
                .collect(),
        }
    }

    pub fn observe(&mut self, row: &AggregatedRow) -> Result<(), ReportError> {
        if row.ratios.len() != self.columns.len() {
            return Err(ReportError::ColumnMismatch {
                benchmark: row.benchmark.clone(),
                expected: self.columns.len(),
                actual: row.ratios.len(),
            });
        }
        for (column, ratio) in self.columns.iter_mut().zip(&row.ratios) {
            if let Some(value) = ratio.value() {
                column.sum += value;
                column.count += 1;
            }
        }
        Ok(())
    }

    /// Divide every column by its own count.
    ///
    /// Fails on the first column with no defined ratio at all.
    pub fn finish(self) -> Result<Summary, ReportError> {
        let mut means = Vec::with_capacity(self.columns.len());
        for column in self.columns {
            if column.count == 0 {
                return Err(ReportError::EmptyDenominator {
                    treatment: column.name,
                });
            }
            means.push(TreatmentMean {
                mean: column.sum / column.count as f64,
                name: column.name,
                count: column.count,
            });
        }
        Ok(Summary { means })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreatmentMean {
    pub name: String,
    /// Not finite when a baseline measurement was zero. JSON has no encoding
    /// for that, so `serde_json` writes it as `null`.
    pub mean: f64,
    /// Number of benchmarks that contributed to `mean`.
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Summary {
    pub means: Vec<TreatmentMean>,
}

impl Summary {
    pub fn get(&self, name: &str) -> Option<&TreatmentMean> {
        self.means.iter().find(|m| m.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TreatmentMean> {
        self.means.iter()
    }
}

/// Write `rows` as a CSV table and summarize them in the same pass.
///
/// `names` labels the ratio columns, baseline first. The header row is
/// `benchmark,<names...>`; undefined ratios are written as empty fields.
pub fn write_aggregated<W: Write, S: AsRef<str>>(
    writer: W,
    rows: &[AggregatedRow],
    names: &[S],
) -> Result<Summary, ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut table = SummaryTable::new(names);

    let mut header = Vec::with_capacity(names.len() + 1);
    header.push("benchmark");
    header.extend(names.iter().map(|n| n.as_ref()));
    csv_writer.write_record(&header)?;

    let mut fields: Vec<String> = Vec::with_capacity(names.len() + 1);
    for row in rows {
        table.observe(row)?;
        fields.clear();
        fields.push(row.benchmark.clone());
        fields.extend(row.ratios.iter().map(|ratio| ratio.to_string()));
        csv_writer.write_record(&fields)?;
    }
    csv_writer.flush()?;

    table.finish()
}

/// [`write_aggregated`] into a file, creating its parent directory if needed.
pub fn write_aggregated_to_path<S: AsRef<str>>(
    destination: &Path,
    rows: &[AggregatedRow],
    names: &[S],
) -> Result<Summary, ReportError> {
    let write_error = |source: std::io::Error| ReportError::Write {
        path: destination.to_path_buf(),
        source,
    };

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    let file = File::create(destination).map_err(write_error)?;

    write_aggregated(BufWriter::new(file), rows, names).map_err(|err| match err {
        ReportError::Io(source) => write_error(source),
        ReportError::Csv(err) => match err.into_kind() {
            csv::ErrorKind::Io(source) => write_error(source),
            other => ReportError::Write {
                path: destination.to_path_buf(),
                source: std::io::Error::other(format!("{other:?}")),
            },
        },
        other => other,
    })
}
