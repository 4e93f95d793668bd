use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// A declared input file does not exist, could not be opened, or could not be read.
    #[error("results file {} could not be read: {source}", path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A data row could not be turned into a `(name, value)` pair.
    #[error("{origin}: row {row}: {reason}")]
    Parse {
        origin: String,
        row: u64,
        reason: String,
    },
    /// A column had no benchmark with a defined ratio, so its mean has no denominator.
    #[error("treatment '{treatment}' has no benchmarks with a defined ratio")]
    EmptyDenominator { treatment: String },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("row '{benchmark}' has {actual} ratio columns but {expected} column names were given")]
    ColumnMismatch {
        benchmark: String,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
