use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::StringRecord;

use crate::ReportError;

#[derive(Clone, Debug)]
pub struct ReadOptions {
    pub delimiter: u8,
    /// Quote character. The benchmark harness writes `|`-quoted fields.
    pub quote: u8,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'|',
        }
    }
}

/// Benchmark name to measurement, as loaded from one results file.
///
/// Names are unique. When a file names the same benchmark twice, the later row
/// replaces the earlier value (last write wins).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSet {
    values: BTreeMap<String, f64>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_path(path: &Path, options: &ReadOptions) -> Result<Self, ReportError> {
        let file = File::open(path).map_err(|source| ReportError::MissingFile {
            path: path.to_path_buf(),
            source,
        })?;
        let origin = path.display().to_string();
        // The file opened but could not be read (e.g. it is a directory).
        let results =
            Self::from_reader(BufReader::new(file), options, &origin).map_err(|err| match err {
                ReportError::Io(source) => ReportError::MissingFile {
                    path: path.to_path_buf(),
                    source,
                },
                other => other,
            })?;
        log::debug!("loaded {} benchmarks from {origin}", results.len());
        Ok(results)
    }

    /// Parse a results table from any reader.
    ///
    /// `origin` only labels diagnostics (usually the file path).
    pub fn from_reader<R: Read>(
        reader: R,
        options: &ReadOptions,
        origin: &str,
    ) -> Result<Self, ReportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            // The header is skipped by hand so row numbers count it as row 1.
            .has_headers(false)
            // Trailing columns are ignored, so rows may differ in width.
            .flexible(true)
            .from_reader(reader);

        let mut results = ResultSet::new();
        let mut record = StringRecord::new();
        let mut row: u64 = 0;

        loop {
            row += 1;
            let has_record = csv_reader
                .read_record(&mut record)
                .map_err(|e| map_csv_error(e, origin, row))?;
            if !has_record {
                break;
            }
            if row == 1 {
                continue;
            }

            let (name, value) = parse_row(&record).map_err(|reason| ReportError::Parse {
                origin: origin.to_string(),
                row,
                reason,
            })?;
            if let Some(previous) = results.insert(name.to_string(), value) {
                log::debug!(
                    "{origin}: row {row}: '{name}' repeats, replacing {previous} with {value}"
                );
            }
        }

        Ok(results)
    }

    /// Insert a measurement, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Benchmark names in ascending lexicographic order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ResultSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut results = ResultSet::new();
        for (name, value) in iter {
            results.insert(name, value);
        }
        results
    }
}

fn parse_row(record: &StringRecord) -> Result<(&str, f64), String> {
    let Some(name) = record.get(0) else {
        return Err("missing benchmark name".to_string());
    };
    let Some(raw) = record.get(1) else {
        return Err(format!("missing value field for benchmark '{name}'"));
    };
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("value '{raw}' for benchmark '{name}' is not a number: {e}"))?;
    Ok((name, value))
}

fn map_csv_error(err: csv::Error, origin: &str, fallback_row: u64) -> ReportError {
    let reason = err.to_string();
    let pos = err.position().cloned();

    match err.into_kind() {
        csv::ErrorKind::Io(e) => ReportError::Io(e),
        _ => {
            let row = pos.map(|p| p.record() + 1).unwrap_or(fallback_row);
            ReportError::Parse {
                origin: origin.to_string(),
                row,
                reason,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<ResultSet, ReportError> {
        ResultSet::from_reader(input.as_bytes(), &ReadOptions::default(), "fixture.csv")
    }

    #[test]
    fn skips_header_and_ignores_trailing_fields() {
        let results = parse("benchmark,score,notes\nRichards,100.5,ok\nDeltaBlue,42,extra,more\n")
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.get("Richards"), Some(100.5));
        assert_eq!(results.get("DeltaBlue"), Some(42.0));
    }

    #[test]
    fn later_duplicate_row_wins() {
        let results = parse("name,value\nCrypto,1.0\nCrypto,3.5\n").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results.get("Crypto"), Some(3.5));
    }

    #[test]
    fn pipe_quoted_fields_may_contain_delimiters() {
        let results = parse("name,value\n|Navier, Stokes|,|12.25|\n").unwrap();
        assert_eq!(results.get("Navier, Stokes"), Some(12.25));
    }

    #[test]
    fn header_only_and_empty_inputs_yield_empty_sets() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("name,value\n").unwrap().is_empty());
    }

    #[test]
    fn non_numeric_value_reports_origin_and_row() {
        let err = parse("name,value\nRichards,1\nSplay,fast\n").unwrap_err();
        match err {
            ReportError::Parse { origin, row, reason } => {
                assert_eq!(origin, "fixture.csv");
                assert_eq!(row, 3);
                assert!(reason.contains("Splay"), "{reason}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn row_without_value_is_a_parse_error() {
        let err = parse("name,value\nRegExp\n").unwrap_err();
        assert!(
            matches!(err, ReportError::Parse { row: 2, .. }),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn custom_delimiter_and_quote() {
        let options = ReadOptions {
            delimiter: b';',
            quote: b'"',
        };
        let results =
            ResultSet::from_reader("a;b\n\"x;y\";2.5\n".as_bytes(), &options, "semi.csv").unwrap();
        assert_eq!(results.get("x;y"), Some(2.5));
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent-scores.csv");
        let err = ResultSet::from_path(&path, &ReadOptions::default()).unwrap_err();
        match err {
            ReportError::MissingFile { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected missing file error, got {other:?}"),
        }
    }

    #[test]
    fn unreadable_path_is_reported_as_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("original-scores.csv");
        std::fs::create_dir(&path).expect("create directory in place of results file");

        let err = ResultSet::from_path(&path, &ReadOptions::default()).unwrap_err();
        assert!(err.to_string().contains("original-scores.csv"), "{err}");
        match err {
            ReportError::MissingFile { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected missing file error, got {other:?}"),
        }
    }

    #[test]
    fn names_are_sorted() {
        let results: ResultSet = [("b", 1.0), ("a", 2.0), ("c", 3.0)].into_iter().collect();
        assert_eq!(results.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
