use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;

use crate::{run_category, CategoryReport, ReadOptions, Roster};

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    about = "Normalize per-technique benchmark results against a baseline and report mean ratios."
)]
pub struct Args {
    /// TOML roster describing directories, techniques and categories.
    ///
    /// Flags below override the corresponding roster keys.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory containing `<technique>-<category>.csv` result files.
    #[arg(long, value_name = "DIR")]
    results_dir: Option<PathBuf>,

    /// Directory the aggregated `<category>.csv` tables are written to.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Technique every other technique is normalized against.
    #[arg(long)]
    baseline: Option<String>,

    /// Treatment technique, in column order (repeatable; replaces the roster list).
    #[arg(long = "technique")]
    techniques: Vec<String>,

    /// Category to aggregate (repeatable; replaces the roster list).
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Field delimiter of the input files.
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Quote character of the input files.
    #[arg(long, default_value_t = '|')]
    quote: char,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log per-file details.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Serialize)]
struct JsonFailure<'a> {
    category: &'a str,
    error: String,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    categories: &'a [CategoryReport],
    failed: Vec<JsonFailure<'a>>,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    run_with_args(args)
}

pub fn run_with_args(args: Args) -> Result<()> {
    init_logging(args.verbose);

    let roster = build_roster(&args)?;
    let options = ReadOptions {
        delimiter: ascii_byte("--delimiter", args.delimiter)?,
        quote: ascii_byte("--quote", args.quote)?,
    };

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for category in roster.categories() {
        match run_category(&category, &options) {
            Ok(report) => reports.push(report),
            Err(err) => {
                log::error!("{} aggregation failed: {err}", category.name);
                failures.push((category.name, err));
            }
        }
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let written = match args.format {
        OutputFormat::Text => write_text(&mut handle, &reports),
        OutputFormat::Json => {
            for report in &reports {
                for mean in report.summary.iter().filter(|m| !m.mean.is_finite()) {
                    log::warn!(
                        "{} mean for '{}' is {:?}; the JSON report writes it as null",
                        report.category,
                        mean.name,
                        mean.mean
                    );
                }
            }
            let json_report = JsonReport {
                categories: &reports,
                failed: failures
                    .iter()
                    .map(|(category, err)| JsonFailure {
                        category: category.as_str(),
                        error: err.to_string(),
                    })
                    .collect(),
            };
            serde_json::to_writer(&mut handle, &json_report)
                .map_err(io::Error::from)
                .and_then(|()| handle.write_all(b"\n"))
        }
    };
    match written {
        // A downstream reader that exits early (`| head`) is not a failure.
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
        other => other.context("write report to stdout")?,
    }

    if !failures.is_empty() {
        let details: Vec<String> = failures
            .iter()
            .map(|(category, err)| format!("{category}: {err}"))
            .collect();
        anyhow::bail!(
            "{} of {} categories failed\n  {}",
            failures.len(),
            failures.len() + reports.len(),
            details.join("\n  ")
        );
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    // Ignore repeat initialisation when running several times in one process.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .try_init();
}

fn build_roster(args: &Args) -> Result<Roster> {
    let mut roster = match &args.config {
        Some(path) => Roster::load(path)?,
        None => Roster::default(),
    };

    if let Some(dir) = &args.results_dir {
        roster.results_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        roster.output_dir = dir.clone();
    }
    if let Some(baseline) = &args.baseline {
        roster.baseline = baseline.trim().to_string();
    }
    if !args.techniques.is_empty() {
        roster.techniques = args.techniques.iter().map(|t| t.trim().to_string()).collect();
    }
    if !args.categories.is_empty() {
        roster.categories = args.categories.iter().map(|c| c.trim().to_string()).collect();
    }

    if roster.baseline.is_empty() {
        anyhow::bail!("baseline technique name must not be empty");
    }
    if let Some(empty) = roster.techniques.iter().position(|t| t.is_empty()) {
        anyhow::bail!("technique #{} has an empty name", empty + 1);
    }
    if roster.categories.is_empty() {
        anyhow::bail!("no categories to aggregate");
    }

    Ok(roster)
}

fn ascii_byte(flag: &str, c: char) -> Result<u8> {
    if !c.is_ascii() {
        anyhow::bail!("invalid {flag} '{c}' (expected a single ASCII character)");
    }
    Ok(c as u8)
}

fn write_text<W: Write>(out: &mut W, reports: &[CategoryReport]) -> io::Result<()> {
    for report in reports {
        writeln!(out, "{} means:", means_label(&report.category))?;
        for mean in report.summary.iter() {
            writeln!(out, "  {}: {:?} (n={})", mean.name, mean.mean, mean.count)?;
        }
    }
    for report in reports {
        writeln!(
            out,
            "{} benchmarks: {}",
            report.category,
            report.benchmarks.join(",")
        )?;
    }
    out.flush()
}

/// `scores` -> `Score`, `sizes` -> `Size`.
fn means_label(category: &str) -> String {
    let singular = match category.strip_suffix('s') {
        Some(stem) if !stem.is_empty() => stem,
        _ => category,
    };
    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Summary, TreatmentMean};
    use pretty_assertions::assert_eq;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("bench_aggregate").chain(argv.iter().copied()))
            .expect("parse args")
    }

    #[test]
    fn flags_override_roster_defaults() {
        let args = parse(&[
            "--results-dir",
            "raw",
            "--technique",
            "things-js",
            "--category",
            "scores",
        ]);
        let roster = build_roster(&args).unwrap();
        assert_eq!(roster.results_dir, PathBuf::from("raw"));
        assert_eq!(roster.output_dir, PathBuf::from("results"));
        assert_eq!(roster.techniques, vec!["things-js"]);
        assert_eq!(roster.categories, vec!["scores"]);
    }

    #[test]
    fn empty_baseline_is_rejected() {
        let args = parse(&["--baseline", "  "]);
        assert!(build_roster(&args).is_err());
    }

    #[test]
    fn means_label_uses_singular_category() {
        assert_eq!(means_label("scores"), "Score");
        assert_eq!(means_label("sizes"), "Size");
        assert_eq!(means_label("latency"), "Latency");
        assert_eq!(means_label("s"), "S");
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        assert_eq!(ascii_byte("--delimiter", ';').unwrap(), b';');
        assert!(ascii_byte("--delimiter", '¦').is_err());
    }

    #[test]
    fn text_report_lists_means_then_benchmarks() {
        let report = |category: &str, benchmarks: &[&str]| CategoryReport {
            category: category.to_string(),
            output: PathBuf::from(format!("results/{category}.csv")),
            summary: Summary {
                means: vec![
                    TreatmentMean {
                        name: "original".to_string(),
                        mean: 1.0,
                        count: benchmarks.len(),
                    },
                    TreatmentMean {
                        name: "things-js".to_string(),
                        mean: 0.75,
                        count: 1,
                    },
                ],
            },
            benchmarks: benchmarks.iter().map(|b| b.to_string()).collect(),
        };

        let mut out = Vec::new();
        write_text(
            &mut out,
            &[report("scores", &["Crypto", "Richards"]), report("sizes", &["Crypto"])],
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Score means:\n  original: 1.0 (n=2)\n  things-js: 0.75 (n=1)\n\
             Size means:\n  original: 1.0 (n=1)\n  things-js: 0.75 (n=1)\n\
             scores benchmarks: Crypto,Richards\n\
             sizes benchmarks: Crypto\n"
        );
    }
}
