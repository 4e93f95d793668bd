//! Which result files make up each category run.
//!
//! The benchmark harness names its outputs `<technique>-<category>.csv`; a
//! [`Roster`] captures that convention and resolves it into explicit
//! [`CategoryConfig`]s, which is all [`crate::run_category`] needs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// One labelled result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub label: String,
    pub path: PathBuf,
}

impl Source {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

/// Everything needed to aggregate one benchmark category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryConfig {
    pub name: String,
    pub baseline: Source,
    /// Treatments in column order.
    pub treatments: Vec<Source>,
    pub output: PathBuf,
}

impl CategoryConfig {
    /// Column labels, baseline first.
    pub fn column_names(&self) -> Vec<&str> {
        std::iter::once(self.baseline.label.as_str())
            .chain(self.treatments.iter().map(|t| t.label.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Roster {
    pub results_dir: PathBuf,
    pub output_dir: PathBuf,
    pub baseline: String,
    pub techniques: Vec<String>,
    pub categories: Vec<String>,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            output_dir: PathBuf::from("results"),
            baseline: "original".to_string(),
            techniques: vec![
                "flash-freeze".to_string(),
                "things-js".to_string(),
                "disclosure".to_string(),
            ],
            categories: vec!["scores".to_string(), "sizes".to_string()],
        }
    }
}

impl Roster {
    /// Load a roster from a TOML file. Keys left out keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read roster {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parse roster {}", path.display()))
    }

    pub fn categories(&self) -> Vec<CategoryConfig> {
        self.categories
            .iter()
            .map(|category| self.category(category))
            .collect()
    }

    pub fn category(&self, category: &str) -> CategoryConfig {
        let source = |technique: &str| {
            Source::new(
                technique,
                self.results_dir.join(format!("{technique}-{category}.csv")),
            )
        };
        CategoryConfig {
            name: category.to_string(),
            baseline: source(&self.baseline),
            treatments: self.techniques.iter().map(|t| source(t)).collect(),
            output: self.output_dir.join(format!("{category}.csv")),
        }
    }
}
