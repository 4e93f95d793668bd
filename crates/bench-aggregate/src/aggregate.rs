use std::fmt;

use crate::ResultSet;

/// A treatment's measurement relative to the baseline for one benchmark.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ratio {
    Defined(f64),
    /// The treatment has no usable measurement for this benchmark.
    Undefined,
}

impl Ratio {
    pub fn value(self) -> Option<f64> {
        match self {
            Ratio::Defined(value) => Some(value),
            Ratio::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Ratio::Defined(_))
    }
}

impl fmt::Display for Ratio {
    /// Integral values keep a trailing `.0`; undefined ratios render as nothing.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ratio::Defined(value) => write!(f, "{value:?}"),
            Ratio::Undefined => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRow {
    pub benchmark: String,
    /// Baseline identity first, then one ratio per treatment in declared order.
    pub ratios: Vec<Ratio>,
}

/// Normalize every treatment against `baseline`, one row per baseline benchmark
/// in ascending name order.
///
/// A treatment value of exactly `0.0` marks a failed run upstream and is
/// treated like a missing entry.
pub fn aggregate(baseline: &ResultSet, treatments: &[&ResultSet]) -> Vec<AggregatedRow> {
    baseline
        .iter()
        .map(|(name, base)| {
            if base == 0.0 {
                log::warn!("baseline value for '{name}' is zero; its ratios are not finite");
            }
            let mut ratios = Vec::with_capacity(treatments.len() + 1);
            ratios.push(Ratio::Defined(1.0));
            ratios.extend(treatments.iter().map(|treatment| match treatment.get(name) {
                Some(value) if value != 0.0 => Ratio::Defined(value / base),
                _ => Ratio::Undefined,
            }));
            AggregatedRow {
                benchmark: name.to_string(),
                ratios,
            }
        })
        .collect()
}
