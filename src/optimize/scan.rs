//! How assembly metrics respond to a range of minimum-length cutoffs.

use super::n50::SortedLengths;
use crate::error::{Result, SieveError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Metric tracked by [`sliding_window_analysis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssemblyMetric {
    #[default]
    N50,
    L50,
}

impl fmt::Display for AssemblyMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyMetric::N50 => write!(f, "n50"),
            AssemblyMetric::L50 => write!(f, "l50"),
        }
    }
}

impl FromStr for AssemblyMetric {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "n50" => Ok(AssemblyMetric::N50),
            "l50" => Ok(AssemblyMetric::L50),
            other => Err(SieveError::InvalidParameter(format!(
                "Unknown metric '{}': expected n50 or l50",
                other
            ))),
        }
    }
}

/// Metric value at one cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowPoint {
    pub cutoff: u64,
    pub value: f64,
}

/// Evaluate `metric` at cutoffs `min, min + window, ...` below the maximum.
pub fn sliding_window_analysis(
    lengths: &[u64],
    window: u64,
    metric: AssemblyMetric,
) -> Result<Vec<WindowPoint>> {
    if window == 0 {
        return Err(SieveError::InvalidParameter(
            "Window size must be at least 1".to_string(),
        ));
    }
    let (Some(&min), Some(&max)) = (lengths.iter().min(), lengths.iter().max()) else {
        return Ok(Vec::new());
    };

    let sorted = SortedLengths::new(lengths);
    let mut points = Vec::new();
    let mut cutoff = min;
    while cutoff < max {
        let (n50, l50) = sorted.n50_l50_at(cutoff);
        let value = match metric {
            AssemblyMetric::N50 => n50,
            AssemblyMetric::L50 => l50 as f64,
        };
        points.push(WindowPoint { cutoff, value });
        cutoff += window;
    }
    Ok(points)
}

/// Assembly metrics after applying one minimum-length cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteringEffect {
    pub cutoff: u64,
    pub n50: f64,
    pub l50: usize,
    pub sequence_count: usize,
    pub total_length: u64,
    pub percent_sequences_kept: f64,
    pub percent_total_length_kept: f64,
}

/// Metrics for each cutoff, in the order given.
pub fn simulate_filtering_effect(lengths: &[u64], cutoffs: &[u64]) -> Vec<FilteringEffect> {
    let sorted = SortedLengths::new(lengths);
    let total_count = lengths.len();
    let total_length: u64 = lengths.iter().sum();

    cutoffs
        .iter()
        .map(|&cutoff| {
            let kept = sorted.kept(cutoff);
            let (n50, l50) = sorted.n50_l50_at(cutoff);
            let kept_length: u64 = kept.iter().sum();
            FilteringEffect {
                cutoff,
                n50,
                l50,
                sequence_count: kept.len(),
                total_length: kept_length,
                percent_sequences_kept: percent(kept.len() as f64, total_count as f64),
                percent_total_length_kept: percent(kept_length as f64, total_length as f64),
            }
        })
        .collect()
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        100.0 * part / whole
    } else {
        0.0
    }
}
