//! Reports produced by a pipeline run.

use crate::filter::ProcessDetails;
use crate::profile::DistributionSummary;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// What one stage did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    /// 1-based position in the pipeline.
    pub stage: usize,
    pub method: String,
    pub params: Map<String, Value>,
    pub sequences_before: usize,
    pub sequences_after: usize,
    pub reduction_percent: f64,
    pub process_details: ProcessDetails,
}

/// Summary of a completed pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_sequences: usize,
    pub output_sequences: usize,
    pub input_length: u64,
    pub output_length: u64,
    pub total_reduction_percent: f64,
    pub stages: Vec<StageReport>,
    /// Distribution of the input lengths.
    pub before: DistributionSummary,
    /// Distribution of the surviving lengths.
    pub after: DistributionSummary,
}

impl PipelineReport {
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Percentage of `before` removed to reach `after`.
pub(crate) fn reduction_percent(before: usize, after: usize) -> f64 {
    if before == 0 {
        0.0
    } else {
        100.0 * before.saturating_sub(after) as f64 / before as f64
    }
}

/// Lifecycle of a [`Pipeline`](super::Pipeline).
#[derive(Debug, Clone, Default)]
pub enum PipelineStatus {
    /// No completed run; also the state after a failed run.
    #[default]
    Idle,
    Completed(Box<PipelineReport>),
}

impl PipelineStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineStatus::Completed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction_percent() {
        assert_eq!(reduction_percent(200, 150), 25.0);
        assert_eq!(reduction_percent(10, 10), 0.0);
        assert_eq!(reduction_percent(0, 0), 0.0);
    }
}
