//! Audit payload describing what a filter did.

use super::adaptive::AdaptiveChoice;
use super::length::Thresholds;
use crate::breakpoint::BreakpointAnalysis;
use crate::data::LengthSet;
use crate::optimize::N50Search;
use crate::profile::{Histogram, Outliers};
use serde::{Deserialize, Serialize};

/// Diagnostics recorded for one application of a filter.
///
/// Method-specific sections are only present for the method that produced
/// them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessDetails {
    pub method: String,
    pub sequences_before: usize,
    pub sequences_after: usize,
    pub removed: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thresholds: Option<Thresholds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outliers: Option<Outliers>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<Histogram>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptive_details: Option<AdaptiveChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n50_details: Option<N50Search>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_breakpoint_details: Option<Box<BreakpointAnalysis>>,
    /// Set when the filter kept its input unchanged because it could not
    /// decide on a cutoff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passthrough_reason: Option<String>,
}

impl ProcessDetails {
    pub(crate) fn new(method: &str, before: &LengthSet, after: &LengthSet) -> Self {
        Self {
            method: method.to_string(),
            sequences_before: before.len(),
            sequences_after: after.len(),
            removed: before.len() - after.len(),
            ..Self::default()
        }
    }

    /// Whether the input was passed through without filtering.
    pub fn is_passthrough(&self) -> bool {
        self.passthrough_reason.is_some()
    }
}

/// Filtered sequences and the details of how they were chosen.
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub filtered: LengthSet,
    pub details: ProcessDetails,
}

impl FilterOutcome {
    pub(crate) fn passthrough(method: &str, input: &LengthSet, reason: String) -> Self {
        let mut details = ProcessDetails::new(method, input, input);
        details.passthrough_reason = Some(reason);
        Self {
            filtered: input.clone(),
            details,
        }
    }
}
