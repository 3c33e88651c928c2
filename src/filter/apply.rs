//! Dispatch from a [`FilterMethod`] to the filter that implements it.

use super::adaptive::select_adaptive;
use super::details::{FilterOutcome, ProcessDetails};
use super::length::{filter_within, iqr_thresholds, zscore_thresholds, Thresholds};
use super::method::FilterMethod;
use super::params::{N50Params, NaturalParams};
use crate::breakpoint::analyze_breakpoints;
use crate::data::LengthSet;
use crate::error::{Result, SieveError};
use crate::optimize::{find_optimal_cutoff, optimize_with_retention};
use crate::profile::{histogram, DEFAULT_BINS};
use log::{debug, warn};
use serde_json::{Map, Value};

/// Filter `set` with `method`, discarding the details.
pub fn apply(set: &LengthSet, method: &FilterMethod) -> Result<LengthSet> {
    apply_with_details(set, method).map(|outcome| outcome.filtered)
}

/// Filter `set` by method name and raw parameters.
///
/// Unknown names fail with [`SieveError::UnsupportedMethod`].
pub fn apply_named(set: &LengthSet, method: &str, params: &Map<String, Value>) -> Result<FilterOutcome> {
    let method = FilterMethod::parse(method, params)?;
    apply_with_details(set, &method)
}

/// Filter `set` with `method` and record how the result was reached.
///
/// An empty set passes through. The natural filter also passes its input
/// through when no breakpoint is found or the mixture fit fails.
pub fn apply_with_details(set: &LengthSet, method: &FilterMethod) -> Result<FilterOutcome> {
    method.validate()?;
    if set.is_empty() {
        return Ok(FilterOutcome::passthrough(
            method.name(),
            set,
            "Input contains no sequences".to_string(),
        ));
    }

    let outcome = match method {
        FilterMethod::Adaptive(_) => {
            let choice = select_adaptive(set.lengths());
            let mut outcome = threshold_filter(set, &choice.delegate())?;
            outcome.details.method = method.name().to_string();
            outcome.details.reasoning = Some(choice.reason.clone());
            outcome.details.adaptive_details = Some(choice);
            outcome
        }
        FilterMethod::N50Optimize(params) => n50_filter(set, params)?,
        FilterMethod::Natural(params) => natural_filter(set, params)?,
        _ => threshold_filter(set, method)?,
    };

    debug!(
        method = method.name(),
        before = outcome.details.sequences_before,
        after = outcome.details.sequences_after;
        "filter applied"
    );
    Ok(outcome)
}

fn threshold_filter(set: &LengthSet, method: &FilterMethod) -> Result<FilterOutcome> {
    let (thresholds, reasoning) = match method {
        FilterMethod::MinMax(p) => (
            Thresholds::new(p.min_length, p.max_length),
            "Fixed length bounds".to_string(),
        ),
        FilterMethod::Iqr(p) => (
            iqr_thresholds(set.lengths(), p.k),
            format!("Tukey fences at {} interquartile ranges beyond Q1 and Q3", p.k),
        ),
        FilterMethod::Zscore(p) => (
            zscore_thresholds(set.lengths(), p.threshold),
            format!("Lengths within {} standard deviations of the mean", p.threshold),
        ),
        other => {
            return Err(SieveError::InvalidParameter(format!(
                "'{}' is not a threshold filter",
                other.name()
            )))
        }
    };

    let filtered = filter_within(set, &thresholds);
    let mut details = ProcessDetails::new(method.name(), set, &filtered);
    details.outliers = Some(thresholds.outliers(set.lengths()));
    details.thresholds = Some(thresholds);
    details.histogram = Some(histogram(set.lengths(), DEFAULT_BINS));
    details.reasoning = Some(reasoning);
    Ok(FilterOutcome { filtered, details })
}

fn n50_filter(set: &LengthSet, params: &N50Params) -> Result<FilterOutcome> {
    let search = if params.uses_retention() {
        optimize_with_retention(
            set.lengths(),
            params.min_sequence_pct.unwrap_or(0.0),
            params.min_length_pct.unwrap_or(0.0),
        )?
    } else {
        find_optimal_cutoff(set.lengths(), params.min_cutoff, params.max_cutoff, params.step)?
    };

    let thresholds = Thresholds::new(Some(search.cutoff), None);
    let filtered = filter_within(set, &thresholds);
    let mut details = ProcessDetails::new("n50_optimize", set, &filtered);
    details.reasoning = Some(if search.improved() {
        format!(
            "Minimum length {} raises N50 from {:.0} to {:.0}",
            search.cutoff, search.initial_n50, search.n50
        )
    } else {
        format!("No cutoff improves on the unfiltered N50 of {:.0}", search.initial_n50)
    });
    details.thresholds = Some(thresholds);
    details.histogram = Some(histogram(set.lengths(), DEFAULT_BINS));
    details.n50_details = Some(search);
    Ok(FilterOutcome { filtered, details })
}

fn natural_filter(set: &LengthSet, params: &NaturalParams) -> Result<FilterOutcome> {
    let analysis = match analyze_breakpoints(
        set.lengths(),
        &params.mixture_config(),
        &params.breakpoint_config(),
    ) {
        Ok(analysis) => analysis,
        Err(SieveError::NumericalFit(reason)) => {
            warn!(reason = reason.as_str(); "mixture fit failed, keeping all sequences");
            return Ok(FilterOutcome::passthrough(
                "natural",
                set,
                format!("Mixture fit failed: {}", reason),
            ));
        }
        Err(e) => return Err(e),
    };

    let Some(cutoff) = analysis.selected_cutoff else {
        let reason = if analysis.insufficient_data {
            format!("Too few sequences ({}) to fit a mixture", set.len())
        } else {
            format!(
                "No natural breakpoint between {} component(s)",
                analysis.component_count
            )
        };
        let mut outcome = FilterOutcome::passthrough("natural", set, reason);
        outcome.details.natural_breakpoint_details = Some(Box::new(analysis));
        return Ok(outcome);
    };

    let thresholds = Thresholds::new(Some(cutoff), None);
    let filtered = filter_within(set, &thresholds);
    let mut details = ProcessDetails::new("natural", set, &filtered);
    details.reasoning = Some(format!(
        "Breakpoint at {} between {} components using the {} rule",
        cutoff, analysis.component_count, analysis.method_used
    ));
    details.thresholds = Some(thresholds);
    details.natural_breakpoint_details = Some(Box::new(analysis));
    Ok(FilterOutcome { filtered, details })
}
