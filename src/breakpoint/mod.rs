//! Natural breakpoint detection between fitted length components.
//!
//! Every adjacent pair of mixture components proposes one cutoff in
//! transformed space. Each proposal is scored by the density of the whole
//! mixture at that point and the lowest-density proposal wins, so a cutoff
//! that sits under a third component's mass is never chosen over a real
//! valley. The winner is mapped back to original lengths, clamped to a
//! configurable range and rounded.

pub mod diagnostics;
pub mod tie_break;

pub use diagnostics::{
    component_curves, filtering_impact, peak_cutoffs, valley_cutoffs, ComponentCurve,
    ComponentSummary, FilteringImpact,
};
pub use tie_break::{pair_cutoff, TieBreak};

use crate::error::Result;
use crate::model::{
    fit_mixture, mixture_density, ComponentSelection, MixtureComponent, MixtureConfig,
    SelectionScores,
};
use crate::profile::{histogram, Histogram, DEFAULT_BINS};
use crate::transform::TransformParams;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Configuration for cutoff placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakpointConfig {
    pub tie_break: TieBreak,
    /// Smallest cutoff that will be recommended, in original units.
    pub cutoff_floor: f64,
    /// Largest cutoff that will be recommended, in original units.
    pub cutoff_ceiling: f64,
    /// Grid size for the probability and valley scans.
    pub scan_points: usize,
}

impl Default for BreakpointConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::Midpoint,
            cutoff_floor: 100.0,
            cutoff_ceiling: 5000.0,
            scan_points: 1000,
        }
    }
}

impl BreakpointConfig {
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_bounds(mut self, floor: f64, ceiling: f64) -> Self {
        self.cutoff_floor = floor;
        self.cutoff_ceiling = ceiling;
        self
    }

    pub fn with_scan_points(mut self, scan_points: usize) -> Self {
        self.scan_points = scan_points;
        self
    }

    fn clamp(&self, value: f64) -> f64 {
        value.max(self.cutoff_floor).min(self.cutoff_ceiling)
    }
}

/// A proposed cutoff between one adjacent pair of components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutoffCandidate {
    /// Index of the lower component of the pair.
    pub pair_index: usize,
    pub method: TieBreak,
    /// Position in transformed space.
    pub transformed: f64,
    /// Position in original units, before clamping.
    pub value: f64,
    /// Full-mixture density at `transformed`.
    pub mixture_density: f64,
}

/// Candidates for every adjacent pair and the recommended cutoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutoffResult {
    pub candidates: Vec<CutoffCandidate>,
    /// Index into `candidates` of the deepest valley.
    pub selected: Option<usize>,
    /// Recommended cutoff in original units, clamped and rounded.
    pub cutoff: Option<u64>,
}

impl CutoffResult {
    fn empty() -> Self {
        Self {
            candidates: Vec::new(),
            selected: None,
            cutoff: None,
        }
    }

    /// The winning candidate.
    pub fn selected_candidate(&self) -> Option<&CutoffCandidate> {
        self.selected.and_then(|i| self.candidates.get(i))
    }
}

/// Recommend a cutoff from components sorted by mean.
///
/// Fewer than two components give no recommendation; callers should keep
/// every sequence.
pub fn locate(
    components: &[MixtureComponent],
    params: &TransformParams,
    config: &BreakpointConfig,
) -> CutoffResult {
    if components.len() < 2 {
        return CutoffResult::empty();
    }

    let candidates: Vec<CutoffCandidate> = components
        .windows(2)
        .enumerate()
        .map(|(pair_index, pair)| {
            let transformed = pair_cutoff(&pair[0], &pair[1], config.tie_break, config.scan_points);
            let candidate = CutoffCandidate {
                pair_index,
                method: config.tie_break,
                transformed,
                value: params.inverse(transformed),
                mixture_density: mixture_density(components, transformed),
            };
            debug!(
                pair = pair_index,
                transformed = candidate.transformed,
                value = candidate.value,
                density = candidate.mixture_density;
                "breakpoint candidate"
            );
            candidate
        })
        .collect();

    let selected = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.value.is_finite() && c.mixture_density.is_finite())
        .fold(None, |best: Option<(usize, f64)>, (i, c)| match best {
            Some((_, d)) if d <= c.mixture_density => best,
            _ => Some((i, c.mixture_density)),
        })
        .map(|(i, _)| i);

    let cutoff = selected.map(|i| config.clamp(candidates[i].value).round().max(0.0) as u64);
    if let (Some(i), Some(cutoff)) = (selected, cutoff) {
        info!(
            method = config.tie_break.as_str(),
            pair = candidates[i].pair_index,
            raw = candidates[i].value,
            cutoff = cutoff;
            "selected natural breakpoint"
        );
    }

    CutoffResult {
        candidates,
        selected,
        cutoff,
    }
}

/// Full natural-breakpoint analysis of a length collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakpointAnalysis {
    pub method_used: TieBreak,
    pub component_selection_method: ComponentSelection,
    pub transform_params: TransformParams,
    pub is_multimodal: bool,
    pub component_count: usize,
    pub insufficient_data: bool,
    pub components: Vec<ComponentSummary>,
    pub candidates: Vec<CutoffCandidate>,
    pub selected_cutoff: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtering_stats: Option<FilteringImpact>,
    pub histogram: Histogram,
    pub component_curves: Vec<ComponentCurve>,
    pub peak_cutoffs: Vec<u64>,
    pub valley_cutoffs: Vec<u64>,
    pub scores: SelectionScores,
}

impl BreakpointAnalysis {
    /// Recommended cutoffs; empty or a single value.
    pub fn recommended(&self) -> Vec<u64> {
        self.selected_cutoff.into_iter().collect()
    }
}

/// Fit a mixture to `lengths`, locate the natural breakpoint and collect
/// diagnostics.
///
/// Mixture fitting failures are returned as errors; fewer than two retained
/// components is not an error and yields no cutoff.
pub fn analyze_breakpoints(
    lengths: &[u64],
    mixture: &MixtureConfig,
    config: &BreakpointConfig,
) -> Result<BreakpointAnalysis> {
    let fit = fit_mixture(lengths, mixture)?;
    let result = locate(&fit.components, &fit.transform_params, config);

    if result.cutoff.is_none() {
        warn!(
            components = fit.components.len(),
            insufficient_data = fit.insufficient_data;
            "no natural breakpoint, fewer than two components"
        );
    }

    let components = fit
        .components
        .iter()
        .enumerate()
        .map(|(i, c)| ComponentSummary::new(i, c, &fit.transform_params))
        .collect();

    Ok(BreakpointAnalysis {
        method_used: config.tie_break,
        component_selection_method: fit.method_used,
        transform_params: fit.transform_params,
        is_multimodal: fit.is_multimodal,
        component_count: fit.components.len(),
        insufficient_data: fit.insufficient_data,
        components,
        filtering_stats: result.cutoff.map(|c| filtering_impact(lengths, c)),
        selected_cutoff: result.cutoff,
        candidates: result.candidates,
        histogram: histogram(lengths, DEFAULT_BINS),
        component_curves: component_curves(&fit.components, &fit.transform_params, lengths),
        peak_cutoffs: peak_cutoffs(lengths),
        valley_cutoffs: valley_cutoffs(lengths),
        scores: fit.scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::normal_mixture;
    use crate::transform::TransformKind;

    #[test]
    fn test_fewer_than_two_components_gives_no_cutoff() {
        let params = TransformParams::identity();
        let config = BreakpointConfig::default();
        assert_eq!(locate(&[], &params, &config).cutoff, None);
        let one = [MixtureComponent::new(1.0, 500.0, 50.0)];
        let result = locate(&one, &params, &config);
        assert!(result.candidates.is_empty());
        assert_eq!(result.cutoff, None);
    }

    #[test]
    fn test_deepest_valley_beats_buried_candidate() {
        // The midpoint of the first pair lies under the heavy middle component
        let components = [
            MixtureComponent::new(0.1, 1000.0, 100.0),
            MixtureComponent::new(0.6, 1300.0, 150.0),
            MixtureComponent::new(0.3, 4000.0, 200.0),
        ];
        let params = TransformParams::identity();
        let result = locate(&components, &params, &BreakpointConfig::default());
        assert_eq!(result.candidates.len(), 2);
        let winner = result.selected_candidate().unwrap();
        assert_eq!(winner.pair_index, 1);
        assert!(result.candidates[0].mixture_density > winner.mixture_density);
        assert_eq!(result.cutoff, Some(2650));
    }

    #[test]
    fn test_cutoff_is_clamped_and_rounded() {
        let components = [
            MixtureComponent::new(0.5, 10.0, 2.0),
            MixtureComponent::new(0.5, 40.0, 2.0),
        ];
        let params = TransformParams::identity();
        let result = locate(&components, &params, &BreakpointConfig::default());
        assert_eq!(result.cutoff, Some(100));
        assert_eq!(result.selected_candidate().unwrap().value, 25.0);

        let wide = [
            MixtureComponent::new(0.5, 1000.0, 10.0),
            MixtureComponent::new(0.5, 20000.0, 10.0),
        ];
        let result = locate(&wide, &params, &BreakpointConfig::default());
        assert_eq!(result.cutoff, Some(5000));

        let relaxed = BreakpointConfig::default().with_bounds(1.0, 1e9);
        let result = locate(&wide, &params, &relaxed);
        assert_eq!(result.cutoff, Some(10500));
    }

    #[test]
    fn test_cutoff_maps_back_through_transform() {
        let params = TransformParams::log1p();
        let components = [
            MixtureComponent::new(0.5, 200f64.ln(), 0.1),
            MixtureComponent::new(0.5, 2000f64.ln(), 0.1),
        ];
        let result = locate(&components, &params, &BreakpointConfig::default());
        // Geometric mean of the two lengths, minus the log1p offset
        let expected = ((200f64 * 2000f64).sqrt() - 1.0).round() as u64;
        assert_eq!(result.cutoff, Some(expected));
    }

    #[test]
    fn test_every_tie_break_lands_between_modes() {
        let lengths = normal_mixture(&[(500, 200.0, 20.0), (500, 2000.0, 200.0)], 42);
        let mixture = MixtureConfig::default().with_n_init(3);
        for tie_break in TieBreak::all() {
            let config = BreakpointConfig::default().with_tie_break(tie_break);
            let analysis = analyze_breakpoints(&lengths, &mixture, &config).unwrap();
            assert!(analysis.is_multimodal);
            assert_eq!(analysis.component_count, 2);
            let cutoff = analysis.selected_cutoff.unwrap();
            assert!(cutoff > 200 && cutoff < 2000, "{}: cutoff = {}", tie_break, cutoff);
            assert_eq!(analysis.method_used, tie_break);
            let stats = analysis.filtering_stats.as_ref().unwrap();
            assert_eq!(stats.cutoff, cutoff);
            assert!(stats.retained_contigs <= lengths.len());
            assert_eq!(analysis.component_curves.len(), analysis.component_count);
        }
    }

    #[test]
    fn test_component_methods_agree_on_bimodal_lengths() {
        for seed in [42, 7] {
            let lengths = normal_mixture(&[(500, 200.0, 20.0), (500, 2000.0, 200.0)], seed);
            for selection in [
                ComponentSelection::Bic,
                ComponentSelection::Aic,
                ComponentSelection::Loo,
                ComponentSelection::Dirichlet,
            ] {
                let mixture = MixtureConfig::default().with_selection(selection);
                let analysis =
                    analyze_breakpoints(&lengths, &mixture, &BreakpointConfig::default()).unwrap();
                assert_eq!(analysis.component_count, 2, "seed {} {}", seed, selection);
                assert_eq!(analysis.component_selection_method, selection);
                let cutoff = analysis.selected_cutoff.unwrap();
                assert!(cutoff > 200 && cutoff < 2000, "seed {} {}: {}", seed, selection, cutoff);
            }
        }
    }

    #[test]
    fn test_insufficient_data_analysis() {
        let lengths: Vec<u64> = (1..=20).map(|i| i * 50).collect();
        let mixture = MixtureConfig::default().with_transform(TransformKind::Log);
        let analysis =
            analyze_breakpoints(&lengths, &mixture, &BreakpointConfig::default()).unwrap();
        assert!(analysis.insufficient_data);
        assert_eq!(analysis.selected_cutoff, None);
        assert!(analysis.recommended().is_empty());
        assert!(analysis.filtering_stats.is_none());
    }
}
