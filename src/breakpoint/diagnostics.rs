//! Supporting views of a breakpoint analysis.

use crate::model::MixtureComponent;
use crate::profile::{find_peaks, gaussian_kde, histogram_auto, linspace, scott_bandwidth};
use crate::transform::TransformParams;
use serde::{Deserialize, Serialize};

/// Number of original-space points in each component curve.
pub const CURVE_POINTS: usize = 200;
/// Number of KDE evaluation points for valley detection.
pub const VALLEY_POINTS: usize = 1000;
/// Relative prominence for peak and valley detection.
pub const RELATIVE_PROMINENCE: f64 = 0.1;

/// A component described in both transformed and original space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSummary {
    pub index: usize,
    pub weight: f64,
    pub mean_transformed: f64,
    pub std_transformed: f64,
    pub mean_original: f64,
    /// Distance in original units from the mean to one transformed std above it.
    pub std_original: f64,
}

impl ComponentSummary {
    pub fn new(index: usize, component: &MixtureComponent, params: &TransformParams) -> Self {
        let mean_original = params.inverse(component.mean);
        let std_original = (params.inverse(component.mean + component.std) - mean_original).abs();
        Self {
            index,
            weight: component.weight,
            mean_transformed: component.mean,
            std_transformed: component.std,
            mean_original,
            std_original,
        }
    }
}

/// Weighted density of one component sampled along original-space lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentCurve {
    #[serde(flatten)]
    pub component: ComponentSummary,
    /// Original-space positions.
    pub x: Vec<f64>,
    /// Weighted density in transformed space at each position.
    pub y: Vec<f64>,
}

/// What a cutoff would keep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteringImpact {
    pub cutoff: u64,
    pub total_contigs: usize,
    pub retained_contigs: usize,
    pub retained_contigs_percent: f64,
    pub total_bp: u64,
    pub retained_bp: u64,
    pub retained_bp_percent: f64,
}

/// Retained counts and bases when keeping lengths `>= cutoff`.
pub fn filtering_impact(lengths: &[u64], cutoff: u64) -> FilteringImpact {
    let total_contigs = lengths.len();
    let total_bp: u64 = lengths.iter().sum();
    let kept = lengths.iter().filter(|&&l| l >= cutoff);
    let retained_contigs = kept.clone().count();
    let retained_bp: u64 = kept.sum();

    FilteringImpact {
        cutoff,
        total_contigs,
        retained_contigs,
        retained_contigs_percent: percent(retained_contigs as f64, total_contigs as f64),
        total_bp,
        retained_bp,
        retained_bp_percent: percent(retained_bp as f64, total_bp as f64),
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        100.0 * part / whole
    } else {
        0.0
    }
}

/// Component curves over [`CURVE_POINTS`] lengths spanning the data.
pub fn component_curves(
    components: &[MixtureComponent],
    params: &TransformParams,
    lengths: &[u64],
) -> Vec<ComponentCurve> {
    let (Some(&min), Some(&max)) = (lengths.iter().min(), lengths.iter().max()) else {
        return Vec::new();
    };
    let x = linspace(min as f64, max as f64, CURVE_POINTS);
    let transformed: Vec<f64> = x.iter().map(|&v| params.forward(v)).collect();

    components
        .iter()
        .enumerate()
        .map(|(index, component)| ComponentCurve {
            component: ComponentSummary::new(index, component, params),
            x: x.clone(),
            y: transformed.iter().map(|&t| component.weighted_pdf(t)).collect(),
        })
        .collect()
}

/// Lengths at prominent peaks of an automatically binned histogram.
///
/// Counts are normalised to a maximum of 1; peaks need a relative
/// prominence of [`RELATIVE_PROMINENCE`] and a width of a tenth of the bins.
pub fn peak_cutoffs(lengths: &[u64]) -> Vec<u64> {
    if lengths.len() < 3 {
        return Vec::new();
    }
    let hist = histogram_auto(lengths);
    let max = hist.counts.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }
    let normalized: Vec<f64> = hist.counts.iter().map(|&c| c as f64 / max as f64).collect();
    let width = hist.n_bins() / 10;

    let mut cutoffs: Vec<u64> = find_peaks(&normalized, RELATIVE_PROMINENCE, width)
        .into_iter()
        .map(|p| hist.bin_centers[p].max(0.0) as u64)
        .collect();
    cutoffs.sort_unstable();
    cutoffs
}

/// Lengths at prominent minima of the Gaussian KDE between min and max.
///
/// The density is normalised to a maximum of 1 before the valleys are
/// located.
pub fn valley_cutoffs(lengths: &[u64]) -> Vec<u64> {
    if lengths.len() < 2 {
        return Vec::new();
    }
    let values: Vec<f64> = lengths.iter().map(|&l| l as f64).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max > min) {
        return Vec::new();
    }

    let grid = linspace(min, max, VALLEY_POINTS);
    let density = gaussian_kde(&values, &grid, scott_bandwidth(&values));
    let peak = density.iter().copied().fold(0.0, f64::max);
    if !(peak > 0.0) {
        return Vec::new();
    }
    let inverted: Vec<f64> = density.iter().map(|d| -d / peak).collect();

    find_peaks(&inverted, RELATIVE_PROMINENCE, 0)
        .into_iter()
        .map(|v| grid[v] as u64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::normal_mixture;
    use approx::assert_relative_eq;

    #[test]
    fn test_filtering_impact() {
        let impact = filtering_impact(&[100, 200, 300, 400], 250);
        assert_eq!(impact.retained_contigs, 2);
        assert_relative_eq!(impact.retained_contigs_percent, 50.0);
        assert_eq!(impact.total_bp, 1000);
        assert_eq!(impact.retained_bp, 700);
        assert_relative_eq!(impact.retained_bp_percent, 70.0);
    }

    #[test]
    fn test_component_summary_in_original_space() {
        let params = TransformParams::log1p();
        let c = MixtureComponent::new(1.0, 1000f64.ln(), 0.5);
        let summary = ComponentSummary::new(0, &c, &params);
        assert_relative_eq!(summary.mean_original, 999.0, epsilon = 1e-9);
        assert_relative_eq!(summary.std_original, 1000.0 * (0.5f64.exp() - 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_summary_outside_transform_image_serializes() {
        // mean + std lands where a negative lambda has no preimage
        let params = TransformParams::box_cox(-0.5, 0.0);
        let c = MixtureComponent::new(0.4, 1.5, 0.5);
        let summary = ComponentSummary::new(1, &c, &params);
        assert!(summary.mean_original.is_finite());
        assert!(summary.std_original.is_finite());

        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("null"));
        let back: ComponentSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index, 1);
        assert!(back.std_original > 1e300);
    }

    #[test]
    fn test_component_curves_span_lengths() {
        let params = TransformParams::identity();
        let comps = [MixtureComponent::new(1.0, 500.0, 50.0)];
        let curves = component_curves(&comps, &params, &[100, 900]);
        assert_eq!(curves.len(), 1);
        assert_eq!(curves[0].x.len(), CURVE_POINTS);
        assert_relative_eq!(curves[0].x[0], 100.0);
        assert_relative_eq!(curves[0].x[CURVE_POINTS - 1], 900.0);
        assert!(component_curves(&comps, &params, &[]).is_empty());
    }

    #[test]
    fn test_valley_between_modes() {
        let lengths = normal_mixture(&[(500, 1000.0, 100.0), (500, 5000.0, 300.0)], 4);
        let valleys = valley_cutoffs(&lengths);
        assert!(!valleys.is_empty());
        assert!(valleys.iter().any(|&v| v > 1300 && v < 4500), "valleys = {:?}", valleys);
    }

    #[test]
    fn test_peak_near_mode() {
        let lengths = normal_mixture(&[(2000, 3000.0, 300.0)], 8);
        let peaks = peak_cutoffs(&lengths);
        assert!(peaks.iter().any(|&p| p > 2500 && p < 3500), "peaks = {:?}", peaks);
        assert!(peaks.windows(2).all(|w| w[0] <= w[1]));
        assert!(peak_cutoffs(&[5, 6]).is_empty());
    }
}
