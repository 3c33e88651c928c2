//! Gaussian mixture components and mixture densities.

use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, Normal};

/// One Gaussian component of a fitted mixture, in transformed space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixtureComponent {
    /// Mixing weight in (0, 1].
    pub weight: f64,
    pub mean: f64,
    /// Standard deviation (>= 0).
    pub std: f64,
}

impl MixtureComponent {
    pub fn new(weight: f64, mean: f64, std: f64) -> Self {
        Self { weight, mean, std }
    }

    /// Unweighted normal density at `x`.
    ///
    /// A degenerate component (std of zero) has no density anywhere.
    pub fn pdf(&self, x: f64) -> f64 {
        match Normal::new(self.mean, self.std) {
            Ok(normal) if self.std > 0.0 => normal.pdf(x),
            _ => 0.0,
        }
    }

    /// `weight * pdf(x)`.
    pub fn weighted_pdf(&self, x: f64) -> f64 {
        self.weight * self.pdf(x)
    }
}

/// Density of the full mixture at `x`.
pub fn mixture_density(components: &[MixtureComponent], x: f64) -> f64 {
    components.iter().map(|c| c.weighted_pdf(x)).sum()
}

/// Drop components below `threshold` weight and order the rest by mean.
pub fn retain_components(
    components: &[MixtureComponent],
    threshold: f64,
) -> Vec<MixtureComponent> {
    let mut kept: Vec<MixtureComponent> = components
        .iter()
        .copied()
        .filter(|c| c.weight >= threshold)
        .collect();
    kept.sort_by(|a, b| a.mean.total_cmp(&b.mean));
    kept
}

/// Grid points used to look for a valley between two component means.
const MERGE_GRID: usize = 200;

/// Merge adjacent components whose joint density has no valley between them.
///
/// Components are taken in mean order. A pair stays separate only when the
/// pair density somewhere between the two means drops below `dip_ratio`
/// times the lower of its values at the means. Merged components keep the
/// pair's total weight, mean and variance.
pub fn merge_overlapping(
    components: &[MixtureComponent],
    dip_ratio: f64,
) -> Vec<MixtureComponent> {
    let mut merged: Vec<MixtureComponent> = components.to_vec();
    merged.sort_by(|a, b| a.mean.total_cmp(&b.mean));

    while let Some(i) = (0..merged.len().saturating_sub(1))
        .find(|&i| !has_valley(&merged[i], &merged[i + 1], dip_ratio))
    {
        let right = merged.remove(i + 1);
        merged[i] = moment_merge(&merged[i], &right);
    }
    merged
}

fn has_valley(left: &MixtureComponent, right: &MixtureComponent, dip_ratio: f64) -> bool {
    let density = |x: f64| left.weighted_pdf(x) + right.weighted_pdf(x);
    let span = right.mean - left.mean;
    if span <= 0.0 {
        return false;
    }
    let reference = density(left.mean).min(density(right.mean));
    let valley = (1..MERGE_GRID)
        .map(|i| density(left.mean + span * i as f64 / MERGE_GRID as f64))
        .fold(f64::INFINITY, f64::min);
    valley < dip_ratio * reference
}

fn moment_merge(a: &MixtureComponent, b: &MixtureComponent) -> MixtureComponent {
    let weight = a.weight + b.weight;
    if weight <= 0.0 {
        return *a;
    }
    let mean = (a.weight * a.mean + b.weight * b.mean) / weight;
    let second = (a.weight * (a.std.powi(2) + a.mean.powi(2))
        + b.weight * (b.std.powi(2) + b.mean.powi(2)))
        / weight;
    MixtureComponent::new(weight, mean, (second - mean.powi(2)).max(0.0).sqrt())
}

/// `ln(sum(exp(v)))` without overflow.
pub(crate) fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}
