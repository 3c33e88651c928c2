//! Cutoff placement between two adjacent mixture components.

use crate::error::SieveError;
use crate::model::MixtureComponent;
use crate::profile::linspace;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strategy for placing a cutoff between two adjacent components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// Halfway between the two means.
    #[default]
    Midpoint,
    /// Where the two weighted densities are equal.
    Intersection,
    /// First point where the upper component becomes at least as likely.
    Probability,
    /// Minimum of the two-component density between the means.
    Valley,
}

impl TieBreak {
    pub fn as_str(&self) -> &'static str {
        match self {
            TieBreak::Midpoint => "midpoint",
            TieBreak::Intersection => "intersection",
            TieBreak::Probability => "probability",
            TieBreak::Valley => "valley",
        }
    }

    /// All strategies, in declaration order.
    pub fn all() -> [TieBreak; 4] {
        [
            TieBreak::Midpoint,
            TieBreak::Intersection,
            TieBreak::Probability,
            TieBreak::Valley,
        ]
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TieBreak {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "midpoint" => Ok(TieBreak::Midpoint),
            "intersection" => Ok(TieBreak::Intersection),
            "probability" => Ok(TieBreak::Probability),
            "valley" => Ok(TieBreak::Valley),
            other => Err(SieveError::InvalidParameter(format!(
                "Unknown breakpoint method '{}': expected midpoint, intersection, probability or valley",
                other
            ))),
        }
    }
}

/// Cutoff between `lower` and `upper` in transformed space.
///
/// `scan_points` is the grid size for the probability and valley scans.
pub fn pair_cutoff(
    lower: &MixtureComponent,
    upper: &MixtureComponent,
    tie_break: TieBreak,
    scan_points: usize,
) -> f64 {
    let midpoint = 0.5 * (lower.mean + upper.mean);
    match tie_break {
        TieBreak::Midpoint => midpoint,
        TieBreak::Intersection => intersection(lower, upper).unwrap_or(midpoint),
        TieBreak::Probability => linspace(lower.mean, upper.mean, scan_points)
            .into_iter()
            .find(|&x| lower.weighted_pdf(x) <= upper.weighted_pdf(x))
            .unwrap_or(midpoint),
        TieBreak::Valley => linspace(lower.mean, upper.mean, scan_points)
            .into_iter()
            .map(|x| (x, lower.weighted_pdf(x) + upper.weighted_pdf(x)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(x, _)| x)
            .unwrap_or(midpoint),
    }
}

/// Point between the means where the weighted densities cross.
///
/// Equating the two log densities gives `a x^2 + b x + c = 0`. Equal
/// standard deviations reduce it to a linear equation.
fn intersection(lower: &MixtureComponent, upper: &MixtureComponent) -> Option<f64> {
    let (m1, s1, w1) = (lower.mean, lower.std, lower.weight);
    let (m2, s2, w2) = (upper.mean, upper.std, upper.weight);
    if !(s1 > 0.0 && s2 > 0.0 && w1 > 0.0 && w2 > 0.0) {
        return None;
    }

    let v1 = s1 * s1;
    let v2 = s2 * s2;
    let a = 1.0 / (2.0 * v2) - 1.0 / (2.0 * v1);
    let b = m1 / v1 - m2 / v2;
    let c = m2 * m2 / (2.0 * v2) - m1 * m1 / (2.0 * v1) + ((w1 * s2) / (w2 * s1)).ln();

    let (lo, hi) = (m1.min(m2), m1.max(m2));
    let inside = |x: f64| x.is_finite() && lo <= x && x <= hi;

    if a.abs() < 1e-12 {
        if b.abs() < 1e-12 {
            return None;
        }
        return Some(-c / b).filter(|&x| inside(x));
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let first = (-b + root) / (2.0 * a);
    let second = (-b - root) / (2.0 * a);
    [first, second].into_iter().find(|&x| inside(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pair() -> (MixtureComponent, MixtureComponent) {
        (
            MixtureComponent::new(0.5, 0.0, 1.0),
            MixtureComponent::new(0.5, 4.0, 2.0),
        )
    }

    #[test]
    fn test_midpoint() {
        let (lo, hi) = pair();
        assert_relative_eq!(pair_cutoff(&lo, &hi, TieBreak::Midpoint, 1000), 2.0);
    }

    #[test]
    fn test_intersection_equalises_weighted_densities() {
        let (lo, hi) = pair();
        let x = pair_cutoff(&lo, &hi, TieBreak::Intersection, 1000);
        assert!(x > 0.0 && x < 4.0);
        assert_relative_eq!(lo.weighted_pdf(x), hi.weighted_pdf(x), epsilon = 1e-10);
    }

    #[test]
    fn test_intersection_equal_std_shifts_towards_lighter_component() {
        let lo = MixtureComponent::new(0.8, 0.0, 1.0);
        let hi = MixtureComponent::new(0.2, 4.0, 1.0);
        let x = pair_cutoff(&lo, &hi, TieBreak::Intersection, 1000);
        assert!(x > 2.0);
        assert_relative_eq!(lo.weighted_pdf(x), hi.weighted_pdf(x), epsilon = 1e-10);
    }

    #[test]
    fn test_intersection_falls_back_to_midpoint() {
        let lo = MixtureComponent::new(0.5, 0.0, 0.0);
        let hi = MixtureComponent::new(0.5, 4.0, 1.0);
        assert_relative_eq!(pair_cutoff(&lo, &hi, TieBreak::Intersection, 1000), 2.0);
    }

    #[test]
    fn test_probability_finds_crossing() {
        let (lo, hi) = pair();
        let x = pair_cutoff(&lo, &hi, TieBreak::Probability, 1000);
        let exact = pair_cutoff(&lo, &hi, TieBreak::Intersection, 1000);
        // The scan stops on the first grid point at or past the crossing
        assert!(x >= exact && x - exact < 4.0 / 999.0 + 1e-12);
    }

    #[test]
    fn test_valley_is_density_minimum() {
        let (lo, hi) = pair();
        let x = pair_cutoff(&lo, &hi, TieBreak::Valley, 1000);
        let density = |v: f64| lo.weighted_pdf(v) + hi.weighted_pdf(v);
        assert!(density(x) <= density(x - 0.01));
        assert!(density(x) <= density(x + 0.01));
    }

    #[test]
    fn test_parsing() {
        assert_eq!("valley".parse::<TieBreak>().unwrap(), TieBreak::Valley);
        assert!("kmeans".parse::<TieBreak>().is_err());
    }
}
