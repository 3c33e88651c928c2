//! Threshold filters over sequence lengths.

use crate::data::LengthSet;
use crate::profile::{iqr_fences, zscore_fences, Fences, Outliers};
use serde::{Deserialize, Serialize};

/// Inclusive bounds applied by a threshold filter.
///
/// `None` means the side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub min_length: Option<f64>,
    pub max_length: Option<f64>,
}

impl Thresholds {
    pub fn new(min_length: Option<u64>, max_length: Option<u64>) -> Self {
        Self {
            min_length: min_length.map(|v| v as f64),
            max_length: max_length.map(|v| v as f64),
        }
    }

    /// Check whether a length lies inside the bounds.
    pub fn contains(&self, length: u64) -> bool {
        let value = length as f64;
        self.min_length.map_or(true, |min| value >= min)
            && self.max_length.map_or(true, |max| value <= max)
    }

    /// Split the lengths outside the bounds into short and long outliers.
    pub fn outliers(&self, lengths: &[u64]) -> Outliers {
        let mut outliers = Outliers::default();
        for &length in lengths {
            let value = length as f64;
            if self.min_length.is_some_and(|min| value < min) {
                outliers.lower.push(length);
            } else if self.max_length.is_some_and(|max| value > max) {
                outliers.upper.push(length);
            }
        }
        outliers
    }
}

/// Lengths are whole numbers, so the lower fence is truncated to the largest
/// length it still admits.
impl From<Fences> for Thresholds {
    fn from(fences: Fences) -> Self {
        Self {
            min_length: Some(fences.lower.floor()).filter(|v| *v > 0.0),
            max_length: Some(fences.upper).filter(|v| v.is_finite()),
        }
    }
}

/// Keep sequences with `min_length <= length <= max_length`.
///
/// Applying the same bounds twice yields the same set.
pub fn filter_by_length(set: &LengthSet, min_length: Option<u64>, max_length: Option<u64>) -> LengthSet {
    filter_within(set, &Thresholds::new(min_length, max_length))
}

/// Keep sequences inside the Tukey fences at `k` interquartile ranges.
pub fn filter_iqr(set: &LengthSet, k: f64) -> LengthSet {
    filter_within(set, &iqr_thresholds(set.lengths(), k))
}

/// Keep sequences within `threshold` standard deviations of the mean.
pub fn filter_zscore(set: &LengthSet, threshold: f64) -> LengthSet {
    filter_within(set, &zscore_thresholds(set.lengths(), threshold))
}

pub(crate) fn iqr_thresholds(lengths: &[u64], k: f64) -> Thresholds {
    iqr_fences(lengths, k).into()
}

pub(crate) fn zscore_thresholds(lengths: &[u64], threshold: f64) -> Thresholds {
    let fences = zscore_fences(lengths, threshold);
    // Zero spread collapses both fences onto the mean
    if fences.lower == fences.upper {
        return Thresholds {
            min_length: Some(fences.lower),
            max_length: Some(fences.upper),
        };
    }
    fences.into()
}

pub(crate) fn filter_within(set: &LengthSet, thresholds: &Thresholds) -> LengthSet {
    set.retain_lengths(|length| thresholds.contains(length))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(lengths: &[u64]) -> LengthSet {
        crate::data::synthetic::length_set_from(lengths).unwrap()
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let s = set(&[50, 100, 150, 200, 250]);
        let filtered = filter_by_length(&s, Some(100), Some(200));
        assert_eq!(filtered.lengths(), &[100, 150, 200]);
        assert_eq!(filter_by_length(&s, None, None), s);
        assert_eq!(filter_by_length(&s, Some(300), None).len(), 0);
    }

    #[test]
    fn test_filter_by_length_is_idempotent() {
        let s = set(&[10, 500, 999, 1000, 1001, 40000]);
        let once = filter_by_length(&s, Some(500), Some(1000));
        let twice = filter_by_length(&once, Some(500), Some(1000));
        assert_eq!(once, twice);
        assert_eq!(once.ids(), &["contig_2", "contig_3", "contig_4"]);
    }

    #[test]
    fn test_iqr_removes_extreme_length() {
        let s = set(&[1, 2, 3, 4, 5, 100]);
        let thresholds = iqr_thresholds(s.lengths(), 1.5);
        assert_eq!(thresholds.min_length, None);
        assert!((thresholds.max_length.unwrap() - 8.5).abs() < 1e-9);
        let filtered = filter_iqr(&s, 1.5);
        assert_eq!(filtered.lengths(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_fractional_lower_fence_is_truncated() {
        let t = Thresholds::from(Fences {
            lower: 2.3,
            upper: 9.0,
        });
        assert_eq!(t.min_length, Some(2.0));
        assert!(t.contains(2));
        assert!(!t.contains(1));

        // Q1 = 10, Q3 = 10.25, so the lower fence sits at 9.625
        let s = set(&[9, 10, 10, 10, 10, 10, 11, 12]);
        let filtered = filter_iqr(&s, 1.5);
        assert_eq!(filtered.lengths(), &[9, 10, 10, 10, 10, 10]);
    }

    #[test]
    fn test_zscore_without_spread_keeps_everything() {
        let s = set(&[700; 8]);
        assert_eq!(filter_zscore(&s, 2.5), s);
    }

    #[test]
    fn test_zscore_drops_far_values() {
        let mut lengths = vec![1000; 30];
        lengths.push(90000);
        let s = set(&lengths);
        let filtered = filter_zscore(&s, 2.5);
        assert_eq!(filtered.len(), 30);
        assert!(!filtered.contains("contig_31"));
    }

    #[test]
    fn test_outlier_split() {
        let t = Thresholds::new(Some(10), Some(20));
        let outliers = t.outliers(&[5, 10, 15, 20, 25, 1]);
        assert_eq!(outliers.lower, vec![5, 1]);
        assert_eq!(outliers.upper, vec![25]);
    }
}
