//! Shape-driven choice between the IQR and z-score filters.

use super::method::FilterMethod;
use super::params::{IqrParams, ZscoreParams};
use crate::profile::{kurtosis, skewness};
use log::info;
use serde::{Deserialize, Serialize};

/// Skewness magnitude above which the IQR filter is used.
pub const SKEW_LIMIT: f64 = 2.0;
/// Skewness magnitude above which the IQR fences are widened.
pub const HEAVY_SKEW_LIMIT: f64 = 4.0;
/// Kurtosis magnitude below which the z-score threshold is widened.
pub const KURTOSIS_LIMIT: f64 = 1.0;

/// The branch taken by the adaptive filter and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveChoice {
    /// `"iqr"` or `"zscore"`.
    pub selected_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    pub skewness: f64,
    pub kurtosis: f64,
    pub reason: String,
}

impl AdaptiveChoice {
    /// The filter the adaptive method delegates to.
    pub fn delegate(&self) -> FilterMethod {
        match self.k {
            Some(k) => FilterMethod::Iqr(IqrParams { k }),
            None => FilterMethod::Zscore(ZscoreParams {
                threshold: self.threshold.unwrap_or(ZscoreParams::default().threshold),
            }),
        }
    }
}

/// Pick the delegate filter from the skewness and kurtosis of `lengths`.
pub fn select_adaptive(lengths: &[u64]) -> AdaptiveChoice {
    let skew = skewness(lengths);
    let kurt = kurtosis(lengths);

    let choice = if skew.abs() > SKEW_LIMIT {
        let k = if skew.abs() > HEAVY_SKEW_LIMIT { 2.0 } else { 1.5 };
        AdaptiveChoice {
            selected_method: "iqr".to_string(),
            k: Some(k),
            threshold: None,
            skewness: skew,
            kurtosis: kurt,
            reason: format!(
                "Skewness {:.3} exceeds {}; IQR fences with k = {} are robust to the long tail",
                skew, SKEW_LIMIT, k
            ),
        }
    } else {
        let threshold = if kurt.abs() < KURTOSIS_LIMIT { 3.0 } else { 2.5 };
        AdaptiveChoice {
            selected_method: "zscore".to_string(),
            k: None,
            threshold: Some(threshold),
            skewness: skew,
            kurtosis: kurt,
            reason: format!(
                "Skewness {:.3} is within {} and kurtosis is {:.3}; z-score fences at {} standard deviations",
                skew, SKEW_LIMIT, kurt, threshold
            ),
        }
    };

    info!(
        selected_method = choice.selected_method.as_str(),
        skewness = skew,
        kurtosis = kurt;
        "adaptive filter branch chosen"
    );
    choice
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::normal_mixture;

    fn long_tail() -> Vec<u64> {
        let mut lengths = vec![500; 95];
        lengths.extend([5000, 8000, 12000, 20000, 50000]);
        lengths
    }

    #[test]
    fn test_skewed_data_routes_to_iqr() {
        let choice = select_adaptive(&long_tail());
        assert!(choice.skewness > SKEW_LIMIT);
        assert_eq!(choice.selected_method, "iqr");
        assert!(choice.k.is_some());
        assert!(matches!(choice.delegate(), FilterMethod::Iqr(_)));
    }

    #[test]
    fn test_heavy_skew_widens_fences() {
        let mut lengths = vec![1000; 199];
        lengths.push(100000);
        let choice = select_adaptive(&lengths);
        assert!(choice.skewness > HEAVY_SKEW_LIMIT);
        assert_eq!(choice.k, Some(2.0));
    }

    #[test]
    fn test_symmetric_data_routes_to_zscore() {
        let lengths = normal_mixture(&[(1000, 5000.0, 500.0)], 3);
        let choice = select_adaptive(&lengths);
        assert_eq!(choice.selected_method, "zscore");
        assert!(choice.kurtosis.abs() < KURTOSIS_LIMIT);
        assert_eq!(choice.threshold, Some(3.0));
        assert_eq!(
            choice.delegate(),
            FilterMethod::Zscore(ZscoreParams { threshold: 3.0 })
        );
    }

    #[test]
    fn test_flat_data_keeps_default_threshold() {
        // Evenly spaced values have excess kurtosis near -1.2
        let lengths: Vec<u64> = (1..=100).map(|i| i * 10).collect();
        let choice = select_adaptive(&lengths);
        assert_eq!(choice.selected_method, "zscore");
        assert_eq!(choice.threshold, Some(2.5));
    }
}
