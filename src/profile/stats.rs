//! Descriptive and assembly statistics over sequence lengths.
//!
//! Quartiles use linear interpolation between order statistics, so
//! `[1, 2, 3, 4, 5, 100]` yields Q1 = 2.25 and Q3 = 4.75. Standard deviation
//! is the population form (divide by n).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Basic summary of a length collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasicStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    /// Sum of all lengths.
    pub total: f64,
    pub count: usize,
}

/// Quartiles and interquartile range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
    pub iqr: f64,
}

/// Lower and upper length fences. Values inside `[lower, upper]` are kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fences {
    pub lower: f64,
    /// Infinite when the data is too small to bound.
    pub upper: f64,
}

impl Fences {
    /// Fences that keep every length.
    pub fn unbounded() -> Self {
        Self {
            lower: 0.0,
            upper: f64::INFINITY,
        }
    }

    /// Check whether a length lies inside the fences (inclusive).
    pub fn contains(&self, length: u64) -> bool {
        let value = length as f64;
        value >= self.lower && value <= self.upper
    }
}

/// Lengths flagged below and above a set of fences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outliers {
    pub lower: Vec<u64>,
    pub upper: Vec<u64>,
}

impl Outliers {
    /// Total number of flagged values.
    pub fn len(&self) -> usize {
        self.lower.len() + self.upper.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty() && self.upper.is_empty()
    }
}

/// Full statistical profile of a length collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LengthProfile {
    pub basic: BasicStats,
    pub quartiles: Quartiles,
    pub n50: f64,
    pub l50: usize,
    pub skewness: f64,
    pub kurtosis: f64,
}

impl std::fmt::Display for LengthProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Length Profile")?;
        writeln!(f, "  Sequences: {}", self.basic.count)?;
        writeln!(f, "  Total bp:  {:.0}", self.basic.total)?;
        writeln!(f, "  Min:       {:.0}", self.basic.min)?;
        writeln!(f, "  Max:       {:.0}", self.basic.max)?;
        writeln!(f, "  Mean:      {:.1}", self.basic.mean)?;
        writeln!(f, "  Median:    {:.1}", self.basic.median)?;
        writeln!(f, "  Std Dev:   {:.1}", self.basic.std_dev)?;
        writeln!(
            f,
            "  Q1/Q3:     {:.1} / {:.1} (IQR {:.1})",
            self.quartiles.q1, self.quartiles.q3, self.quartiles.iqr
        )?;
        writeln!(f, "  N50:       {:.0}", self.n50)?;
        writeln!(f, "  L50:       {}", self.l50)?;
        writeln!(f, "  Skewness:  {:.3}", self.skewness)?;
        writeln!(f, "  Kurtosis:  {:.3}", self.kurtosis)?;
        Ok(())
    }
}

/// Profile a length collection.
pub fn profile_lengths(lengths: &[u64]) -> LengthProfile {
    LengthProfile {
        basic: basic_stats(lengths),
        quartiles: quartiles(lengths),
        n50: n50(lengths),
        l50: l50(lengths),
        skewness: skewness(lengths),
        kurtosis: kurtosis(lengths),
    }
}

/// Min, max, mean, median, population std, total and count.
///
/// An empty input yields all zeros.
pub fn basic_stats(lengths: &[u64]) -> BasicStats {
    if lengths.is_empty() {
        return BasicStats {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            median: 0.0,
            std_dev: 0.0,
            total: 0.0,
            count: 0,
        };
    }

    let count = lengths.len();
    let total = lengths.iter().map(|&x| x as f64).sum::<f64>();
    let mean = total / count as f64;

    BasicStats {
        min: lengths.iter().copied().min().unwrap_or(0) as f64,
        max: lengths.iter().copied().max().unwrap_or(0) as f64,
        mean,
        median: percentile(&sorted_f64(lengths), 50.0),
        std_dev: population_variance(lengths, mean).sqrt(),
        total,
        count,
    }
}

/// Q1, median, Q3 and IQR with linear interpolation.
pub fn quartiles(lengths: &[u64]) -> Quartiles {
    if lengths.is_empty() {
        return Quartiles {
            q1: 0.0,
            q2: 0.0,
            q3: 0.0,
            iqr: 0.0,
        };
    }
    let sorted = sorted_f64(lengths);
    let q1 = percentile(&sorted, 25.0);
    let q3 = percentile(&sorted, 75.0);
    Quartiles {
        q1,
        q2: percentile(&sorted, 50.0),
        q3,
        iqr: q3 - q1,
    }
}

/// Median length (0.0 for an empty input).
pub fn median(lengths: &[u64]) -> f64 {
    if lengths.is_empty() {
        return 0.0;
    }
    percentile(&sorted_f64(lengths), 50.0)
}

/// N50: the length at which sequences of that length or longer hold at least
/// half of the total bases.
pub fn n50(lengths: &[u64]) -> f64 {
    n50_l50(lengths).0
}

/// L50: the number of longest sequences needed to reach half of the total.
pub fn l50(lengths: &[u64]) -> usize {
    n50_l50(lengths).1
}

/// N50 and L50 in one pass. Empty input gives `(0.0, 0)`.
pub fn n50_l50(lengths: &[u64]) -> (f64, usize) {
    if lengths.is_empty() {
        return (0.0, 0);
    }

    let mut sorted = lengths.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let total: u64 = sorted.iter().sum();
    let half = total as f64 / 2.0;

    let mut running = 0u64;
    for (i, &len) in sorted.iter().enumerate() {
        running += len;
        if running as f64 >= half {
            return (len as f64, i + 1);
        }
    }

    (sorted[sorted.len() - 1] as f64, sorted.len())
}

/// Sample skewness (biased Fisher-Pearson coefficient).
pub fn skewness(lengths: &[u64]) -> f64 {
    let (m2, m3, _) = central_moments(lengths);
    if m2 <= 0.0 {
        return 0.0;
    }
    m3 / m2.powf(1.5)
}

/// Excess kurtosis (Fisher definition, biased).
pub fn kurtosis(lengths: &[u64]) -> f64 {
    let (m2, _, m4) = central_moments(lengths);
    if m2 <= 0.0 {
        return 0.0;
    }
    m4 / (m2 * m2) - 3.0
}

/// IQR fences `[Q1 - k*IQR, Q3 + k*IQR]` with the lower fence floored at 0.
///
/// Fewer than 4 points cannot be bounded and yield unbounded fences.
pub fn iqr_fences(lengths: &[u64], k: f64) -> Fences {
    if lengths.len() < 4 {
        return Fences::unbounded();
    }
    let q = quartiles(lengths);
    Fences {
        lower: (q.q1 - k * q.iqr).max(0.0),
        upper: q.q3 + k * q.iqr,
    }
}

/// Z-score fences `mean ± threshold * std` with the lower fence floored at 0.
///
/// With zero spread every value equals the mean and the fences collapse to it.
pub fn zscore_fences(lengths: &[u64], threshold: f64) -> Fences {
    if lengths.len() < 2 {
        return Fences::unbounded();
    }
    let stats = basic_stats(lengths);
    if stats.std_dev == 0.0 {
        return Fences {
            lower: stats.mean,
            upper: stats.mean,
        };
    }
    Fences {
        lower: (stats.mean - threshold * stats.std_dev).max(0.0),
        upper: stats.mean + threshold * stats.std_dev,
    }
}

/// Values outside the unfloored IQR fences.
pub fn iqr_outliers(lengths: &[u64], k: f64) -> Outliers {
    if lengths.is_empty() {
        return Outliers::default();
    }
    let q = quartiles(lengths);
    let lower = q.q1 - k * q.iqr;
    let upper = q.q3 + k * q.iqr;
    split_outliers(lengths, lower, upper)
}

/// Values whose z-score magnitude exceeds `threshold`.
pub fn zscore_outliers(lengths: &[u64], threshold: f64) -> Outliers {
    if lengths.len() < 2 {
        return Outliers::default();
    }
    let stats = basic_stats(lengths);
    if stats.std_dev == 0.0 {
        return Outliers::default();
    }
    let lower = stats.mean - threshold * stats.std_dev;
    let upper = stats.mean + threshold * stats.std_dev;
    split_outliers(lengths, lower, upper)
}

/// Values flagged by both the IQR (k = 1.5) and z-score (2.5) rules.
///
/// Returned values are unique and sorted.
pub fn combined_outliers(lengths: &[u64]) -> Outliers {
    if lengths.len() < 4 {
        return Outliers::default();
    }
    let iqr = iqr_outliers(lengths, 1.5);
    let z = zscore_outliers(lengths, 2.5);

    let intersect = |a: &[u64], b: &[u64]| -> Vec<u64> {
        let a: BTreeSet<u64> = a.iter().copied().collect();
        let b: BTreeSet<u64> = b.iter().copied().collect();
        a.intersection(&b).copied().collect()
    };

    Outliers {
        lower: intersect(&iqr.lower, &z.lower),
        upper: intersect(&iqr.upper, &z.upper),
    }
}

/// Percentile of sorted data with linear interpolation (`p` in 0..=100).
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn sorted_f64(lengths: &[u64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = lengths.iter().map(|&x| x as f64).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

fn population_variance(lengths: &[u64], mean: f64) -> f64 {
    lengths
        .iter()
        .map(|&x| {
            let diff = x as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / lengths.len() as f64
}

fn central_moments(lengths: &[u64]) -> (f64, f64, f64) {
    if lengths.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let n = lengths.len() as f64;
    let mean = lengths.iter().map(|&x| x as f64).sum::<f64>() / n;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &x in lengths {
        let d = x as f64 - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

fn split_outliers(lengths: &[u64], lower: f64, upper: f64) -> Outliers {
    Outliers {
        lower: lengths
            .iter()
            .copied()
            .filter(|&x| (x as f64) < lower)
            .collect(),
        upper: lengths
            .iter()
            .copied()
            .filter(|&x| (x as f64) > upper)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basic_stats() {
        let stats = basic_stats(&[100, 200, 300, 400]);
        assert_eq!(stats.count, 4);
        assert_relative_eq!(stats.min, 100.0);
        assert_relative_eq!(stats.max, 400.0);
        assert_relative_eq!(stats.mean, 250.0);
        assert_relative_eq!(stats.median, 250.0);
        assert_relative_eq!(stats.total, 1000.0);
        // Population std of [100,200,300,400] = sqrt(12500)
        assert_relative_eq!(stats.std_dev, 12500f64.sqrt(), epsilon = 1e-10);
    }

    #[test]
    fn test_empty_inputs_do_not_panic() {
        let stats = basic_stats(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(n50(&[]), 0.0);
        assert_eq!(l50(&[]), 0);
        assert_eq!(quartiles(&[]).iqr, 0.0);
        assert!(combined_outliers(&[]).is_empty());
    }

    #[test]
    fn test_quartiles_linear_interpolation() {
        let q = quartiles(&[1, 2, 3, 4, 5, 100]);
        assert_relative_eq!(q.q1, 2.25, epsilon = 1e-12);
        assert_relative_eq!(q.q2, 3.5, epsilon = 1e-12);
        assert_relative_eq!(q.q3, 4.75, epsilon = 1e-12);
        assert_relative_eq!(q.iqr, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_n50_l50_known_values() {
        // Sorted desc: 10, 8, 6, 4, 2; total 30, half 15; 10+8 = 18 >= 15
        let lengths = [2, 4, 6, 8, 10];
        assert_eq!(n50(&lengths), 8.0);
        assert_eq!(l50(&lengths), 2);
    }

    #[test]
    fn test_l50_bounded_by_count() {
        let datasets: Vec<Vec<u64>> = vec![
            vec![1],
            vec![5, 5, 5, 5],
            vec![1000, 1, 1, 1, 1, 1],
            (1..=200).collect(),
        ];
        for lengths in datasets {
            assert!(l50(&lengths) <= lengths.len());
            assert!(l50(&lengths) >= 1);
        }
    }

    #[test]
    fn test_iqr_outliers_and_fences() {
        let lengths = [1, 2, 3, 4, 5, 100];
        let outliers = iqr_outliers(&lengths, 1.5);
        assert!(outliers.lower.is_empty());
        assert_eq!(outliers.upper, vec![100]);

        let fences = iqr_fences(&lengths, 1.5);
        assert_eq!(fences.lower, 0.0);
        assert_relative_eq!(fences.upper, 8.5, epsilon = 1e-12);
        assert!(fences.contains(5));
        assert!(!fences.contains(100));
    }

    #[test]
    fn test_small_inputs_are_unbounded() {
        let fences = iqr_fences(&[10, 20, 30], 1.5);
        assert!(fences.upper.is_infinite());
        let fences = zscore_fences(&[10], 2.5);
        assert!(fences.upper.is_infinite());
    }

    #[test]
    fn test_zscore_constant_data() {
        let fences = zscore_fences(&[500, 500, 500], 2.5);
        assert_eq!(fences.lower, 500.0);
        assert_eq!(fences.upper, 500.0);
        assert!(fences.contains(500));
        assert!(zscore_outliers(&[500, 500, 500], 2.5).is_empty());
    }

    #[test]
    fn test_combined_requires_both_methods() {
        // 10_000 is extreme under both rules; 60 is only an IQR outlier
        let mut lengths: Vec<u64> = vec![100; 20];
        lengths.extend([95, 105, 98, 102, 60, 10_000]);
        let iqr = iqr_outliers(&lengths, 1.5);
        assert!(iqr.lower.contains(&60));

        let combined = combined_outliers(&lengths);
        assert_eq!(combined.upper, vec![10_000]);
        assert!(!combined.lower.contains(&60));
    }

    #[test]
    fn test_skewness_sign() {
        let mut right: Vec<u64> = vec![100; 50];
        right.extend([5000, 8000, 12000]);
        assert!(skewness(&right) > 2.0);
        assert_eq!(skewness(&[7, 7, 7]), 0.0);
        assert_eq!(kurtosis(&[7, 7, 7]), 0.0);
    }
}
