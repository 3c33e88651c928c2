//! Distribution summaries used for diagnostics and before/after reports.
//!
//! Histograms use equal-width bins over `[min, max]` with the last bin closed.
//! The KDE uses a Gaussian kernel with Scott's bandwidth rule.

use crate::profile::stats::quartiles;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Default number of histogram bins.
pub const DEFAULT_BINS: usize = 50;
/// Default number of KDE evaluation points.
pub const DEFAULT_KDE_POINTS: usize = 1000;

/// Histogram counts with bin edges and centers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bin_edges: Vec<f64>,
    pub bin_centers: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    fn placeholder() -> Self {
        Self {
            bin_edges: vec![0.0],
            bin_centers: vec![0.0],
            counts: vec![0],
        }
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }
}

/// Kernel density curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KdeCurve {
    pub x: Vec<f64>,
    pub density: Vec<f64>,
    pub bandwidth: f64,
}

/// Cumulative length distribution over lengths sorted longest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeDistribution {
    pub lengths: Vec<u64>,
    pub cumulative_sum: Vec<u64>,
    pub cumulative_percent: Vec<f64>,
}

/// Histogram, KDE and cumulative curves of one length collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub histogram: Histogram,
    pub kde: KdeCurve,
    pub cumulative: CumulativeDistribution,
}

/// Build the full distribution summary of a length collection.
pub fn summarize_distribution(lengths: &[u64]) -> DistributionSummary {
    DistributionSummary {
        histogram: histogram(lengths, DEFAULT_BINS),
        kde: kde_curve(lengths, DEFAULT_KDE_POINTS),
        cumulative: cumulative_distribution(lengths),
    }
}

/// Equal-width histogram with `bins` bins.
pub fn histogram(lengths: &[u64], bins: usize) -> Histogram {
    if lengths.is_empty() || bins == 0 {
        return Histogram::placeholder();
    }
    let values: Vec<f64> = lengths.iter().map(|&x| x as f64).collect();
    histogram_f64(&values, bins)
}

/// Histogram with an automatic bin count.
///
/// Uses the larger of the Sturges and Freedman-Diaconis bin counts, falling
/// back to Sturges when the IQR is zero.
pub fn histogram_auto(lengths: &[u64]) -> Histogram {
    if lengths.is_empty() {
        return Histogram::placeholder();
    }
    let n = lengths.len() as f64;
    let min = *lengths.iter().min().unwrap_or(&0) as f64;
    let max = *lengths.iter().max().unwrap_or(&0) as f64;
    let range = max - min;

    let sturges = (n.log2().ceil() as usize + 1).max(1);
    let iqr = quartiles(lengths).iqr;
    let fd_width = 2.0 * iqr * n.powf(-1.0 / 3.0);

    let bins = if range > 0.0 && fd_width > 0.0 {
        let fd = (range / fd_width).ceil() as usize;
        sturges.max(fd)
    } else {
        sturges
    };

    histogram(lengths, bins.min(10_000))
}

pub(crate) fn histogram_f64(values: &[f64], bins: usize) -> Histogram {
    let mut min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        min -= 0.5;
        max += 0.5;
    }
    let width = (max - min) / bins as f64;

    let bin_edges: Vec<f64> = (0..=bins).map(|i| min + width * i as f64).collect();
    let bin_centers: Vec<f64> = bin_edges
        .windows(2)
        .map(|edge| 0.5 * (edge[0] + edge[1]))
        .collect();

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Histogram {
        bin_edges,
        bin_centers,
        counts,
    }
}

/// Gaussian KDE over lengths, evaluated on `points` positions spanning the
/// data range padded by 10% on each side (never below zero).
pub fn kde_curve(lengths: &[u64], points: usize) -> KdeCurve {
    if lengths.len() < 2 || points == 0 {
        return KdeCurve {
            x: vec![0.0],
            density: vec![0.0],
            bandwidth: 0.0,
        };
    }
    let values: Vec<f64> = lengths.iter().map(|&x| x as f64).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let padding = (max - min) * 0.1;
    let x = linspace((min - padding).max(0.0), max + padding, points);
    let bandwidth = scott_bandwidth(&values);
    let density = gaussian_kde(&values, &x, bandwidth);
    KdeCurve {
        x,
        density,
        bandwidth,
    }
}

/// Cumulative sums of lengths sorted longest first, as absolute and percent.
pub fn cumulative_distribution(lengths: &[u64]) -> CumulativeDistribution {
    if lengths.is_empty() {
        return CumulativeDistribution {
            lengths: vec![0],
            cumulative_sum: vec![0],
            cumulative_percent: vec![0.0],
        };
    }
    let mut sorted = lengths.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    let total: u64 = sorted.iter().sum();

    let mut running = 0u64;
    let cumulative_sum: Vec<u64> = sorted
        .iter()
        .map(|&len| {
            running += len;
            running
        })
        .collect();
    let cumulative_percent = cumulative_sum
        .iter()
        .map(|&sum| sum as f64 / total as f64 * 100.0)
        .collect();

    CumulativeDistribution {
        lengths: sorted,
        cumulative_sum,
        cumulative_percent,
    }
}

/// Scott's rule bandwidth: sample std (n - 1) times n^(-1/5).
pub(crate) fn scott_bandwidth(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if n < 2.0 {
        return 1.0;
    }
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let bw = var.sqrt() * n.powf(-0.2);
    if bw > 0.0 {
        bw
    } else {
        1.0
    }
}

/// Evaluate a Gaussian KDE with the given bandwidth at each grid point.
pub(crate) fn gaussian_kde(values: &[f64], grid: &[f64], bandwidth: f64) -> Vec<f64> {
    let norm = 1.0 / (values.len() as f64 * bandwidth * (2.0 * PI).sqrt());
    grid.iter()
        .map(|&x| {
            values
                .iter()
                .map(|&v| {
                    let z = (x - v) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                * norm
        })
        .collect()
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub(crate) fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Local maxima of `signal` whose prominence is at least `min_prominence`
/// and whose width at half prominence spans at least `min_width` samples.
///
/// Plateaus report their middle sample. Returned indices are ascending.
pub fn find_peaks(signal: &[f64], min_prominence: f64, min_width: usize) -> Vec<usize> {
    let n = signal.len();
    if n < 3 {
        return Vec::new();
    }

    let mut peaks = Vec::new();
    let mut i = 1;
    while i < n - 1 {
        if signal[i] > signal[i - 1] {
            let mut ahead = i + 1;
            while ahead < n - 1 && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }

    peaks
        .into_iter()
        .filter(|&peak| {
            let (prominence, left_base, right_base) = peak_prominence(signal, peak);
            if prominence < min_prominence {
                return false;
            }
            min_width == 0
                || peak_width(signal, peak, prominence, left_base, right_base) >= min_width as f64
        })
        .collect()
}

fn peak_prominence(signal: &[f64], peak: usize) -> (f64, usize, usize) {
    let height = signal[peak];

    let mut left_min = height;
    let mut left_base = peak;
    let mut j = peak;
    while j > 0 {
        j -= 1;
        if signal[j] > height {
            break;
        }
        if signal[j] < left_min {
            left_min = signal[j];
            left_base = j;
        }
    }

    let mut right_min = height;
    let mut right_base = peak;
    for (k, &value) in signal.iter().enumerate().skip(peak + 1) {
        if value > height {
            break;
        }
        if value < right_min {
            right_min = value;
            right_base = k;
        }
    }

    (height - left_min.max(right_min), left_base, right_base)
}

fn peak_width(signal: &[f64], peak: usize, prominence: f64, left_base: usize, right_base: usize) -> f64 {
    let reference = signal[peak] - prominence / 2.0;

    let mut left = peak as f64;
    let mut j = peak;
    while j > left_base && signal[j] > reference {
        j -= 1;
    }
    if signal[j] < reference {
        let span = signal[j + 1] - signal[j];
        left = j as f64 + if span > 0.0 { (reference - signal[j]) / span } else { 0.0 };
    } else if j < peak {
        left = j as f64;
    }

    let mut right = peak as f64;
    let mut k = peak;
    while k < right_base && signal[k] > reference {
        k += 1;
    }
    if signal[k] < reference {
        let span = signal[k - 1] - signal[k];
        right = k as f64 - if span > 0.0 { (reference - signal[k]) / span } else { 0.0 };
    } else if k > peak {
        right = k as f64;
    }

    right - left
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_histogram_counts_all_values() {
        let lengths: Vec<u64> = (1..=100).collect();
        let hist = histogram(&lengths, 10);
        assert_eq!(hist.n_bins(), 10);
        assert_eq!(hist.bin_edges.len(), 11);
        assert_eq!(hist.counts.iter().sum::<usize>(), 100);
        // Max value lands in the last (closed) bin
        assert!(hist.counts[9] >= 10);
        assert_relative_eq!(hist.bin_edges[0], 1.0);
        assert_relative_eq!(hist.bin_edges[10], 100.0);
    }

    #[test]
    fn test_histogram_constant_values() {
        let hist = histogram(&[300, 300, 300], 5);
        assert_eq!(hist.counts.iter().sum::<usize>(), 3);
    }

    #[test]
    fn test_histogram_auto_bin_count() {
        let lengths: Vec<u64> = (1..=1000).collect();
        let hist = histogram_auto(&lengths);
        // Sturges gives 11 bins; FD gives more for uniform data
        assert!(hist.n_bins() >= 11);
        assert_eq!(hist.counts.iter().sum::<usize>(), 1000);
    }

    #[test]
    fn test_cumulative_distribution() {
        let cum = cumulative_distribution(&[10, 30, 60]);
        assert_eq!(cum.lengths, vec![60, 30, 10]);
        assert_eq!(cum.cumulative_sum, vec![60, 90, 100]);
        assert_relative_eq!(cum.cumulative_percent[1], 90.0);
    }

    #[test]
    fn test_kde_integrates_to_about_one() {
        let lengths: Vec<u64> = (0..200).map(|i| 1000 + (i % 20) * 10).collect();
        let curve = kde_curve(&lengths, 500);
        let dx = curve.x[1] - curve.x[0];
        let area: f64 = curve.density.iter().sum::<f64>() * dx;
        assert!((area - 1.0).abs() < 0.05, "area = {}", area);
    }

    #[test]
    fn test_find_peaks_bimodal() {
        let x = linspace(0.0, 10.0, 201);
        let signal: Vec<f64> = x
            .iter()
            .map(|&v| (-(v - 2.0).powi(2)).exp() + (-(v - 8.0).powi(2)).exp())
            .collect();
        let peaks = find_peaks(&signal, 0.1, 0);
        assert_eq!(peaks.len(), 2);
        assert_relative_eq!(x[peaks[0]], 2.0, epsilon = 0.06);
        assert_relative_eq!(x[peaks[1]], 8.0, epsilon = 0.06);

        // The valley between them is a peak of the negated signal
        let negated: Vec<f64> = signal.iter().map(|v| -v).collect();
        let valleys = find_peaks(&negated, 0.1, 0);
        assert_eq!(valleys.len(), 1);
        assert_relative_eq!(x[valleys[0]], 5.0, epsilon = 0.06);
    }

    #[test]
    fn test_find_peaks_prominence_filter() {
        // The shoulder at index 3 rises only 0.03 above the dip before it
        let signal = vec![0.0, 1.0, 0.95, 0.98, 0.0];
        assert_eq!(find_peaks(&signal, 0.0, 0), vec![1, 3]);
        assert_eq!(find_peaks(&signal, 0.5, 0), vec![1]);
    }
}
