//! Statistical profiling of sequence length collections.

mod distribution;
mod stats;

pub use distribution::{
    cumulative_distribution, find_peaks, histogram, histogram_auto, kde_curve,
    summarize_distribution, CumulativeDistribution, DistributionSummary, Histogram, KdeCurve,
    DEFAULT_BINS, DEFAULT_KDE_POINTS,
};
pub(crate) use distribution::{gaussian_kde, linspace, scott_bandwidth};
pub use stats::{
    basic_stats, combined_outliers, iqr_fences, iqr_outliers, kurtosis, l50, median, n50, n50_l50,
    profile_lengths, quartiles, skewness, zscore_fences, zscore_outliers, BasicStats, Fences,
    LengthProfile, Outliers, Quartiles,
};
