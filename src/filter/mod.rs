//! Length filters and the method dispatcher.
//!
//! Every filter takes a [`LengthSet`](crate::data::LengthSet) and returns a
//! new one; inputs are never modified.

mod adaptive;
mod apply;
mod details;
mod length;
mod method;
pub mod params;

pub use adaptive::{select_adaptive, AdaptiveChoice, HEAVY_SKEW_LIMIT, KURTOSIS_LIMIT, SKEW_LIMIT};
pub use apply::{apply, apply_named, apply_with_details};
pub use details::{FilterOutcome, ProcessDetails};
pub use length::{filter_by_length, filter_iqr, filter_zscore, Thresholds};
pub use method::{FilterMethod, FilterStageConfig, METHOD_NAMES};
pub use params::{
    AdaptiveParams, IqrParams, MinMaxParams, N50Params, NaturalParams, ZscoreParams,
};
