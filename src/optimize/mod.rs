//! N50-driven cutoff optimisation.
//!
//! Every search here evaluates minimum-length filters: a cutoff keeps the
//! sequences whose length is at least the cutoff.

mod n50;
mod scan;

pub use n50::{find_optimal_cutoff, optimize_with_retention, N50Search, DEFAULT_STEP};
pub use scan::{
    simulate_filtering_effect, sliding_window_analysis, AssemblyMetric, FilteringEffect,
    WindowPoint,
};
