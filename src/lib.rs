//! Distribution-driven length filtering for genome assembly contigs.
//!
//! This library analyses the length distribution of assembled sequences and
//! removes the ones that do not belong to the assembly, keeping a record of
//! how every cutoff was chosen.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: The id-to-length table (LengthSet) and synthetic generators
//! - **profile**: Length statistics (N50/L50, quartiles, moments) and distribution summaries
//! - **transform**: Box-Cox and log transforms toward normality
//! - **model**: Gaussian mixture fitting with BIC/AIC/LOO or Dirichlet-process component selection
//! - **breakpoint**: Natural cutoffs between fitted mixture components
//! - **optimize**: N50-maximising cutoff search
//! - **filter**: Filter methods and their dispatcher
//! - **pipeline**: Stage composition, execution and reporting
//!
//! # Example
//!
//! ```no_run
//! use contig_sieve::prelude::*;
//!
//! let lengths = LengthSet::from_tsv("lengths.tsv").unwrap();
//!
//! let mut pipeline = Pipeline::new()
//!     .min_max(Some(200), None)
//!     .natural(NaturalParams::default());
//! let filtered = pipeline.run(&lengths).unwrap();
//! println!("{}", pipeline.report().unwrap().to_json().unwrap());
//! # let _ = filtered;
//! ```

pub mod breakpoint;
pub mod data;
pub mod error;
pub mod filter;
pub mod model;
pub mod optimize;
pub mod pipeline;
pub mod profile;
pub mod transform;

mod rng;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::breakpoint::{
        analyze_breakpoints, locate, BreakpointAnalysis, BreakpointConfig, CutoffCandidate,
        CutoffResult, TieBreak,
    };
    pub use crate::data::LengthSet;
    pub use crate::error::{Result, SieveError};
    pub use crate::filter::{
        apply, apply_named, apply_with_details, filter_by_length, filter_iqr, filter_zscore,
        select_adaptive, AdaptiveChoice, FilterMethod, FilterOutcome, FilterStageConfig,
        IqrParams, MinMaxParams, N50Params, NaturalParams, ProcessDetails, ZscoreParams,
    };
    pub use crate::model::{
        fit_mixture, ComponentSelection, MixtureComponent, MixtureConfig, MixtureFit,
    };
    pub use crate::optimize::{
        find_optimal_cutoff, optimize_with_retention, simulate_filtering_effect,
        sliding_window_analysis, AssemblyMetric, N50Search,
    };
    pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineReport, StageReport};
    pub use crate::profile::{
        iqr_fences, l50, median, n50, profile_lengths, quartiles, summarize_distribution,
        zscore_fences, LengthProfile,
    };
    pub use crate::transform::{transform, TransformKind, TransformParams};
}
