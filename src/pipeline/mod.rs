//! Ordered filter stages with a stage-by-stage report.

mod report;
mod runner;

pub use report::{PipelineReport, PipelineStatus, StageReport};
pub use runner::{Pipeline, PipelineConfig};
