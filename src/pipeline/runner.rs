//! Pipeline runner for composing and executing filter stages.

use super::report::{reduction_percent, PipelineReport, PipelineStatus, StageReport};
use crate::data::LengthSet;
use crate::error::{Result, SieveError};
use crate::filter::{
    apply_with_details, FilterMethod, FilterStageConfig, N50Params, NaturalParams,
};
use crate::profile::summarize_distribution;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline configuration for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Stages to execute, in order.
    pub stages: Vec<FilterStageConfig>,
}

impl PipelineConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(SieveError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(SieveError::from)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(SieveError::from)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(SieveError::from)
    }

    /// Load from a file, reading JSON for `.json` and YAML otherwise.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            _ => Self::from_yaml(&contents),
        }
    }
}

/// Builder for constructing and running filter pipelines.
///
/// Each stage runs once, in order, on the output of the stage before it.
/// The report of the last successful run is kept until the next run starts.
#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<FilterStageConfig>,
    name: String,
    description: Option<String>,
    status: PipelineStatus,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            name: "unnamed".to_string(),
            description: None,
            status: PipelineStatus::Idle,
        }
    }

    /// Create from a config. Stages are checked by [`Pipeline::validate`].
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            stages: config.stages.clone(),
            name: config.name.clone(),
            description: config.description.clone(),
            status: PipelineStatus::Idle,
        }
    }

    /// Set the pipeline name.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Add a stage.
    pub fn stage(mut self, method: FilterMethod) -> Self {
        self.stages.push(method.to_config());
        self
    }

    /// Add a stage in wire form, checked when the pipeline runs.
    pub fn stage_config(mut self, config: FilterStageConfig) -> Self {
        self.stages.push(config);
        self
    }

    /// Keep lengths within fixed inclusive bounds.
    pub fn min_max(self, min_length: Option<u64>, max_length: Option<u64>) -> Self {
        self.stage(FilterMethod::min_max(min_length, max_length))
    }

    /// Remove lengths outside the IQR fences.
    pub fn iqr(self, k: f64) -> Self {
        self.stage(FilterMethod::iqr(k))
    }

    /// Remove lengths more than `threshold` standard deviations from the mean.
    pub fn zscore(self, threshold: f64) -> Self {
        self.stage(FilterMethod::zscore(threshold))
    }

    /// Choose between IQR and z-score from the distribution shape.
    pub fn adaptive(self) -> Self {
        self.stage(FilterMethod::adaptive())
    }

    /// Apply the minimum length that maximises N50.
    pub fn n50_optimize(self, params: N50Params) -> Self {
        self.stage(FilterMethod::N50Optimize(params))
    }

    /// Cut at the natural breakpoint of a fitted length mixture.
    pub fn natural(self, params: NaturalParams) -> Self {
        self.stage(FilterMethod::Natural(params))
    }

    pub fn stages(&self) -> &[FilterStageConfig] {
        &self.stages
    }

    pub fn status(&self) -> &PipelineStatus {
        &self.status
    }

    /// Report of the last completed run.
    pub fn report(&self) -> Option<&PipelineReport> {
        match &self.status {
            PipelineStatus::Completed(report) => Some(report.as_ref()),
            PipelineStatus::Idle => None,
        }
    }

    /// Convert to config for serialization.
    pub fn to_config(&self, description: Option<&str>) -> PipelineConfig {
        PipelineConfig {
            name: self.name.clone(),
            description: description
                .map(String::from)
                .or_else(|| self.description.clone()),
            stages: self.stages.clone(),
        }
    }

    /// Parse every stage, failing on the first invalid one.
    ///
    /// Unknown methods keep their [`SieveError::UnsupportedMethod`] error;
    /// bad parameters become [`SieveError::Configuration`] with the 1-based
    /// stage number.
    pub fn validate(&self) -> Result<Vec<FilterMethod>> {
        self.stages
            .iter()
            .enumerate()
            .map(|(i, config)| {
                FilterMethod::from_config(config).map_err(|e| match e {
                    SieveError::UnsupportedMethod(_) => e,
                    other => SieveError::Configuration {
                        stage: i + 1,
                        reason: other.to_string(),
                    },
                })
            })
            .collect()
    }

    /// Run the pipeline and keep its report.
    ///
    /// Any previous report is discarded before the run starts.
    pub fn run(&mut self, input: &LengthSet) -> Result<LengthSet> {
        self.status = PipelineStatus::Idle;
        let (filtered, report) = self.execute(input)?;
        self.status = PipelineStatus::Completed(Box::new(report));
        Ok(filtered)
    }

    /// Run the pipeline without touching its stored state.
    pub fn execute(&self, input: &LengthSet) -> Result<(LengthSet, PipelineReport)> {
        let methods = self.validate()?;
        if input.is_empty() {
            return Err(SieveError::InvalidInput(
                "Pipeline input contains no sequences".to_string(),
            ));
        }

        info!(
            pipeline = self.name.as_str(),
            stages = methods.len(),
            sequences = input.len();
            "pipeline started"
        );

        let mut current = input.clone();
        let mut stages = Vec::with_capacity(methods.len());
        for (i, method) in methods.iter().enumerate() {
            if current.is_empty() {
                warn!(stage = i + 1, method = method.name(); "stage input is empty");
            }
            let outcome = apply_with_details(&current, method).map_err(|e| {
                SieveError::Pipeline(format!("Stage {} ({}) failed: {}", i + 1, method, e))
            })?;

            let before = current.len();
            let after = outcome.filtered.len();
            info!(
                stage = i + 1,
                method = method.name(),
                before = before,
                after = after;
                "stage finished"
            );
            stages.push(StageReport {
                stage: i + 1,
                method: method.name().to_string(),
                params: method.params(),
                sequences_before: before,
                sequences_after: after,
                reduction_percent: reduction_percent(before, after),
                process_details: outcome.details,
            });
            current = outcome.filtered;
        }

        let report = PipelineReport {
            name: self.name.clone(),
            description: self.description.clone(),
            input_sequences: input.len(),
            output_sequences: current.len(),
            input_length: input.total_length(),
            output_length: current.total_length(),
            total_reduction_percent: reduction_percent(input.len(), current.len()),
            stages,
            before: summarize_distribution(input.lengths()),
            after: summarize_distribution(current.lengths()),
        };

        info!(
            pipeline = self.name.as_str(),
            input = report.input_sequences,
            output = report.output_sequences,
            reduction_percent = report.total_reduction_percent;
            "pipeline completed"
        );
        Ok((current, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{length_set_from, mixture_set};
    use crate::filter::apply;
    use serde_json::{json, Map};

    fn sample() -> LengthSet {
        let mut lengths: Vec<u64> = (1..=200).map(|i| 400 + i * 7).collect();
        lengths.extend([20, 35, 60, 15000, 42000]);
        length_set_from(&lengths).unwrap()
    }

    #[test]
    fn test_pipeline_builder() {
        let pipeline = Pipeline::new()
            .name("test")
            .min_max(Some(100), None)
            .iqr(1.5)
            .adaptive();

        let config = pipeline.to_config(Some("Test pipeline"));
        assert_eq!(config.stages.len(), 3);
        assert_eq!(config.stages[1].method, "iqr");
        assert_eq!(config.description.as_deref(), Some("Test pipeline"));
    }

    #[test]
    fn test_composition_matches_sequential_filters() {
        let input = sample();
        let a = FilterMethod::min_max(Some(100), None);
        let b = FilterMethod::zscore(2.5);

        let mut pipeline = Pipeline::new().stage(a.clone()).stage(b.clone());
        let piped = pipeline.run(&input).unwrap();

        let manual = apply(&apply(&input, &a).unwrap(), &b).unwrap();
        assert_eq!(piped, manual);
    }

    #[test]
    fn test_report_counts() {
        let input = sample();
        let mut pipeline = Pipeline::new().name("counts").min_max(Some(100), Some(10000));
        let output = pipeline.run(&input).unwrap();
        assert_eq!(output.len(), 200);

        let report = pipeline.report().unwrap();
        assert_eq!(report.input_sequences, 205);
        assert_eq!(report.output_sequences, 200);
        assert_eq!(report.stages.len(), 1);
        let stage = &report.stages[0];
        assert_eq!(stage.sequences_before, 205);
        assert_eq!(stage.sequences_after, 200);
        assert!((stage.reduction_percent - 500.0 / 205.0).abs() < 1e-9);
        assert_eq!(stage.params["min_length"], json!(100));
    }

    #[test]
    fn test_rerun_resets_report() {
        let input = sample();
        let mut pipeline = Pipeline::new().min_max(Some(100), None);
        pipeline.run(&input).unwrap();
        pipeline.run(&input).unwrap();
        assert_eq!(pipeline.report().unwrap().stages.len(), 1);

        assert!(pipeline.run(&LengthSet::empty()).is_err());
        assert!(!pipeline.status().is_completed());
        assert!(pipeline.report().is_none());
    }

    #[test]
    fn test_invalid_stage_rejected_before_running() {
        let mut params = Map::new();
        params.insert("k".to_string(), json!(25.0));
        let mut pipeline = Pipeline::new()
            .min_max(Some(100), None)
            .stage_config(FilterStageConfig::new("iqr", params));

        let err = pipeline.run(&sample()).unwrap_err();
        assert!(matches!(err, SieveError::Configuration { stage: 2, .. }));
        assert!(pipeline.report().is_none());

        let unknown = Pipeline::new().stage_config(FilterStageConfig::new("kmeans", Map::new()));
        assert!(matches!(
            unknown.validate(),
            Err(SieveError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn test_empty_intermediate_stage_passes_through() {
        let input = sample();
        let mut pipeline = Pipeline::new().min_max(Some(100_000), None).zscore(2.5);
        let output = pipeline.run(&input).unwrap();
        assert!(output.is_empty());
        let report = pipeline.report().unwrap();
        assert_eq!(report.stages[1].sequences_before, 0);
        assert!(report.stages[1].process_details.is_passthrough());
        assert_eq!(report.total_reduction_percent, 100.0);
    }

    #[test]
    fn test_pipeline_config_yaml() {
        let pipeline = Pipeline::new()
            .name("example")
            .min_max(Some(200), None)
            .natural(NaturalParams::default());

        let config = pipeline.to_config(Some("Example pipeline"));
        let yaml = config.to_yaml().unwrap();
        let loaded = PipelineConfig::from_yaml(&yaml).unwrap();
        assert_eq!(loaded, config);

        let json = config.to_json().unwrap();
        assert_eq!(PipelineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_config_file_formats() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("pipeline.yaml");
        std::fs::write(
            &yaml_path,
            "name: files\nstages:\n  - method: iqr\n    params:\n      k: 2.0\n  - method: adaptive\n",
        )
        .unwrap();
        let config = PipelineConfig::from_file(&yaml_path).unwrap();
        assert_eq!(config.stages.len(), 2);
        assert!(config.stages[1].params.is_empty());

        let json_path = dir.path().join("pipeline.json");
        std::fs::write(&json_path, config.to_json().unwrap()).unwrap();
        assert_eq!(PipelineConfig::from_file(&json_path).unwrap(), config);
    }

    #[test]
    fn test_natural_stage_report_carries_diagnostics() {
        let input = mixture_set(&[(500, 200.0, 20.0), (500, 2000.0, 200.0)], 42).unwrap();
        let mut pipeline = Pipeline::new().natural(NaturalParams::default());
        pipeline.run(&input).unwrap();
        let report = pipeline.report().unwrap();
        let json = serde_json::to_value(report).unwrap();
        let details = &json["stages"][0]["process_details"]["natural_breakpoint_details"];
        assert!(details["selected_cutoff"].is_u64());
        assert!(details["components"].as_array().unwrap().len() >= 2);
    }
}
