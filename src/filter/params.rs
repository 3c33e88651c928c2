//! Typed parameters for each filter method.

use crate::breakpoint::{BreakpointConfig, TieBreak};
use crate::error::{Result, SieveError};
use crate::model::{ComponentSelection, MixtureConfig};
use crate::optimize::DEFAULT_STEP;
use crate::transform::TransformKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Largest accepted IQR multiplier or z-score threshold.
const MAX_SPREAD_FACTOR: f64 = 10.0;

/// Parse a parameter map into a typed parameter struct.
pub(crate) fn parse_params<T: DeserializeOwned>(method: &str, params: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(params.clone())).map_err(|e| {
        SieveError::InvalidParameter(format!("invalid parameters for '{}': {}", method, e))
    })
}

/// Convert typed parameters back into a parameter map.
pub(crate) fn to_param_map<T: Serialize>(params: &T) -> Map<String, Value> {
    match serde_json::to_value(params) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn check_spread(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value <= MAX_SPREAD_FACTOR {
        Ok(())
    } else {
        Err(SieveError::InvalidParameter(format!(
            "{} must be in (0, {}], got {}",
            name, MAX_SPREAD_FACTOR, value
        )))
    }
}

fn check_percent(name: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !(0.0..=100.0).contains(&v) => Err(SieveError::InvalidParameter(format!(
            "{} must be within [0, 100], got {}",
            name, v
        ))),
        _ => Ok(()),
    }
}

/// Fixed inclusive length bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinMaxParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
}

impl MinMaxParams {
    pub fn new(min_length: Option<u64>, max_length: Option<u64>) -> Self {
        Self {
            min_length,
            max_length,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(SieveError::InvalidParameter(format!(
                    "min_length ({}) exceeds max_length ({})",
                    min, max
                )));
            }
        }
        Ok(())
    }
}

/// Tukey fences at `k` interquartile ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IqrParams {
    pub k: f64,
}

impl Default for IqrParams {
    fn default() -> Self {
        Self { k: 1.5 }
    }
}

impl IqrParams {
    pub fn validate(&self) -> Result<()> {
        check_spread("k", self.k)
    }
}

/// Mean plus or minus `threshold` standard deviations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZscoreParams {
    pub threshold: f64,
}

impl Default for ZscoreParams {
    fn default() -> Self {
        Self { threshold: 2.5 }
    }
}

impl ZscoreParams {
    pub fn validate(&self) -> Result<()> {
        check_spread("threshold", self.threshold)
    }
}

/// The adaptive method takes no parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdaptiveParams {}

/// N50 cutoff search range and optional retention limits.
///
/// When either retention percentage is given the search stops before the
/// filter would drop below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct N50Params {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_cutoff: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cutoff: Option<u64>,
    pub step: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_sequence_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length_pct: Option<f64>,
}

impl Default for N50Params {
    fn default() -> Self {
        Self {
            min_cutoff: None,
            max_cutoff: None,
            step: DEFAULT_STEP,
            min_sequence_pct: None,
            min_length_pct: None,
        }
    }
}

impl N50Params {
    pub fn validate(&self) -> Result<()> {
        if self.step == 0 {
            return Err(SieveError::InvalidParameter(
                "step must be at least 1".to_string(),
            ));
        }
        if let (Some(min), Some(max)) = (self.min_cutoff, self.max_cutoff) {
            if min >= max {
                return Err(SieveError::InvalidParameter(format!(
                    "min_cutoff ({}) must be below max_cutoff ({})",
                    min, max
                )));
            }
        }
        check_percent("min_sequence_pct", self.min_sequence_pct)?;
        check_percent("min_length_pct", self.min_length_pct)
    }

    /// Whether retention limits are in force.
    pub fn uses_retention(&self) -> bool {
        self.min_sequence_pct.is_some() || self.min_length_pct.is_some()
    }
}

/// Natural breakpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NaturalParams {
    /// Cutoff placement between adjacent components.
    pub gmm_method: TieBreak,
    pub transform: TransformKind,
    pub component_method: ComponentSelection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_components: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoff_floor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoff_ceiling: Option<f64>,
}

impl Default for NaturalParams {
    fn default() -> Self {
        Self {
            gmm_method: TieBreak::Midpoint,
            transform: TransformKind::BoxCox,
            component_method: ComponentSelection::Bic,
            seed: None,
            max_components: None,
            cutoff_floor: None,
            cutoff_ceiling: None,
        }
    }
}

impl NaturalParams {
    pub fn validate(&self) -> Result<()> {
        if self.max_components == Some(0) {
            return Err(SieveError::InvalidParameter(
                "max_components must be at least 1".to_string(),
            ));
        }
        let config = self.breakpoint_config();
        if !(config.cutoff_floor >= 0.0 && config.cutoff_floor <= config.cutoff_ceiling) {
            return Err(SieveError::InvalidParameter(format!(
                "cutoff bounds [{}, {}] are invalid",
                config.cutoff_floor, config.cutoff_ceiling
            )));
        }
        Ok(())
    }

    /// Mixture settings with any overrides applied.
    pub fn mixture_config(&self) -> MixtureConfig {
        let mut config = MixtureConfig::default()
            .with_transform(self.transform)
            .with_selection(self.component_method);
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(max) = self.max_components {
            config = config.with_max_components(max);
        }
        config
    }

    /// Cutoff placement settings with any overrides applied.
    pub fn breakpoint_config(&self) -> BreakpointConfig {
        let defaults = BreakpointConfig::default();
        BreakpointConfig::default()
            .with_tie_break(self.gmm_method)
            .with_bounds(
                self.cutoff_floor.unwrap_or(defaults.cutoff_floor),
                self.cutoff_ceiling.unwrap_or(defaults.cutoff_ceiling),
            )
    }
}
