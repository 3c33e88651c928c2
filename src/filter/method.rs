//! The closed set of filter methods and their wire form.

use super::params::{
    parse_params, to_param_map, AdaptiveParams, IqrParams, MinMaxParams, N50Params, NaturalParams,
    ZscoreParams,
};
use crate::error::{Result, SieveError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Names accepted by [`FilterMethod::parse`].
pub const METHOD_NAMES: [&str; 6] = ["min_max", "iqr", "zscore", "adaptive", "n50_optimize", "natural"];

/// One stage as it appears in a pipeline configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStageConfig {
    pub method: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl FilterStageConfig {
    pub fn new(method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

impl From<&FilterMethod> for FilterStageConfig {
    fn from(method: &FilterMethod) -> Self {
        method.to_config()
    }
}

/// A filter method with its typed parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterMethod {
    MinMax(MinMaxParams),
    Iqr(IqrParams),
    Zscore(ZscoreParams),
    Adaptive(AdaptiveParams),
    N50Optimize(N50Params),
    Natural(NaturalParams),
}

impl FilterMethod {
    pub fn min_max(min_length: Option<u64>, max_length: Option<u64>) -> Self {
        FilterMethod::MinMax(MinMaxParams::new(min_length, max_length))
    }

    pub fn iqr(k: f64) -> Self {
        FilterMethod::Iqr(IqrParams { k })
    }

    pub fn zscore(threshold: f64) -> Self {
        FilterMethod::Zscore(ZscoreParams { threshold })
    }

    pub fn adaptive() -> Self {
        FilterMethod::Adaptive(AdaptiveParams {})
    }

    pub fn n50_optimize() -> Self {
        FilterMethod::N50Optimize(N50Params::default())
    }

    pub fn natural() -> Self {
        FilterMethod::Natural(NaturalParams::default())
    }

    /// Wire name of the method.
    pub fn name(&self) -> &'static str {
        match self {
            FilterMethod::MinMax(_) => "min_max",
            FilterMethod::Iqr(_) => "iqr",
            FilterMethod::Zscore(_) => "zscore",
            FilterMethod::Adaptive(_) => "adaptive",
            FilterMethod::N50Optimize(_) => "n50_optimize",
            FilterMethod::Natural(_) => "natural",
        }
    }

    /// Parse a method name and its parameter map, then validate the result.
    pub fn parse(method: &str, params: &Map<String, Value>) -> Result<Self> {
        let parsed = match method.trim().to_ascii_lowercase().as_str() {
            "min_max" => FilterMethod::MinMax(parse_params(method, params)?),
            "iqr" => FilterMethod::Iqr(parse_params(method, params)?),
            "zscore" => FilterMethod::Zscore(parse_params(method, params)?),
            "adaptive" => FilterMethod::Adaptive(parse_params(method, params)?),
            "n50_optimize" => FilterMethod::N50Optimize(parse_params(method, params)?),
            "natural" => FilterMethod::Natural(parse_params(method, params)?),
            _ => return Err(SieveError::UnsupportedMethod(method.to_string())),
        };
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn from_config(config: &FilterStageConfig) -> Result<Self> {
        Self::parse(&config.method, &config.params)
    }

    pub fn to_config(&self) -> FilterStageConfig {
        FilterStageConfig::new(self.name(), self.params())
    }

    /// Parameters as a map, leaving out unset options.
    pub fn params(&self) -> Map<String, Value> {
        match self {
            FilterMethod::MinMax(p) => to_param_map(p),
            FilterMethod::Iqr(p) => to_param_map(p),
            FilterMethod::Zscore(p) => to_param_map(p),
            FilterMethod::Adaptive(p) => to_param_map(p),
            FilterMethod::N50Optimize(p) => to_param_map(p),
            FilterMethod::Natural(p) => to_param_map(p),
        }
    }

    /// Check parameter ranges.
    pub fn validate(&self) -> Result<()> {
        match self {
            FilterMethod::MinMax(p) => p.validate(),
            FilterMethod::Iqr(p) => p.validate(),
            FilterMethod::Zscore(p) => p.validate(),
            FilterMethod::Adaptive(_) => Ok(()),
            FilterMethod::N50Optimize(p) => p.validate(),
            FilterMethod::Natural(p) => p.validate(),
        }
    }
}

impl fmt::Display for FilterMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::TieBreak;
    use serde_json::json;

    #[test]
    fn test_parse_known_methods() {
        for name in METHOD_NAMES {
            let method = FilterMethod::parse(name, &Map::new()).unwrap();
            assert_eq!(method.name(), name);
        }
        let natural = FilterMethod::parse(
            "natural",
            json!({"gmm_method": "intersection"}).as_object().unwrap(),
        )
        .unwrap();
        match natural {
            FilterMethod::Natural(p) => assert_eq!(p.gmm_method, TieBreak::Intersection),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_method_is_unsupported() {
        let err = FilterMethod::parse("percentile", &Map::new()).unwrap_err();
        assert!(matches!(err, SieveError::UnsupportedMethod(ref m) if m == "percentile"));
    }

    #[test]
    fn test_parse_validates_ranges() {
        let params = json!({"min_length": 900, "max_length": 100});
        let err = FilterMethod::parse("min_max", params.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, SieveError::InvalidParameter(_)));
        let params = json!({"threshold": 0});
        assert!(FilterMethod::parse("zscore", params.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_config_roundtrip() {
        let method = FilterMethod::min_max(Some(300), None);
        let config = method.to_config();
        assert_eq!(config.method, "min_max");
        assert_eq!(config.params["min_length"], json!(300));
        assert_eq!(FilterMethod::from_config(&config).unwrap(), method);

        let yaml = "method: iqr\nparams:\n  k: 2.0\n";
        let config: FilterStageConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(FilterMethod::from_config(&config).unwrap(), FilterMethod::iqr(2.0));

        let bare: FilterStageConfig = serde_yaml::from_str("method: adaptive\n").unwrap();
        assert_eq!(FilterMethod::from_config(&bare).unwrap(), FilterMethod::adaptive());
    }
}
