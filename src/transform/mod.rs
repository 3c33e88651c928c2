//! Length transforms applied before mixture fitting.
//!
//! Contig length distributions are heavily right-skewed; fitting Gaussian
//! components on a Box-Cox or log scale gives far better separated modes.

mod box_cox;

pub use box_cox::{box_cox_lambda, box_cox_value, LAMBDA_LIMIT};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SieveError;

/// Transform family applied to lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransformKind {
    /// Box-Cox power transform with maximum-likelihood lambda.
    #[default]
    #[serde(rename = "box-cox", alias = "boxcox")]
    BoxCox,
    /// `ln(x + 1)`.
    #[serde(rename = "log")]
    Log,
    /// Identity.
    #[serde(rename = "none")]
    None,
}

impl TransformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::BoxCox => "box-cox",
            TransformKind::Log => "log",
            TransformKind::None => "none",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformKind {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "box-cox" | "boxcox" => Ok(TransformKind::BoxCox),
            "log" => Ok(TransformKind::Log),
            "none" => Ok(TransformKind::None),
            other => Err(SieveError::InvalidParameter(format!(
                "Unknown transform '{}': expected box-cox, log or none",
                other
            ))),
        }
    }
}

/// Parameters needed to move values between original and transformed space.
///
/// `offset` is added to every input before transforming so that Box-Cox and
/// log always see strictly positive values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformParams {
    pub kind: TransformKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda: Option<f64>,
    pub offset: f64,
}

impl TransformParams {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            kind: TransformKind::None,
            lambda: None,
            offset: 0.0,
        }
    }

    /// `ln(x + 1)`.
    pub fn log1p() -> Self {
        Self {
            kind: TransformKind::Log,
            lambda: None,
            offset: 1.0,
        }
    }

    /// Box-Cox with a fixed lambda and offset.
    pub fn box_cox(lambda: f64, offset: f64) -> Self {
        Self {
            kind: TransformKind::BoxCox,
            lambda: Some(lambda),
            offset,
        }
    }

    /// Map an original-space value into transformed space.
    pub fn forward(&self, value: f64) -> f64 {
        match self.kind {
            TransformKind::BoxCox => box_cox_value(value + self.offset, self.lambda.unwrap_or(0.0)),
            TransformKind::Log => (value + self.offset).ln(),
            TransformKind::None => value,
        }
    }

    /// Map a transformed value back into original space.
    ///
    /// Lambda near zero uses the log limit of Box-Cox. Values beyond the
    /// transform's image map to `f64::MAX` rather than infinity.
    pub fn inverse(&self, value: f64) -> f64 {
        let original = match self.kind {
            TransformKind::BoxCox => {
                let lambda = self.lambda.unwrap_or(0.0);
                if lambda.abs() < 1e-8 {
                    value.exp() - self.offset
                } else {
                    (lambda * value + 1.0).max(0.0).powf(1.0 / lambda) - self.offset
                }
            }
            TransformKind::Log => value.exp() - self.offset,
            TransformKind::None => value,
        };
        original.min(f64::MAX)
    }
}

/// Transform lengths for mixture fitting.
///
/// Box-Cox shifts the data by `|min| + 1` when the minimum is not positive,
/// estimates lambda by maximum likelihood, and pulls extreme lambdas
/// (`|lambda| > 3`) back to 0 (log) or 0.5. If lambda cannot be estimated the
/// transform falls back to `ln(x + 1)`.
pub fn transform(lengths: &[u64], kind: TransformKind) -> (Vec<f64>, TransformParams) {
    let values: Vec<f64> = lengths.iter().map(|&x| x as f64).collect();
    transform_values(&values, kind)
}

/// [`transform`] over arbitrary real values.
pub fn transform_values(values: &[f64], kind: TransformKind) -> (Vec<f64>, TransformParams) {
    let params = match kind {
        TransformKind::None => TransformParams::identity(),
        TransformKind::Log => {
            info!(kind = "log", offset = 1.0; "applying log1p transform");
            TransformParams::log1p()
        }
        TransformKind::BoxCox => fit_box_cox(values),
    };

    let transformed = values.iter().map(|&v| params.forward(v)).collect();
    (transformed, params)
}

/// Inverse of a single transformed value.
pub fn inverse(value: f64, params: &TransformParams) -> f64 {
    params.inverse(value)
}

fn fit_box_cox(values: &[f64]) -> TransformParams {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let offset = if min <= 0.0 { min.abs() + 1.0 } else { 0.0 };
    let shifted: Vec<f64> = values.iter().map(|v| v + offset).collect();

    match box_cox_lambda(&shifted) {
        Ok(fitted) => {
            let lambda = if fitted.abs() > LAMBDA_LIMIT {
                let limited = if fitted < 0.0 { 0.0 } else { 0.5 };
                warn!(
                    fitted = fitted,
                    limited = limited;
                    "box-cox lambda is extreme, limiting transformation"
                );
                limited
            } else {
                fitted
            };
            info!(kind = "box-cox", lambda = lambda, offset = offset; "applying box-cox transform");
            TransformParams::box_cox(lambda, offset)
        }
        Err(e) => {
            warn!(error:% = e; "box-cox fitting failed, falling back to log transform");
            TransformParams::log1p()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn skewed_lengths() -> Vec<u64> {
        (1..=300u64).map(|i| 50 + i * i / 3).collect()
    }

    #[test]
    fn test_roundtrip_all_kinds() {
        let lengths = skewed_lengths();
        for kind in [TransformKind::BoxCox, TransformKind::Log, TransformKind::None] {
            let (transformed, params) = transform(&lengths, kind);
            assert_eq!(transformed.len(), lengths.len());
            for (&orig, &t) in lengths.iter().zip(transformed.iter()) {
                assert_relative_eq!(params.inverse(t), orig as f64, max_relative = 1e-9);
            }
        }
    }

    #[test]
    fn test_box_cox_lambda_zero_is_log_limit() {
        let params = TransformParams::box_cox(0.0, 0.0);
        assert_relative_eq!(params.forward(100.0), 100f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(params.inverse(100f64.ln()), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inverse_outside_image_stays_finite() {
        // lambda * value + 1 <= 0 has no preimage for negative lambda
        let params = TransformParams::box_cox(-0.5, 0.0);
        assert_eq!(params.inverse(3.0), f64::MAX);
        assert_eq!(TransformParams::log1p().inverse(1000.0), f64::MAX);
        assert!(params.inverse(1.0).is_finite());
    }

    #[test]
    fn test_box_cox_offset_for_non_positive_input() {
        let values = vec![-4.0, 0.0, 3.0, 9.0, 20.0, 55.0];
        let (transformed, params) = transform_values(&values, TransformKind::BoxCox);
        assert_eq!(params.kind, TransformKind::BoxCox);
        assert_relative_eq!(params.offset, 5.0);
        assert!(transformed.iter().all(|v| v.is_finite()));
        for (&orig, &t) in values.iter().zip(transformed.iter()) {
            assert_relative_eq!(params.inverse(t), orig, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_box_cox_falls_back_to_log_on_constant_input() {
        let (_, params) = transform(&[400, 400, 400, 400], TransformKind::BoxCox);
        assert_eq!(params.kind, TransformKind::Log);
        assert_relative_eq!(params.offset, 1.0);
    }

    #[test]
    fn test_box_cox_lambda_stays_within_limit() {
        let (_, params) = transform(&skewed_lengths(), TransformKind::BoxCox);
        let lambda = params.lambda.unwrap();
        assert!(lambda.abs() <= LAMBDA_LIMIT);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("box-cox".parse::<TransformKind>().unwrap(), TransformKind::BoxCox);
        assert_eq!("none".parse::<TransformKind>().unwrap(), TransformKind::None);
        assert!("sqrt".parse::<TransformKind>().is_err());
        let json = serde_json::to_string(&TransformKind::BoxCox).unwrap();
        assert_eq!(json, "\"box-cox\"");
    }
}
