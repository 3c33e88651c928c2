//! Information criteria for choosing the number of mixture components.
//!
//! For a one-dimensional mixture with k components the free parameters are
//! k means, k variances and k - 1 weights, so p = 3k - 1.
//!
//! - AIC = -2 * log_likelihood + 2p
//! - BIC = -2 * log_likelihood + p * ln(n)
//! - LOO = AIC + 2 * ln(ln(n)) * (k - 1)
//!
//! LOO here is a cheap penalised-AIC stand-in, not a true leave-one-out
//! cross-validation. Lower values are better for all three.

use crate::error::SieveError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the number of mixture components is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentSelection {
    /// Minimise BIC over 1..=max components.
    #[default]
    Bic,
    /// Minimise AIC over 1..=max components.
    Aic,
    /// Minimise the penalised-AIC LOO approximation.
    Loo,
    /// Fit one Dirichlet-process mixture and keep the components it uses.
    Dirichlet,
}

impl ComponentSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentSelection::Bic => "bic",
            ComponentSelection::Aic => "aic",
            ComponentSelection::Loo => "loo",
            ComponentSelection::Dirichlet => "dirichlet",
        }
    }
}

impl fmt::Display for ComponentSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentSelection {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bic" => Ok(ComponentSelection::Bic),
            "aic" => Ok(ComponentSelection::Aic),
            "loo" => Ok(ComponentSelection::Loo),
            "dirichlet" => Ok(ComponentSelection::Dirichlet),
            other => Err(SieveError::InvalidParameter(format!(
                "Unknown component method '{}': expected bic, aic, loo or dirichlet",
                other
            ))),
        }
    }
}

/// Information criteria for one fitted component count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCriteria {
    /// Number of mixture components.
    pub n_components: usize,
    /// Total log-likelihood of the data.
    pub log_likelihood: f64,
    /// Number of free parameters.
    pub n_params: usize,
    /// Number of observations.
    pub n_obs: usize,
    pub aic: f64,
    pub bic: f64,
    pub loo: f64,
}

impl ModelCriteria {
    /// Compute criteria for a k-component univariate mixture.
    pub fn new(n_components: usize, log_likelihood: f64, n_obs: usize) -> Self {
        // The LOO penalty counts components from zero
        let k = n_components.saturating_sub(1) as f64;
        let n = n_obs as f64;
        let n_params = (3 * n_components).saturating_sub(1);
        let p = n_params as f64;

        let aic = -2.0 * log_likelihood + 2.0 * p;
        let bic = -2.0 * log_likelihood + p * n.ln();
        let loo = aic + 2.0 * n.ln().ln() * k;

        Self {
            n_components,
            log_likelihood,
            n_params,
            n_obs,
            aic,
            bic,
            loo,
        }
    }

    /// Score under the given criterion. Dirichlet has no score.
    pub fn score(&self, selection: ComponentSelection) -> Option<f64> {
        match selection {
            ComponentSelection::Bic => Some(self.bic),
            ComponentSelection::Aic => Some(self.aic),
            ComponentSelection::Loo => Some(self.loo),
            ComponentSelection::Dirichlet => None,
        }
    }
}

/// Index of the candidate with the lowest score. Ties keep the fewer components.
pub fn select_best(criteria: &[ModelCriteria], selection: ComponentSelection) -> Option<usize> {
    criteria
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.score(selection).map(|s| (i, s)))
        .filter(|(_, s)| s.is_finite())
        .fold(None, |best: Option<(usize, f64)>, (i, s)| match best {
            Some((_, b)) if b <= s => best,
            _ => Some((i, s)),
        })
        .map(|(i, _)| i)
}
