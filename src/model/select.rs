//! Choosing the number of mixture components for a length distribution.
//!
//! Lengths are transformed (Box-Cox by default) and mixtures with 1..=cap
//! components are fitted; the winner minimises the requested criterion.
//! The Dirichlet method instead fits one over-complete variational mixture
//! and lets the prior prune unneeded components. Either way, adjacent
//! components without a density valley between them are merged, so a skewed
//! mode split into several Gaussians counts once.

use super::component::{merge_overlapping, retain_components, MixtureComponent};
use super::criteria::{select_best, ComponentSelection, ModelCriteria};
use super::dirichlet::fit_dirichlet;
use super::gmm::{fit_gmm, GmmFit};
use crate::error::{Result, SieveError};
use crate::transform::{transform, TransformKind, TransformParams};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Fewer points than this are not fitted at all.
pub const MIN_MIXTURE_POINTS: usize = 50;

/// Hard upper bound on the number of components.
pub const COMPONENT_LIMIT: usize = 10;

/// Valleys shallower than this fraction of the lower neighbouring density do
/// not separate two components.
pub const MERGE_DIP_RATIO: f64 = 0.9;

/// Configuration for mixture fitting and component selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixtureConfig {
    /// Requested maximum number of components (further capped by data size).
    pub max_components: usize,
    /// Transform applied before fitting.
    pub transform: TransformKind,
    /// How the component count is chosen.
    pub selection: ComponentSelection,
    /// Seed for k-means++ initialisation.
    pub seed: u64,
    /// Number of restarts per fit.
    pub n_init: usize,
    /// EM iteration limit.
    pub max_iter: usize,
    /// Variational iteration limit for the Dirichlet method.
    pub dirichlet_max_iter: usize,
    /// Convergence tolerance on the likelihood change.
    pub tol: f64,
    /// Added to every component variance.
    pub reg_covar: f64,
    /// Components lighter than this are discarded.
    pub weight_threshold: f64,
    /// Merge adjacent components that do not form separate modes.
    pub merge_overlapping: bool,
}

impl Default for MixtureConfig {
    fn default() -> Self {
        Self {
            max_components: COMPONENT_LIMIT,
            transform: TransformKind::BoxCox,
            selection: ComponentSelection::Bic,
            seed: 42,
            n_init: 10,
            max_iter: 300,
            dirichlet_max_iter: 500,
            tol: 1e-3,
            reg_covar: 1e-5,
            weight_threshold: 0.01,
            merge_overlapping: true,
        }
    }
}

impl MixtureConfig {
    pub fn with_max_components(mut self, max_components: usize) -> Self {
        self.max_components = max_components;
        self
    }

    pub fn with_transform(mut self, transform: TransformKind) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_selection(mut self, selection: ComponentSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_reg_covar(mut self, reg_covar: f64) -> Self {
        self.reg_covar = reg_covar;
        self
    }

    pub fn with_weight_threshold(mut self, weight_threshold: f64) -> Self {
        self.weight_threshold = weight_threshold;
        self
    }

    pub fn with_merge_overlapping(mut self, merge_overlapping: bool) -> Self {
        self.merge_overlapping = merge_overlapping;
        self
    }

    /// Drop light components, then merge the ones that share a mode.
    fn finalize(&self, components: &[MixtureComponent]) -> Vec<MixtureComponent> {
        let kept = retain_components(components, self.weight_threshold);
        if !self.merge_overlapping {
            return kept;
        }
        let merged = merge_overlapping(&kept, MERGE_DIP_RATIO);
        if merged.len() < kept.len() {
            info!(
                fitted = kept.len(),
                modes = merged.len();
                "merged components sharing a mode"
            );
        }
        merged
    }
}

/// Scores recorded while choosing the component count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionScores {
    /// Criteria for every fitted component count, in order 1..=cap.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub criteria: Vec<ModelCriteria>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bic: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aic: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub loo: Vec<f64>,
    /// Expected weight of every stick of a Dirichlet fit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_concentrations: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_concentration_prior: Option<f64>,
}

/// Outcome of mixture fitting over a length distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixtureFit {
    /// Retained components, in transformed space, sorted by mean.
    pub components: Vec<MixtureComponent>,
    pub transform_params: TransformParams,
    pub method_used: ComponentSelection,
    pub optimal_components: usize,
    pub is_multimodal: bool,
    /// Set when there were too few lengths to fit anything.
    pub insufficient_data: bool,
    /// Component cap after size-based limiting.
    pub max_components_used: usize,
    pub scores: SelectionScores,
}

impl MixtureFit {
    fn insufficient(n: usize, method: ComponentSelection) -> Self {
        warn!(
            n = n,
            required = MIN_MIXTURE_POINTS;
            "not enough lengths for mixture fitting"
        );
        Self {
            components: Vec::new(),
            transform_params: TransformParams::identity(),
            method_used: method,
            optimal_components: 1,
            is_multimodal: false,
            insufficient_data: true,
            max_components_used: 0,
            scores: SelectionScores::default(),
        }
    }
}

/// Component cap for `n` points.
///
/// `min(requested, max(2, n / 100), 10)`, and at most 5 (but at least 2) when
/// there are fewer than 1000 points.
pub fn component_cap(requested: usize, n: usize) -> usize {
    let cap = requested.min((n / 100).max(2)).min(COMPONENT_LIMIT);
    if n < 1000 {
        cap.min(5).max(2)
    } else {
        cap
    }
}

/// Transform `lengths` and fit a mixture, choosing the component count.
pub fn fit_mixture(lengths: &[u64], config: &MixtureConfig) -> Result<MixtureFit> {
    if lengths.len() < MIN_MIXTURE_POINTS {
        return Ok(MixtureFit::insufficient(lengths.len(), config.selection));
    }
    if config.max_components == 0 {
        return Err(SieveError::InvalidParameter(
            "max_components must be at least 1".to_string(),
        ));
    }

    let (values, transform_params) = transform(lengths, config.transform);
    let cap = component_cap(config.max_components, lengths.len());

    let fit = match config.selection {
        ComponentSelection::Dirichlet => fit_by_dirichlet(&values, cap, transform_params, config)?,
        selection => fit_by_criterion(&values, cap, selection, transform_params, config)?,
    };

    info!(
        method = fit.method_used.as_str(),
        components = fit.optimal_components,
        multimodal = fit.is_multimodal,
        cap = cap,
        transform = fit.transform_params.kind.as_str();
        "selected mixture components"
    );
    Ok(fit)
}

fn fit_by_criterion(
    values: &[f64],
    cap: usize,
    selection: ComponentSelection,
    transform_params: TransformParams,
    config: &MixtureConfig,
) -> Result<MixtureFit> {
    let mut fits: Vec<GmmFit> = Vec::with_capacity(cap);
    let mut criteria = Vec::with_capacity(cap);

    for k in 1..=cap {
        match fit_gmm(values, k, config) {
            Ok(fit) => {
                criteria.push(ModelCriteria::new(k, fit.log_likelihood, values.len()));
                fits.push(fit);
            }
            Err(e) => {
                warn!(n_components = k, error:% = e; "mixture fit failed, stopping search");
                break;
            }
        }
    }

    let best = select_best(&criteria, selection).ok_or_else(|| {
        SieveError::NumericalFit("no mixture could be fitted".to_string())
    })?;

    let scores = SelectionScores {
        bic: criteria.iter().map(|c| c.bic).collect(),
        aic: criteria.iter().map(|c| c.aic).collect(),
        loo: criteria.iter().map(|c| c.loo).collect(),
        criteria,
        ..SelectionScores::default()
    };
    log::debug!(bic:? = scores.bic, aic:? = scores.aic, loo:? = scores.loo; "component scores");

    let components = config.finalize(&fits[best].components);
    Ok(MixtureFit {
        optimal_components: components.len(),
        is_multimodal: components.len() > 1,
        components,
        transform_params,
        method_used: selection,
        insufficient_data: false,
        max_components_used: cap,
        scores,
    })
}

fn fit_by_dirichlet(
    values: &[f64],
    cap: usize,
    transform_params: TransformParams,
    config: &MixtureConfig,
) -> Result<MixtureFit> {
    let fit = fit_dirichlet(values, cap, config)?;
    let components = config.finalize(&fit.components);
    log::debug!(
        weights:? = fit.weight_concentrations,
        prior = fit.concentration_prior;
        "dirichlet weights"
    );

    Ok(MixtureFit {
        optimal_components: components.len(),
        is_multimodal: components.len() > 1,
        components,
        transform_params,
        method_used: ComponentSelection::Dirichlet,
        insufficient_data: false,
        max_components_used: cap,
        scores: SelectionScores {
            weight_concentrations: Some(fit.weight_concentrations),
            weight_concentration_prior: Some(fit.concentration_prior),
            ..SelectionScores::default()
        },
    })
}
