//! Variational Dirichlet-process Gaussian mixture.
//!
//! A truncated stick-breaking mixture with `max_components` sticks and a
//! weight concentration prior of `1 / max_components`. Normal-Wishart priors
//! on each component are centred on the data mean and variance. Components
//! the data does not need collapse towards zero weight, so the number of
//! components that survive the weight threshold is the model's estimate.

use super::component::{log_sum_exp, MixtureComponent};
use super::gmm::{kmeans_labels, validate_input};
use super::select::MixtureConfig;
use crate::error::{Result, SieveError};
use crate::rng::Rng;
use log::debug;
use serde::{Deserialize, Serialize};
use statrs::function::gamma::digamma;

const LN_2PI: f64 = 1.837_877_066_409_345_3;

/// Result of a variational Dirichlet-process fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirichletFit {
    /// All truncated components in stick order, including near-empty ones.
    pub components: Vec<MixtureComponent>,
    /// Expected mixing weight of every stick.
    pub weight_concentrations: Vec<f64>,
    /// Weight concentration prior (`1 / max_components`).
    pub concentration_prior: f64,
    /// Summed log normaliser of the final E-step.
    pub log_prob: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy)]
struct Priors {
    concentration: f64,
    mean_precision: f64,
    mean: f64,
    degrees_of_freedom: f64,
    covariance: f64,
}

#[derive(Debug, Clone)]
struct Posterior {
    /// Stick-breaking Beta parameters.
    alpha: Vec<f64>,
    beta: Vec<f64>,
    mean_precision: Vec<f64>,
    means: Vec<f64>,
    degrees_of_freedom: Vec<f64>,
    /// Expected covariance (`scale / dof`).
    covariances: Vec<f64>,
}

/// Fit a Dirichlet-process mixture with `max_components` sticks.
pub fn fit_dirichlet(
    values: &[f64],
    max_components: usize,
    config: &MixtureConfig,
) -> Result<DirichletFit> {
    validate_input(values, max_components)?;
    if values.len() < 2 {
        return Err(SieveError::NumericalFit(
            "Dirichlet mixture needs at least two values".to_string(),
        ));
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let priors = Priors {
        concentration: 1.0 / max_components as f64,
        mean_precision: 1.0,
        mean,
        degrees_of_freedom: 1.0,
        covariance: variance,
    };

    let mut rng = Rng::new(config.seed);
    let mut best: Option<(Posterior, f64, usize, bool)> = None;

    for init in 0..config.n_init.max(1) {
        let labels = kmeans_labels(values, max_components, &mut rng);
        let (posterior, log_prob, iterations, converged) =
            run_variational(values, max_components, &labels, &priors, config);
        debug!(
            max_components = max_components,
            init = init,
            log_prob = log_prob,
            iterations = iterations,
            converged = converged;
            "dirichlet restart finished"
        );
        let better = match &best {
            Some((_, b, _, _)) => log_prob > *b,
            None => log_prob.is_finite(),
        };
        if better {
            best = Some((posterior, log_prob, iterations, converged));
        }
    }

    let (posterior, log_prob, iterations, converged) = best.ok_or_else(|| {
        SieveError::NumericalFit("Dirichlet mixture produced no finite fit".to_string())
    })?;

    let weights = expected_weights(&posterior);
    let components = weights
        .iter()
        .zip(posterior.means.iter().zip(&posterior.covariances))
        .map(|(&w, (&m, &c))| MixtureComponent::new(w, m, c.sqrt()))
        .collect();

    Ok(DirichletFit {
        components,
        weight_concentrations: weights,
        concentration_prior: priors.concentration,
        log_prob,
        iterations,
        converged,
    })
}

fn run_variational(
    values: &[f64],
    k: usize,
    labels: &[usize],
    priors: &Priors,
    config: &MixtureConfig,
) -> (Posterior, f64, usize, bool) {
    let mut resp = vec![0.0; values.len() * k];
    for (i, &label) in labels.iter().enumerate() {
        resp[i * k + label] = 1.0;
    }

    let mut posterior = m_step(values, &resp, k, priors, config.reg_covar);
    let mut log_prob = f64::NEG_INFINITY;
    let mut converged = false;
    let mut iterations = 0;

    for iter in 1..=config.dirichlet_max_iter {
        iterations = iter;
        let previous = log_prob;
        log_prob = e_step(values, &posterior, &mut resp);
        posterior = m_step(values, &resp, k, priors, config.reg_covar);

        if (log_prob - previous).abs() < config.tol {
            converged = true;
            break;
        }
    }

    (posterior, log_prob, iterations, converged)
}

fn m_step(
    values: &[f64],
    resp: &[f64],
    k: usize,
    priors: &Priors,
    reg_covar: f64,
) -> Posterior {
    let mut nk = vec![10.0 * f64::EPSILON; k];
    let mut sums = vec![0.0; k];
    for (i, &x) in values.iter().enumerate() {
        for j in 0..k {
            let r = resp[i * k + j];
            nk[j] += r;
            sums[j] += r * x;
        }
    }
    let xk: Vec<f64> = sums.iter().zip(&nk).map(|(s, c)| s / c).collect();

    let mut sq = vec![0.0; k];
    for (i, &x) in values.iter().enumerate() {
        for j in 0..k {
            sq[j] += resp[i * k + j] * (x - xk[j]).powi(2);
        }
    }
    let sk: Vec<f64> = sq.iter().zip(&nk).map(|(s, c)| s / c + reg_covar).collect();

    // Mass of all later sticks
    let mut tail = vec![0.0; k];
    let mut acc = 0.0;
    for j in (0..k).rev() {
        tail[j] = acc;
        acc += nk[j];
    }

    let alpha = nk.iter().map(|c| 1.0 + c).collect();
    let beta = tail.iter().map(|t| priors.concentration + t).collect();
    let mean_precision: Vec<f64> = nk.iter().map(|c| priors.mean_precision + c).collect();
    let means = (0..k)
        .map(|j| (priors.mean_precision * priors.mean + nk[j] * xk[j]) / mean_precision[j])
        .collect();
    let degrees_of_freedom: Vec<f64> = nk.iter().map(|c| priors.degrees_of_freedom + c).collect();
    let covariances = (0..k)
        .map(|j| {
            let diff = xk[j] - priors.mean;
            let scale = priors.covariance
                + nk[j] * sk[j]
                + nk[j] * priors.mean_precision / mean_precision[j] * diff * diff;
            scale / degrees_of_freedom[j]
        })
        .collect();

    Posterior {
        alpha,
        beta,
        mean_precision,
        means,
        degrees_of_freedom,
        covariances,
    }
}

/// Update responsibilities; returns the summed log normaliser.
fn e_step(values: &[f64], posterior: &Posterior, resp: &mut [f64]) -> f64 {
    let k = posterior.means.len();
    let log_weights = expected_log_weights(posterior);

    let constant: Vec<f64> = (0..k)
        .map(|j| {
            let dof = posterior.degrees_of_freedom[j];
            let log_lambda = 2f64.ln() + digamma(0.5 * dof);
            log_weights[j] - 0.5 * LN_2PI - 0.5 * posterior.covariances[j].ln() - 0.5 * dof.ln()
                + 0.5 * (log_lambda - 1.0 / posterior.mean_precision[j])
        })
        .collect();

    let mut weighted = vec![0.0; k];
    let mut total = 0.0;
    for (i, &x) in values.iter().enumerate() {
        for j in 0..k {
            weighted[j] =
                constant[j] - 0.5 * (x - posterior.means[j]).powi(2) / posterior.covariances[j];
        }
        let norm = log_sum_exp(&weighted);
        total += norm;
        for (j, w) in weighted.iter().enumerate() {
            resp[i * k + j] = (w - norm).exp();
        }
    }
    total
}

fn expected_log_weights(posterior: &Posterior) -> Vec<f64> {
    let mut carried = 0.0;
    posterior
        .alpha
        .iter()
        .zip(&posterior.beta)
        .map(|(&a, &b)| {
            let total = digamma(a + b);
            let log_weight = digamma(a) - total + carried;
            carried += digamma(b) - total;
            log_weight
        })
        .collect()
}

fn expected_weights(posterior: &Posterior) -> Vec<f64> {
    let mut remaining = 1.0;
    let raw: Vec<f64> = posterior
        .alpha
        .iter()
        .zip(&posterior.beta)
        .map(|(&a, &b)| {
            let w = remaining * a / (a + b);
            remaining *= b / (a + b);
            w
        })
        .collect();
    let total: f64 = raw.iter().sum();
    raw.iter().map(|w| w / total).collect()
}
