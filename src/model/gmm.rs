//! Univariate Gaussian mixture fitted by expectation-maximisation.
//!
//! Each restart seeds responsibilities from a k-means++ / Lloyd clustering
//! and runs EM until the mean log-likelihood changes by less than `tol`.
//! The restart with the highest final likelihood wins.

use super::component::{log_sum_exp, MixtureComponent};
use super::select::MixtureConfig;
use crate::error::{Result, SieveError};
use crate::rng::Rng;
use log::debug;
use serde::{Deserialize, Serialize};

const KMEANS_MAX_ITER: usize = 100;

const LN_2PI: f64 = 1.837_877_066_409_345_3;

/// Result of fitting a k-component mixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmmFit {
    /// Components sorted by ascending mean.
    pub components: Vec<MixtureComponent>,
    /// Total log-likelihood of the data under the fitted mixture.
    pub log_likelihood: f64,
    /// EM iterations used by the winning restart.
    pub iterations: usize,
    /// Whether the winning restart converged within `max_iter`.
    pub converged: bool,
}

impl GmmFit {
    pub fn n_components(&self) -> usize {
        self.components.len()
    }
}

/// Fit a Gaussian mixture with `n_components` components to `values`.
pub fn fit_gmm(values: &[f64], n_components: usize, config: &MixtureConfig) -> Result<GmmFit> {
    validate_input(values, n_components)?;

    let mut rng = Rng::new(config.seed);
    let mut best: Option<GmmFit> = None;

    for init in 0..config.n_init.max(1) {
        let labels = kmeans_labels(values, n_components, &mut rng);
        let fit = run_em(values, n_components, &labels, config);
        debug!(
            n_components = n_components,
            init = init,
            log_likelihood = fit.log_likelihood,
            iterations = fit.iterations,
            converged = fit.converged;
            "em restart finished"
        );
        let better = match &best {
            Some(b) => fit.log_likelihood > b.log_likelihood,
            None => fit.log_likelihood.is_finite(),
        };
        if better {
            best = Some(fit);
        }
    }

    let mut fit = best.ok_or_else(|| {
        SieveError::NumericalFit(format!(
            "EM produced no finite likelihood for {} components",
            n_components
        ))
    })?;
    fit.components.sort_by(|a, b| a.mean.total_cmp(&b.mean));
    Ok(fit)
}

pub(crate) fn validate_input(values: &[f64], n_components: usize) -> Result<()> {
    if n_components == 0 {
        return Err(SieveError::InvalidParameter(
            "Mixture needs at least one component".to_string(),
        ));
    }
    if values.len() < n_components {
        return Err(SieveError::NumericalFit(format!(
            "{} values cannot support {} components",
            values.len(),
            n_components
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(SieveError::NumericalFit(
            "Mixture input contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

fn run_em(values: &[f64], k: usize, labels: &[usize], config: &MixtureConfig) -> GmmFit {
    let n = values.len();
    let mut resp = vec![0.0; n * k];
    for (i, &label) in labels.iter().enumerate() {
        resp[i * k + label] = 1.0;
    }

    let mut components = m_step(values, &resp, k, config.reg_covar);
    let mut lower_bound = f64::NEG_INFINITY;
    let mut converged = false;
    let mut iterations = 0;

    for iter in 1..=config.max_iter {
        iterations = iter;
        let previous = lower_bound;
        lower_bound = e_step(values, &components, &mut resp) / n as f64;
        components = m_step(values, &resp, k, config.reg_covar);

        if (lower_bound - previous).abs() < config.tol {
            converged = true;
            break;
        }
    }

    let log_likelihood = total_log_likelihood(values, &components);
    GmmFit {
        components,
        log_likelihood,
        iterations,
        converged,
    }
}

/// Update responsibilities in place; returns the summed log-likelihood.
fn e_step(values: &[f64], components: &[MixtureComponent], resp: &mut [f64]) -> f64 {
    let k = components.len();
    let mut weighted = vec![0.0; k];
    let mut total = 0.0;

    for (i, &x) in values.iter().enumerate() {
        for (w, c) in weighted.iter_mut().zip(components) {
            *w = c.weight.ln() + log_normal(x, c.mean, c.std * c.std);
        }
        let norm = log_sum_exp(&weighted);
        total += norm;
        for (j, w) in weighted.iter().enumerate() {
            resp[i * k + j] = (w - norm).exp();
        }
    }
    total
}

fn m_step(values: &[f64], resp: &[f64], k: usize, reg_covar: f64) -> Vec<MixtureComponent> {
    let mut nk = vec![10.0 * f64::EPSILON; k];
    let mut sums = vec![0.0; k];

    for (i, &x) in values.iter().enumerate() {
        for j in 0..k {
            let r = resp[i * k + j];
            nk[j] += r;
            sums[j] += r * x;
        }
    }
    let means: Vec<f64> = sums.iter().zip(&nk).map(|(s, c)| s / c).collect();

    let mut sq = vec![0.0; k];
    for (i, &x) in values.iter().enumerate() {
        for j in 0..k {
            sq[j] += resp[i * k + j] * (x - means[j]).powi(2);
        }
    }

    let total: f64 = nk.iter().sum();
    (0..k)
        .map(|j| {
            let variance = sq[j] / nk[j] + reg_covar;
            MixtureComponent::new(nk[j] / total, means[j], variance.sqrt())
        })
        .collect()
}

fn total_log_likelihood(values: &[f64], components: &[MixtureComponent]) -> f64 {
    let mut weighted = vec![0.0; components.len()];
    values
        .iter()
        .map(|&x| {
            for (w, c) in weighted.iter_mut().zip(components) {
                *w = c.weight.ln() + log_normal(x, c.mean, c.std * c.std);
            }
            log_sum_exp(&weighted)
        })
        .sum()
}

fn log_normal(x: f64, mean: f64, variance: f64) -> f64 {
    -0.5 * (LN_2PI + variance.ln() + (x - mean).powi(2) / variance)
}

/// Hard cluster labels from k-means++ seeding followed by Lloyd iterations.
pub(crate) fn kmeans_labels(values: &[f64], k: usize, rng: &mut Rng) -> Vec<usize> {
    let mut centers = kmeans_plus_plus(values, k, rng);
    let mut labels = vec![0; values.len()];

    for iter in 0..KMEANS_MAX_ITER {
        let mut changed = false;
        for (label, &x) in labels.iter_mut().zip(values) {
            let nearest = nearest_center(&centers, x);
            if nearest != *label {
                *label = nearest;
                changed = true;
            }
        }
        if !changed && iter > 0 {
            break;
        }

        let mut sums = vec![0.0; k];
        let mut counts = vec![0usize; k];
        for (&label, &x) in labels.iter().zip(values) {
            sums[label] += x;
            counts[label] += 1;
        }
        for j in 0..k {
            // Empty clusters keep their previous center
            if counts[j] > 0 {
                centers[j] = sums[j] / counts[j] as f64;
            }
        }
    }

    labels
}

fn kmeans_plus_plus(values: &[f64], k: usize, rng: &mut Rng) -> Vec<f64> {
    let mut centers = Vec::with_capacity(k);
    centers.push(values[rng.next_index(values.len())]);
    let mut dist: Vec<f64> = values.iter().map(|&x| (x - centers[0]).powi(2)).collect();

    while centers.len() < k {
        let total: f64 = dist.iter().sum();
        let next = if total > 0.0 {
            let target = rng.next_f64() * total;
            let mut acc = 0.0;
            dist.iter()
                .position(|&d| {
                    acc += d;
                    acc >= target
                })
                .unwrap_or(values.len() - 1)
        } else {
            rng.next_index(values.len())
        };

        let center = values[next];
        centers.push(center);
        for (d, &x) in dist.iter_mut().zip(values) {
            *d = d.min((x - center).powi(2));
        }
    }

    centers
}

fn nearest_center(centers: &[f64], x: f64) -> usize {
    centers
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (x - **a).abs().total_cmp(&(x - **b).abs()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bimodal(seed: u64) -> Vec<f64> {
        let mut rng = Rng::new(seed);
        let mut values: Vec<f64> = (0..300).map(|_| rng.next_normal(0.0, 1.0)).collect();
        values.extend((0..200).map(|_| rng.next_normal(10.0, 2.0)));
        values
    }

    #[test]
    fn test_recovers_two_components() {
        let values = bimodal(1);
        let fit = fit_gmm(&values, 2, &MixtureConfig::default()).unwrap();
        assert_eq!(fit.n_components(), 2);
        let (low, high) = (fit.components[0], fit.components[1]);
        assert!(low.mean.abs() < 0.3, "low mean = {}", low.mean);
        assert!((high.mean - 10.0).abs() < 0.5, "high mean = {}", high.mean);
        assert!((low.weight - 0.6).abs() < 0.05);
        assert!((high.std - 2.0).abs() < 0.4);
        let weight_sum: f64 = fit.components.iter().map(|c| c.weight).sum();
        assert!((weight_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_components_beat_one_on_bimodal_data() {
        let values = bimodal(2);
        let config = MixtureConfig::default();
        let one = fit_gmm(&values, 1, &config).unwrap();
        let two = fit_gmm(&values, 2, &config).unwrap();
        assert!(two.log_likelihood > one.log_likelihood);
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let values = bimodal(3);
        let config = MixtureConfig::default().with_n_init(3);
        let a = fit_gmm(&values, 3, &config).unwrap();
        let b = fit_gmm(&values, 3, &config).unwrap();
        assert_eq!(a.components, b.components);
        assert_eq!(a.log_likelihood, b.log_likelihood);
    }

    #[test]
    fn test_rejects_too_few_values() {
        assert!(fit_gmm(&[1.0, 2.0], 3, &MixtureConfig::default()).is_err());
        assert!(fit_gmm(&[1.0, 2.0], 0, &MixtureConfig::default()).is_err());
        assert!(fit_gmm(&[1.0, f64::NAN, 3.0], 1, &MixtureConfig::default()).is_err());
    }

    #[test]
    fn test_kmeans_separates_clusters() {
        let values = vec![1.0, 1.1, 0.9, 50.0, 50.5, 49.5];
        let mut rng = Rng::new(9);
        let labels = kmeans_labels(&values, 2, &mut rng);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_ne!(labels[0], labels[3]);
    }
}
