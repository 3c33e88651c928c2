//! Box-Cox power transform and maximum-likelihood lambda estimation.

use crate::error::{Result, SieveError};

/// Lambdas beyond this magnitude give numerically unstable mixtures.
pub const LAMBDA_LIMIT: f64 = 3.0;

const SEARCH_MIN: f64 = -5.0;
const SEARCH_MAX: f64 = 5.0;
const GRID_STEP: f64 = 0.25;
const GOLDEN_TOL: f64 = 1e-6;

/// Box-Cox of a single positive value.
///
/// `(x^lambda - 1) / lambda`, or `ln(x)` when lambda is effectively zero.
pub fn box_cox_value(x: f64, lambda: f64) -> f64 {
    if lambda.abs() < 1e-8 {
        x.ln()
    } else {
        (x.powf(lambda) - 1.0) / lambda
    }
}

/// Estimate lambda by maximising the Box-Cox profile log-likelihood.
///
/// Input must be strictly positive with some spread. The search scans a
/// coarse grid over `[-5, 5]` and then refines around the best grid point
/// with a golden-section search.
pub fn box_cox_lambda(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(SieveError::NumericalFit(
            "Box-Cox needs at least two values".to_string(),
        ));
    }
    if values.iter().any(|&v| !(v > 0.0) || !v.is_finite()) {
        return Err(SieveError::NumericalFit(
            "Box-Cox requires strictly positive finite input".to_string(),
        ));
    }

    let log_sum: f64 = values.iter().map(|v| v.ln()).sum();
    let llf = |lambda: f64| log_likelihood(values, log_sum, lambda);

    let n_steps = ((SEARCH_MAX - SEARCH_MIN) / GRID_STEP).round() as usize;
    let mut best: Option<(f64, f64)> = None;
    for i in 0..=n_steps {
        let lambda = SEARCH_MIN + GRID_STEP * i as f64;
        let value = llf(lambda);
        if !value.is_finite() {
            continue;
        }
        if best.map_or(true, |(_, b)| value > b) {
            best = Some((lambda, value));
        }
    }

    let (center, _) = best.ok_or_else(|| {
        SieveError::NumericalFit("Box-Cox log-likelihood is not finite for any lambda".to_string())
    })?;

    let lo = (center - GRID_STEP).max(SEARCH_MIN);
    let hi = (center + GRID_STEP).min(SEARCH_MAX);
    Ok(golden_section_max(llf, lo, hi))
}

/// Profile log-likelihood: `(lambda - 1) * sum(ln x) - n/2 * ln(var(y))`.
fn log_likelihood(values: &[f64], log_sum: f64, lambda: f64) -> f64 {
    let n = values.len() as f64;
    let transformed: Vec<f64> = values.iter().map(|&v| box_cox_value(v, lambda)).collect();
    let mean = transformed.iter().sum::<f64>() / n;
    let variance = transformed.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / n;
    if !(variance > 0.0) {
        return f64::NEG_INFINITY;
    }
    (lambda - 1.0) * log_sum - 0.5 * n * variance.ln()
}

fn golden_section_max<F>(f: F, mut lo: f64, mut hi: f64) -> f64
where
    F: Fn(f64) -> f64,
{
    let ratio = (5f64.sqrt() - 1.0) / 2.0;
    let mut x1 = hi - ratio * (hi - lo);
    let mut x2 = lo + ratio * (hi - lo);
    let mut f1 = f(x1);
    let mut f2 = f(x2);

    while (hi - lo).abs() > GOLDEN_TOL {
        if f1 < f2 {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + ratio * (hi - lo);
            f2 = f(x2);
        } else {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - ratio * (hi - lo);
            f1 = f(x1);
        }
    }

    0.5 * (lo + hi)
}
