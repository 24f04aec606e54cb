//! Stationarity testing
//!
//! Level-stationarity KPSS test and the differencing-order selection built
//! on it.

use crate::{difference, MathError, Result};
use statrs::statistics::Statistics;

/// Significance levels of the KPSS critical value table
const KPSS_LEVELS: [f64; 4] = [0.10, 0.05, 0.025, 0.01];
/// Critical values for the level-stationarity null
const KPSS_CRITICAL: [f64; 4] = [0.347, 0.463, 0.574, 0.739];

/// Result of a KPSS test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KpssResult {
    /// Test statistic
    pub statistic: f64,
    /// Interpolated p-value, clamped to the table range [0.01, 0.10]
    pub p_value: f64,
    /// Bartlett lag truncation used for the long-run variance
    pub lags: usize,
}

impl KpssResult {
    /// Whether the stationarity null is rejected at `alpha`
    pub fn rejects_stationarity(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// KPSS test for level stationarity with the short lag truncation
/// `trunc(3 * sqrt(n) / 13)`
pub fn kpss(data: &[f64]) -> Result<KpssResult> {
    let n = data.len();
    if n < 3 {
        return Err(MathError::InsufficientData(format!(
            "KPSS needs at least 3 observations, got {}",
            n
        )));
    }

    let mean = data.iter().mean();
    let residuals: Vec<f64> = data.iter().map(|x| x - mean).collect();

    let lags = (3.0 * (n as f64).sqrt() / 13.0).trunc() as usize;
    let nf = n as f64;

    let mut long_run_variance = residuals.iter().map(|e| e * e).sum::<f64>() / nf;
    for s in 1..=lags.min(n - 1) {
        let weight = 1.0 - s as f64 / (lags as f64 + 1.0);
        let autocov: f64 = residuals[s..]
            .iter()
            .zip(residuals.iter())
            .map(|(a, b)| a * b)
            .sum();
        long_run_variance += 2.0 * weight * autocov / nf;
    }

    if long_run_variance <= f64::EPSILON {
        return Err(MathError::InvalidInput(
            "KPSS is undefined for a constant series".to_string(),
        ));
    }

    let mut partial = 0.0;
    let eta: f64 = residuals
        .iter()
        .map(|e| {
            partial += e;
            partial * partial
        })
        .sum::<f64>()
        / (nf * nf);

    let statistic = eta / long_run_variance;

    Ok(KpssResult {
        statistic,
        p_value: kpss_p_value(statistic),
        lags,
    })
}

/// Linear interpolation of the critical value table
fn kpss_p_value(statistic: f64) -> f64 {
    if statistic <= KPSS_CRITICAL[0] {
        return KPSS_LEVELS[0];
    }
    if statistic >= KPSS_CRITICAL[3] {
        return KPSS_LEVELS[3];
    }
    for i in 0..3 {
        let (lo, hi) = (KPSS_CRITICAL[i], KPSS_CRITICAL[i + 1]);
        if statistic <= hi {
            let t = (statistic - lo) / (hi - lo);
            return KPSS_LEVELS[i] + t * (KPSS_LEVELS[i + 1] - KPSS_LEVELS[i]);
        }
    }
    KPSS_LEVELS[3]
}

/// Number of first differences needed for the KPSS test to stop rejecting
/// stationarity at `alpha`, capped at `max_d`
pub fn ndiffs(data: &[f64], alpha: f64, max_d: usize) -> Result<usize> {
    if alpha <= 0.0 || alpha >= 1.0 {
        return Err(MathError::InvalidInput(format!(
            "alpha must be between 0 and 1, got {}",
            alpha
        )));
    }

    let mut d = 0;
    let mut current = data.to_vec();
    while d < max_d {
        if is_constant(&current) {
            break;
        }
        let test = kpss(&current)?;
        if !test.rejects_stationarity(alpha) {
            break;
        }
        d += 1;
        current = difference(&current, 1);
    }
    Ok(d)
}

fn is_constant(data: &[f64]) -> bool {
    data.windows(2).all(|w| (w[1] - w[0]).abs() <= f64::EPSILON)
}
