//! ARIMA estimation and forecasting
//!
//! Models are estimated by conditional sum of squares (CSS) on the
//! differenced series. When a constant is included the differenced series is
//! demeaned first and the sample mean is kept as the level (d = 0) or drift
//! (d = 1) of the model. AR and MA coefficients are then optimised with a
//! Nelder–Mead search constrained to the stationary and invertible region.

use crate::optimize::NelderMead;
use crate::{difference, integrate, integration_anchors, MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::f64::consts::PI;
use std::fmt;

/// Non-seasonal ARIMA order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// A fitted ARIMA model holding everything needed to extend the series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedArima {
    order: ArimaOrder,
    with_constant: bool,
    /// Mean of the differenced series (zero without a constant)
    mean: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    sigma2: f64,
    log_likelihood: f64,
    /// Observations in the undifferenced training series
    n_obs: usize,
    /// Residuals entering the conditional likelihood
    n_effective: usize,
    /// Last `p` values of the differenced series, oldest first
    recent_values: Vec<f64>,
    /// Last `q` residuals, oldest first
    recent_residuals: Vec<f64>,
    /// Last value of each differencing level
    anchors: Vec<f64>,
}

/// Fit an ARIMA model of a fixed order to `data`
pub fn fit_arima(data: &[f64], order: ArimaOrder, with_constant: bool) -> Result<FittedArima> {
    fit_arima_conditional(data, order, with_constant, order.p)
}

/// Fit an ARIMA model conditioning on the first `conditioning` differenced
/// observations
///
/// The likelihood is summed over residuals `conditioning..n`, so fits of
/// different AR orders sharing one `conditioning >= p` are scored on the
/// same sample and their information criteria are comparable.
pub fn fit_arima_conditional(
    data: &[f64],
    order: ArimaOrder,
    with_constant: bool,
    conditioning: usize,
) -> Result<FittedArima> {
    if data.iter().any(|x| !x.is_finite()) {
        return Err(MathError::InvalidInput(
            "Series contains NaN or infinite values".to_string(),
        ));
    }

    let differenced = difference(data, order.d);
    let n = differenced.len();
    let skip = conditioning.max(order.p);
    let required = skip + order.q + usize::from(with_constant) + 3;
    if n < required {
        return Err(MathError::InsufficientData(format!(
            "{} needs at least {} differenced observations, got {}",
            order, required, n
        )));
    }

    let mean = if with_constant {
        differenced.iter().mean()
    } else {
        0.0
    };
    let centered: Vec<f64> = differenced.iter().map(|x| x - mean).collect();

    let mut start = yule_walker(&centered, order.p);
    if !is_stationary(&start) {
        start.iter_mut().for_each(|c| *c = 0.0);
    }
    start.extend(std::iter::repeat(0.0).take(order.q));

    let p = order.p;
    let objective = |params: &[f64]| {
        let (ar, ma) = params.split_at(p);
        if !is_stationary(ar) || !is_invertible(ma) {
            return f64::INFINITY;
        }
        let residuals = css_residuals(&centered, ar, ma);
        let m = (n - skip) as f64;
        let sse: f64 = residuals[skip..].iter().map(|e| e * e).sum();
        0.5 * m * (sse / m).max(f64::EPSILON).ln()
    };

    let minimum = NelderMead::new()
        .with_max_iterations(500 * (start.len() + 1))
        .minimize(objective, &start);

    if !minimum.value.is_finite() || minimum.value == f64::MAX {
        return Err(MathError::FitFailed(format!(
            "{} has no stationary and invertible solution",
            order
        )));
    }
    if !minimum.converged {
        return Err(MathError::FitFailed(format!(
            "{} did not converge after {} iterations",
            order, minimum.iterations
        )));
    }

    let (ar, ma) = minimum.point.split_at(p);
    let residuals = css_residuals(&centered, ar, ma);
    let n_effective = n - skip;
    let sse: f64 = residuals[skip..].iter().map(|e| e * e).sum();
    let sigma2 = (sse / n_effective as f64).max(f64::EPSILON);
    let log_likelihood = -0.5 * n_effective as f64 * ((2.0 * PI * sigma2).ln() + 1.0);

    Ok(FittedArima {
        order,
        with_constant,
        mean,
        ar: ar.to_vec(),
        ma: ma.to_vec(),
        sigma2,
        log_likelihood,
        n_obs: data.len(),
        n_effective,
        recent_values: differenced[n - p..].to_vec(),
        recent_residuals: residuals[n - order.q..].to_vec(),
        anchors: integration_anchors(data, order.d),
    })
}

impl FittedArima {
    /// Point forecasts for the next `horizon` steps on the original scale
    pub fn forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        if horizon == 0 {
            return Ok(Vec::new());
        }
        if self.anchors.len() != self.order.d
            || self.ar.len() != self.order.p
            || self.ma.len() != self.order.q
            || self.recent_values.len() != self.order.p
            || self.recent_residuals.len() != self.order.q
        {
            return Err(MathError::InvalidInput(format!(
                "{} state is inconsistent with its order",
                self.order
            )));
        }

        let mut history: Vec<f64> = self.recent_values.iter().map(|x| x - self.mean).collect();
        let mut shocks = self.recent_residuals.clone();
        let mut forecasts = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let ar_part: f64 = self
                .ar
                .iter()
                .enumerate()
                .map(|(i, phi)| phi * history[history.len() - 1 - i])
                .sum();
            let ma_part: f64 = self
                .ma
                .iter()
                .enumerate()
                .map(|(j, theta)| theta * shocks[shocks.len() - 1 - j])
                .sum();
            let next = ar_part + ma_part;

            history.push(next);
            shocks.push(0.0);
            forecasts.push(next + self.mean);
        }

        Ok(integrate(&forecasts, &self.anchors))
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn with_constant(&self) -> bool {
        self.with_constant
    }

    /// Mean of the differenced series
    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    /// Innovation variance
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Observations in the training series
    pub fn n_obs(&self) -> usize {
        self.n_obs
    }

    /// Residuals entering the likelihood
    pub fn n_effective(&self) -> usize {
        self.n_effective
    }

    /// Estimated parameters including the innovation variance
    pub fn n_params(&self) -> usize {
        self.order.p + self.order.q + usize::from(self.with_constant) + 1
    }

    /// Akaike information criterion
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood + 2.0 * self.n_params() as f64
    }

    /// Small-sample corrected AIC
    pub fn aicc(&self) -> f64 {
        let k = self.n_params() as f64;
        let m = self.n_effective as f64;
        if m - k - 1.0 <= 0.0 {
            return f64::INFINITY;
        }
        self.aic() + 2.0 * k * (k + 1.0) / (m - k - 1.0)
    }

    /// Bayesian information criterion
    pub fn bic(&self) -> f64 {
        -2.0 * self.log_likelihood + self.n_params() as f64 * (self.n_effective as f64).ln()
    }

    /// Human readable model name, e.g. `ARIMA(1,1,0) with constant`
    pub fn name(&self) -> String {
        if self.with_constant {
            format!("{} with constant", self.order)
        } else {
            self.order.to_string()
        }
    }
}

/// Conditional residuals; the first `p` entries are zero
fn css_residuals(centered: &[f64], ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut residuals = vec![0.0; centered.len()];
    for t in p..centered.len() {
        let mut e = centered[t];
        for (i, phi) in ar.iter().enumerate() {
            e -= phi * centered[t - 1 - i];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t >= p + 1 + j {
                e -= theta * residuals[t - 1 - j];
            }
        }
        residuals[t] = e;
    }
    residuals
}

/// Yule–Walker AR estimates via the Levinson–Durbin recursion
fn yule_walker(centered: &[f64], p: usize) -> Vec<f64> {
    if p == 0 {
        return Vec::new();
    }

    let n = centered.len() as f64;
    let autocov: Vec<f64> = (0..=p)
        .map(|k| {
            centered[k..]
                .iter()
                .zip(centered.iter())
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n
        })
        .collect();

    let mut phi = vec![0.0; p];
    if autocov[0] <= f64::EPSILON {
        return phi;
    }

    let mut error = autocov[0];
    for k in 0..p {
        let mut acc = autocov[k + 1];
        for j in 0..k {
            acc -= phi[j] * autocov[k - j];
        }
        let reflection = acc / error;
        let previous = phi.clone();
        phi[k] = reflection;
        for j in 0..k {
            phi[j] = previous[j] - reflection * previous[k - 1 - j];
        }
        error *= 1.0 - reflection * reflection;
        if error <= f64::EPSILON {
            break;
        }
    }
    phi
}

/// Whether `1 - phi_1 z - ... - phi_p z^p` has all roots outside the unit
/// circle (Schur–Cohn step-down)
pub fn is_stationary(ar: &[f64]) -> bool {
    let mut coefficients = ar.to_vec();
    while let Some(&reflection) = coefficients.last() {
        if !reflection.is_finite() || reflection.abs() >= 1.0 {
            return false;
        }
        let k = coefficients.len() - 1;
        let denom = 1.0 - reflection * reflection;
        let previous = coefficients.clone();
        for j in 0..k {
            coefficients[j] = (previous[j] + reflection * previous[k - 1 - j]) / denom;
        }
        coefficients.truncate(k);
    }
    true
}

/// Whether `1 + theta_1 z + ... + theta_q z^q` has all roots outside the
/// unit circle
pub fn is_invertible(ma: &[f64]) -> bool {
    let negated: Vec<f64> = ma.iter().map(|t| -t).collect();
    is_stationary(&negated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn simulate_ar1(phi: f64, mean: f64, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut value = 0.0;
        (0..n)
            .map(|_| {
                value = phi * value + noise.sample(&mut rng);
                value + mean
            })
            .collect()
    }

    fn simulate_random_walk(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut level = 50.0;
        (0..n)
            .map(|_| {
                level += noise.sample(&mut rng);
                level
            })
            .collect()
    }

    #[test]
    fn test_stationarity_checks() {
        assert!(is_stationary(&[]));
        assert!(is_stationary(&[0.5]));
        assert!(is_stationary(&[0.5, 0.3]));
        assert!(!is_stationary(&[1.0]));
        assert!(!is_stationary(&[1.2, -0.1]));
        assert!(!is_stationary(&[0.3, 0.8]));

        assert!(is_invertible(&[0.4]));
        assert!(is_invertible(&[-0.9]));
        assert!(!is_invertible(&[1.5]));
    }

    #[test]
    fn test_yule_walker_ar1() {
        let data = simulate_ar1(0.7, 0.0, 2000, 7);
        let mean = data.iter().mean();
        let centered: Vec<f64> = data.iter().map(|x| x - mean).collect();
        let phi = yule_walker(&centered, 1);
        assert_abs_diff_eq!(phi[0], 0.7, epsilon = 0.05);
    }

    #[test]
    fn test_fit_recovers_ar1_coefficient() {
        let data = simulate_ar1(0.6, 10.0, 800, 42);
        let model = fit_arima(&data, ArimaOrder::new(1, 0, 0), true).unwrap();

        assert_abs_diff_eq!(model.ar_coefficients()[0], 0.6, epsilon = 0.08);
        assert_abs_diff_eq!(model.mean(), 10.0, epsilon = 0.5);
        assert_abs_diff_eq!(model.sigma2(), 1.0, epsilon = 0.15);
    }

    #[test]
    fn test_ar1_forecast_reverts_to_mean() {
        let data = simulate_ar1(0.5, 20.0, 400, 3);
        let model = fit_arima(&data, ArimaOrder::new(1, 0, 0), true).unwrap();
        let forecast = model.forecast(60).unwrap();

        assert_eq!(forecast.len(), 60);
        assert_abs_diff_eq!(forecast[59], model.mean(), epsilon = 1e-6);
    }

    #[test]
    fn test_random_walk_forecast_is_flat() {
        let data = simulate_random_walk(200, 11);
        let model = fit_arima(&data, ArimaOrder::new(0, 1, 0), false).unwrap();
        let forecast = model.forecast(5).unwrap();

        let last = *data.last().unwrap();
        for value in forecast {
            assert_abs_diff_eq!(value, last, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_drift_forecast_is_linear() {
        let data: Vec<f64> = (0..50).map(|i| 100.0 + 2.0 * i as f64).collect();
        let model = fit_arima(&data, ArimaOrder::new(0, 1, 0), true).unwrap();
        let forecast = model.forecast(3).unwrap();

        assert_abs_diff_eq!(forecast[0], 200.0, epsilon = 1e-9);
        assert_abs_diff_eq!(forecast[1], 202.0, epsilon = 1e-9);
        assert_abs_diff_eq!(forecast[2], 204.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ma_model_fits_and_is_invertible() {
        let mut rng = StdRng::seed_from_u64(5);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let shocks: Vec<f64> = (0..600).map(|_| noise.sample(&mut rng)).collect();
        let data: Vec<f64> = (1..shocks.len())
            .map(|t| shocks[t] + 0.5 * shocks[t - 1])
            .collect();

        let model = fit_arima(&data, ArimaOrder::new(0, 0, 1), true).unwrap();
        assert!(is_invertible(model.ma_coefficients()));
        assert_abs_diff_eq!(model.ma_coefficients()[0], 0.5, epsilon = 0.1);
    }

    #[test]
    fn test_information_criteria() {
        let data = simulate_ar1(0.4, 0.0, 300, 9);
        let model = fit_arima(&data, ArimaOrder::new(1, 0, 0), true).unwrap();

        assert_eq!(model.n_params(), 3);
        assert_abs_diff_eq!(
            model.aic(),
            -2.0 * model.log_likelihood() + 6.0,
            epsilon = 1e-9
        );
        assert!(model.aicc() > model.aic());
        assert!(model.bic() > model.aic());
        assert_eq!(model.name(), "ARIMA(1,0,0) with constant");
    }

    #[test]
    fn test_shared_conditioning_scores_on_one_sample() {
        let data = simulate_random_walk(600, 31);
        let plain = fit_arima_conditional(&data, ArimaOrder::new(0, 1, 0), false, 5).unwrap();
        let lagged = fit_arima_conditional(&data, ArimaOrder::new(5, 1, 0), false, 5).unwrap();

        assert_eq!(plain.n_effective(), 599 - 5);
        assert_eq!(lagged.n_effective(), plain.n_effective());
        // Nested models on one sample: extra lags of white noise barely help
        let gain = 2.0 * (lagged.log_likelihood() - plain.log_likelihood());
        assert!(gain > -1.0);
        assert!(gain < 20.0);
    }

    #[test]
    fn test_conditioning_never_below_ar_order() {
        let data = simulate_ar1(0.5, 0.0, 200, 13);
        let model = fit_arima_conditional(&data, ArimaOrder::new(2, 0, 0), true, 0).unwrap();
        assert_eq!(model.n_effective(), 198);
        assert_eq!(
            model,
            fit_arima(&data, ArimaOrder::new(2, 0, 0), true).unwrap()
        );
    }

    #[test]
    fn test_insufficient_data() {
        let result = fit_arima(&[1.0, 2.0, 3.0], ArimaOrder::new(2, 1, 2), true);
        assert!(matches!(result, Err(MathError::InsufficientData(_))));
    }

    #[test]
    fn test_non_finite_input() {
        let result = fit_arima(&[1.0, f64::NAN, 3.0, 4.0, 5.0], ArimaOrder::new(0, 0, 0), true);
        assert!(matches!(result, Err(MathError::InvalidInput(_))));
    }
}
