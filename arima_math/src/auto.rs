//! Automatic ARIMA order selection
//!
//! Stepwise search in the style of Hyndman and Khandakar: the differencing
//! order comes from repeated KPSS tests, then a small set of starting models
//! is fitted and the search walks to neighbouring orders for as long as the
//! information criterion keeps improving. Orders that fail to fit are
//! recorded and skipped.

use crate::arima::{fit_arima_conditional, ArimaOrder, FittedArima};
use crate::stationarity::ndiffs;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Criterion minimised by the search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InformationCriterion {
    #[default]
    Aic,
    Aicc,
    Bic,
}

impl InformationCriterion {
    /// Score a fitted model, lower is better
    pub fn score(&self, model: &FittedArima) -> f64 {
        match self {
            InformationCriterion::Aic => model.aic(),
            InformationCriterion::Aicc => model.aicc(),
            InformationCriterion::Bic => model.bic(),
        }
    }
}

/// One model considered by the search
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFit {
    pub order: ArimaOrder,
    pub with_constant: bool,
    /// Criterion value, `None` when the fit failed
    pub score: Option<f64>,
}

/// Best model found by [`AutoArima::fit`]
#[derive(Debug, Clone)]
pub struct AutoArimaFit {
    pub model: FittedArima,
    pub score: f64,
    /// Every candidate in the order it was evaluated
    pub candidates: Vec<CandidateFit>,
}

/// Stepwise non-seasonal ARIMA search
///
/// Every candidate conditions on the first `max_p` differenced observations
/// so that criteria are compared on the same residual sample.
#[derive(Debug, Clone)]
pub struct AutoArima {
    max_p: usize,
    max_q: usize,
    max_d: usize,
    max_order: usize,
    start_p: usize,
    start_q: usize,
    max_fits: usize,
    alpha: f64,
    d: Option<usize>,
    criterion: InformationCriterion,
}

impl Default for AutoArima {
    fn default() -> Self {
        Self {
            max_p: 5,
            max_q: 5,
            max_d: 2,
            max_order: 5,
            start_p: 2,
            start_q: 2,
            max_fits: 100,
            alpha: 0.05,
            d: None,
            criterion: InformationCriterion::Aic,
        }
    }
}

const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (1, 1),
    (-1, 1),
    (1, -1),
];

impl AutoArima {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_p(mut self, max_p: usize) -> Self {
        self.max_p = max_p;
        self
    }

    pub fn with_max_q(mut self, max_q: usize) -> Self {
        self.max_q = max_q;
        self
    }

    pub fn with_max_d(mut self, max_d: usize) -> Self {
        self.max_d = max_d;
        self
    }

    /// Cap on `p + q`
    pub fn with_max_order(mut self, max_order: usize) -> Self {
        self.max_order = max_order;
        self
    }

    /// Cap on the number of models fitted
    pub fn with_max_fits(mut self, max_fits: usize) -> Self {
        self.max_fits = max_fits;
        self
    }

    /// Significance level of the KPSS differencing test
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Skip the KPSS test and use a fixed differencing order
    pub fn with_d(mut self, d: Option<usize>) -> Self {
        self.d = d;
        self
    }

    pub fn with_criterion(mut self, criterion: InformationCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn criterion(&self) -> InformationCriterion {
        self.criterion
    }

    /// Run the search on `data`
    pub fn fit(&self, data: &[f64]) -> Result<AutoArimaFit> {
        let d = match self.d {
            Some(d) => d,
            None => ndiffs(data, self.alpha, self.max_d)?,
        };
        let allow_constant = d < 2;

        let mut search = StepwiseSearch {
            config: self,
            data,
            d,
            fitted: HashMap::new(),
            candidates: Vec::new(),
            best: None,
        };

        let start = (self.start_p.min(self.max_p), self.start_q.min(self.max_q));
        search.evaluate(start.0, start.1, allow_constant);
        search.evaluate(0, 0, allow_constant);
        search.evaluate(1, 0, allow_constant);
        search.evaluate(0, 1, allow_constant);
        if allow_constant {
            search.evaluate(0, 0, false);
        }

        while let Some((p, q, constant)) = search.best_key() {
            if search.candidates.len() >= self.max_fits {
                break;
            }

            let mut improved = false;
            for (dp, dq) in NEIGHBOURS {
                let (np, nq) = (p as isize + dp, q as isize + dq);
                if np < 0 || nq < 0 {
                    continue;
                }
                if search.evaluate(np as usize, nq as usize, constant) {
                    improved = true;
                    break;
                }
            }
            if !improved && allow_constant {
                improved = search.evaluate(p, q, !constant);
            }
            if !improved {
                break;
            }
        }

        let tried = search.candidates.len();
        match search.best {
            Some((score, _, model)) => Ok(AutoArimaFit {
                model,
                score,
                candidates: search.candidates,
            }),
            None => Err(MathError::NoValidModel(format!(
                "all {} candidate orders with d = {} failed to fit",
                tried, d
            ))),
        }
    }
}

type CandidateKey = (usize, usize, bool);

struct StepwiseSearch<'a> {
    config: &'a AutoArima,
    data: &'a [f64],
    d: usize,
    fitted: HashMap<CandidateKey, Option<f64>>,
    candidates: Vec<CandidateFit>,
    best: Option<(f64, CandidateKey, FittedArima)>,
}

impl StepwiseSearch<'_> {
    fn best_key(&self) -> Option<CandidateKey> {
        self.best.as_ref().map(|(_, key, _)| *key)
    }

    /// Fit one candidate; returns true when it becomes the new best
    fn evaluate(&mut self, p: usize, q: usize, constant: bool) -> bool {
        let key = (p, q, constant);
        if p > self.config.max_p
            || q > self.config.max_q
            || p + q > self.config.max_order
            || self.fitted.contains_key(&key)
            || self.candidates.len() >= self.config.max_fits
        {
            return false;
        }

        let order = ArimaOrder::new(p, self.d, q);
        let score = fit_arima_conditional(self.data, order, constant, self.config.max_p)
            .ok()
            .map(|model| (self.config.criterion.score(&model), model))
            .filter(|(score, _)| score.is_finite());

        self.fitted.insert(key, score.as_ref().map(|(s, _)| *s));
        self.candidates.push(CandidateFit {
            order,
            with_constant: constant,
            score: score.as_ref().map(|(s, _)| *s),
        });

        match score {
            Some((score, model)) => {
                let better = self
                    .best
                    .as_ref()
                    .map_or(true, |(best_score, _, _)| score < *best_score);
                if better {
                    self.best = Some((score, key, model));
                }
                better
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn simulate_ar1(phi: f64, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let mut value = 0.0;
        (0..n)
            .map(|_| {
                value = phi * value + noise.sample(&mut rng);
                value + 30.0
            })
            .collect()
    }

    fn simulate_random_walk(n: usize, seed: u64) -> Vec<f64> {
        simulate_scaled_walk(n, 1.0, seed)
    }

    fn simulate_scaled_walk(n: usize, sigma: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, sigma).unwrap();
        let mut level = 70.0;
        (0..n)
            .map(|_| {
                level += noise.sample(&mut rng);
                level
            })
            .collect()
    }

    #[test]
    fn test_random_walk_is_differenced_once() {
        let data = simulate_random_walk(400, 17);
        let fit = AutoArima::new().with_max_d(1).fit(&data).unwrap();

        assert_eq!(fit.model.order().d, 1);
        assert!(!fit.candidates.is_empty());
        assert_eq!(fit.score, fit.model.aic());
    }

    #[test]
    fn test_ar1_order_and_coefficient_are_recovered() {
        let data = simulate_ar1(0.8, 1000, 23);
        let fit = AutoArima::new()
            .with_d(Some(0))
            .with_criterion(InformationCriterion::Bic)
            .fit(&data)
            .unwrap();

        assert_eq!(fit.model.order(), ArimaOrder::new(1, 0, 0));
        assert!((fit.model.ar_coefficients()[0] - 0.8).abs() < 0.08);
    }

    #[test]
    fn test_random_walk_selects_pure_difference() {
        for seed in 1..=3 {
            let data = simulate_scaled_walk(1500, 1.5, seed);
            let fit = AutoArima::new()
                .with_d(Some(1))
                .with_criterion(InformationCriterion::Bic)
                .fit(&data)
                .unwrap();

            let order = fit.model.order();
            assert_eq!((order.p, order.q), (0, 0), "seed {} chose {}", seed, order);
        }
    }

    #[test]
    fn test_random_walk_search_does_not_drift_to_max_p() {
        for seed in 1..=5 {
            let data = simulate_scaled_walk(1500, 1.5, seed);
            let fit = AutoArima::new().with_d(Some(1)).fit(&data).unwrap();

            let order = fit.model.order();
            assert!(order.p < 5, "seed {} chose {}", seed, order);
        }
    }

    #[test]
    fn test_best_score_is_minimum_of_candidates() {
        let data = simulate_random_walk(250, 8);
        let fit = AutoArima::new().fit(&data).unwrap();

        let min = fit
            .candidates
            .iter()
            .filter_map(|c| c.score)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(fit.score, min);
    }

    #[test]
    fn test_search_is_deterministic() {
        let data = simulate_random_walk(200, 99);
        let first = AutoArima::new().fit(&data).unwrap();
        let second = AutoArima::new().fit(&data).unwrap();

        assert_eq!(first.model, second.model);
        assert_eq!(first.candidates, second.candidates);
    }

    #[test]
    fn test_bounds_are_respected() {
        let data = simulate_random_walk(200, 4);
        let fit = AutoArima::new()
            .with_max_p(1)
            .with_max_q(1)
            .with_max_fits(6)
            .fit(&data)
            .unwrap();

        assert!(fit.candidates.len() <= 6);
        for candidate in &fit.candidates {
            assert!(candidate.order.p <= 1);
            assert!(candidate.order.q <= 1);
        }
    }

    #[test]
    fn test_no_constant_when_twice_differenced() {
        let data: Vec<f64> = simulate_random_walk(200, 12)
            .iter()
            .scan(0.0, |acc, x| {
                *acc += x;
                Some(*acc)
            })
            .collect();
        let fit = AutoArima::new().with_d(Some(2)).fit(&data).unwrap();

        assert!(fit.candidates.iter().all(|c| !c.with_constant));
    }

    #[test]
    fn test_too_short_series_has_no_valid_model() {
        let result = AutoArima::new().with_d(Some(0)).fit(&[1.0, 2.0]);
        assert!(matches!(result, Err(MathError::NoValidModel(_))));
    }

    #[test]
    fn test_criterion_selection() {
        let data = simulate_random_walk(150, 2);
        let fit = AutoArima::new()
            .with_criterion(InformationCriterion::Bic)
            .fit(&data)
            .unwrap();
        assert_eq!(fit.score, fit.model.bic());
    }
}
