//! Derivative-free minimisation
//!
//! A Nelder–Mead simplex search used to estimate ARIMA coefficients. The
//! objective is treated as a black box; infeasible points can be signalled
//! by returning a large or non-finite value.

/// Nelder–Mead simplex minimiser
#[derive(Debug, Clone)]
pub struct NelderMead {
    max_iterations: usize,
    tolerance: f64,
    initial_step: f64,
}

/// Outcome of a minimisation run
#[derive(Debug, Clone)]
pub struct Minimum {
    /// Best point found
    pub point: Vec<f64>,
    /// Objective value at `point`
    pub value: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Whether the simplex spread dropped below the tolerance
    pub converged: bool,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1e-9,
            initial_step: 0.1,
        }
    }
}

impl NelderMead {
    /// Create a minimiser with the default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the iteration cap
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance on the spread of objective values
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the offset used to build the initial simplex around the start point
    pub fn with_initial_step(mut self, initial_step: f64) -> Self {
        self.initial_step = initial_step;
        self
    }

    /// Minimise `objective` starting from `start`
    pub fn minimize<F>(&self, objective: F, start: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let dim = start.len();
        let eval = |x: &[f64]| {
            let v = objective(x);
            if v.is_finite() {
                v
            } else {
                f64::MAX
            }
        };

        if dim == 0 {
            return Minimum {
                point: Vec::new(),
                value: eval(start),
                iterations: 0,
                converged: true,
            };
        }

        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
        simplex.push(start.to_vec());
        for i in 0..dim {
            let mut vertex = start.to_vec();
            vertex[i] += if vertex[i].abs() > 1e-8 {
                self.initial_step * vertex[i].abs().max(1.0)
            } else {
                self.initial_step
            };
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;

            let mut order: Vec<usize> = (0..=dim).collect();
            order.sort_by(|&a, &b| {
                values[a]
                    .partial_cmp(&values[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            simplex = order.iter().map(|&i| simplex[i].clone()).collect();
            values = order.iter().map(|&i| values[i]).collect();

            let best = values[0];
            let worst = values[dim];
            if (worst - best).abs() <= self.tolerance * (1.0 + best.abs()) {
                converged = true;
                break;
            }

            let centroid: Vec<f64> = (0..dim)
                .map(|j| simplex[..dim].iter().map(|v| v[j]).sum::<f64>() / dim as f64)
                .collect();

            let along = |coef: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(simplex[dim].iter())
                    .map(|(c, w)| c + coef * (c - w))
                    .collect()
            };

            let reflected = along(REFLECTION);
            let reflected_value = eval(&reflected);

            if reflected_value < values[0] {
                let expanded = along(EXPANSION);
                let expanded_value = eval(&expanded);
                if expanded_value < reflected_value {
                    simplex[dim] = expanded;
                    values[dim] = expanded_value;
                } else {
                    simplex[dim] = reflected;
                    values[dim] = reflected_value;
                }
                continue;
            }

            if reflected_value < values[dim - 1] {
                simplex[dim] = reflected;
                values[dim] = reflected_value;
                continue;
            }

            let (contracted, contracted_value) = if reflected_value < values[dim] {
                let point = along(CONTRACTION);
                let value = eval(&point);
                (point, value)
            } else {
                let point = along(-CONTRACTION);
                let value = eval(&point);
                (point, value)
            };

            if contracted_value < values[dim].min(reflected_value) {
                simplex[dim] = contracted;
                values[dim] = contracted_value;
                continue;
            }

            // Shrink towards the best vertex
            let best_vertex = simplex[0].clone();
            for i in 1..=dim {
                simplex[i] = best_vertex
                    .iter()
                    .zip(simplex[i].iter())
                    .map(|(b, x)| b + SHRINK * (x - b))
                    .collect();
                values[i] = eval(&simplex[i]);
            }
        }

        let best = values
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0);

        Minimum {
            point: simplex[best].clone(),
            value: values[best],
            iterations,
            converged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_quadratic_bowl() {
        let objective = |x: &[f64]| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2);
        let result = NelderMead::new().minimize(objective, &[0.0, 0.0]);

        assert!(result.converged);
        assert_abs_diff_eq!(result.point[0], 3.0, epsilon = 1e-3);
        assert_abs_diff_eq!(result.point[1], -1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_rosenbrock() {
        let objective = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let result = NelderMead::new()
            .with_max_iterations(5000)
            .minimize(objective, &[-1.2, 1.0]);

        assert_abs_diff_eq!(result.point[0], 1.0, epsilon = 1e-2);
        assert_abs_diff_eq!(result.point[1], 1.0, epsilon = 1e-2);
    }

    #[test]
    fn test_infeasible_region_is_avoided() {
        // Minimum of the unconstrained parabola lies outside |x| < 1
        let objective = |x: &[f64]| {
            if x[0].abs() >= 1.0 {
                f64::NAN
            } else {
                (x[0] - 2.0).powi(2)
            }
        };
        let result = NelderMead::new().minimize(objective, &[0.0]);

        assert!(result.point[0] < 1.0);
        assert!(result.point[0] > 0.9);
    }

    #[test]
    fn test_zero_dimensional() {
        let result = NelderMead::new().minimize(|_| 4.0, &[]);
        assert_eq!(result.value, 4.0);
        assert!(result.point.is_empty());
    }
}
