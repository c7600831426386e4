//! Least-squares optimization for model calibration.

use crate::error::{IllegalResult, PricingError, PricingResult};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

/// Stopping rules for iterative optimizers.
#[derive(Debug, Clone)]
pub struct EndCriteria {
    pub max_iterations: usize,
    pub max_stationary_state_iterations: usize,
    /// Minimum meaningful step in parameter space.
    pub root_epsilon: f64,
    /// Minimum meaningful improvement of the cost function.
    pub function_epsilon: f64,
    /// Gradient norm below which the point counts as critical.
    pub gradient_norm_epsilon: f64,
}

impl Default for EndCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 400,
            max_stationary_state_iterations: 50,
            root_epsilon: 1e-8,
            function_epsilon: 1e-9,
            gradient_norm_epsilon: 1e-8,
        }
    }
}

/// Which criterion ended the minimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoppedBy {
    StationaryPoint,
    StationaryFunctionValue,
    ZeroGradientNorm,
    MaxIterations,
}

#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub parameters: Vec<f64>,
    pub cost: f64,
    pub iterations: usize,
    pub stopped_by: StoppedBy,
}

/// A residual vector whose squared norm is to be minimized.
pub trait LeastSquaresProblem {
    fn residuals(&mut self, parameters: &[f64]) -> PricingResult<Vec<f64>>;
}

impl<F> LeastSquaresProblem for F
where
    F: FnMut(&[f64]) -> PricingResult<Vec<f64>>,
{
    fn residuals(&mut self, parameters: &[f64]) -> PricingResult<Vec<f64>> {
        self(parameters)
    }
}

/// Damped Gauss-Newton (Levenberg-Marquardt) minimizer with a numerical
/// Jacobian.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    pub initial_lambda: f64,
    pub lambda_scale: f64,
    pub max_lambda: f64,
    /// Relative step for the finite-difference Jacobian.
    pub jacobian_step: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self {
            initial_lambda: 1e-3,
            lambda_scale: 10.0,
            max_lambda: 1e12,
            jacobian_step: 1e-6,
        }
    }
}

impl LevenbergMarquardt {
    pub fn minimize<P: LeastSquaresProblem>(
        &self,
        problem: &mut P,
        initial: &[f64],
        criteria: &EndCriteria,
    ) -> PricingResult<OptimizationResult> {
        let n = initial.len();
        let mut x = DVector::from_column_slice(initial);
        let mut r = DVector::from_vec(problem.residuals(x.as_slice())?);
        let mut cost = r.norm_squared();
        let mut lambda = self.initial_lambda;
        let mut stationary = 0usize;

        for iteration in 1..=criteria.max_iterations {
            let jacobian = self.numerical_jacobian(problem, &x, &r)?;
            let gradient = jacobian.transpose() * &r;
            if gradient.amax() < criteria.gradient_norm_epsilon {
                return Ok(result(x, cost, iteration, StoppedBy::ZeroGradientNorm));
            }
            let approx_hessian = jacobian.transpose() * &jacobian;

            // Inner damping loop: grow lambda until a step improves the
            // cost.
            loop {
                let mut damped = approx_hessian.clone();
                for i in 0..n {
                    damped[(i, i)] += lambda * approx_hessian[(i, i)].max(1e-12);
                }
                let step = damped
                    .lu()
                    .solve(&(-&gradient))
                    .ok_or(PricingError::IllegalResult(IllegalResult::OptimizerStalled))?;

                let candidate = &x + &step;
                if step.norm() < criteria.root_epsilon * (criteria.root_epsilon + x.norm()) {
                    return Ok(result(candidate, cost, iteration, StoppedBy::StationaryPoint));
                }
                let r_candidate = DVector::from_vec(problem.residuals(candidate.as_slice())?);
                let cost_candidate = r_candidate.norm_squared();
                if cost_candidate < cost {
                    let improvement = cost - cost_candidate;
                    x = candidate;
                    r = r_candidate;
                    cost = cost_candidate;
                    lambda = (lambda / self.lambda_scale).max(1e-12);
                    debug!(iteration, cost, lambda, "levenberg-marquardt step accepted");
                    if improvement < criteria.function_epsilon * (1.0 + cost) {
                        stationary += 1;
                        if stationary >= criteria.max_stationary_state_iterations {
                            return Ok(result(
                                x,
                                cost,
                                iteration,
                                StoppedBy::StationaryFunctionValue,
                            ));
                        }
                    } else {
                        stationary = 0;
                    }
                    break;
                }
                lambda *= self.lambda_scale;
                if lambda > self.max_lambda {
                    // No direction improves the cost any more.
                    return Ok(result(x, cost, iteration, StoppedBy::StationaryPoint));
                }
            }
        }

        Ok(result(
            x,
            cost,
            criteria.max_iterations,
            StoppedBy::MaxIterations,
        ))
    }

    fn numerical_jacobian<P: LeastSquaresProblem>(
        &self,
        problem: &mut P,
        x: &DVector<f64>,
        r0: &DVector<f64>,
    ) -> PricingResult<DMatrix<f64>> {
        let (m, n) = (r0.len(), x.len());
        let mut jacobian = DMatrix::zeros(m, n);
        for j in 0..n {
            let h = self.jacobian_step * x[j].abs().max(1.0);
            let mut shifted = x.clone();
            shifted[j] += h;
            let up = DVector::from_vec(problem.residuals(shifted.as_slice())?);
            shifted[j] = x[j] - h;
            let down = DVector::from_vec(problem.residuals(shifted.as_slice())?);
            let column = (up - down) / (2.0 * h);
            jacobian.set_column(j, &column);
        }
        Ok(jacobian)
    }
}

fn result(x: DVector<f64>, cost: f64, iterations: usize, stopped_by: StoppedBy) -> OptimizationResult {
    OptimizationResult {
        parameters: x.as_slice().to_vec(),
        cost,
        iterations,
        stopped_by,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_a_quadratic_exactly() {
        // Fit y = a + b t + c t² through noiseless samples.
        let data: Vec<(f64, f64)> = (0..10)
            .map(|i| {
                let t = i as f64 / 3.0;
                (t, 1.5 - 0.5 * t + 2.0 * t * t)
            })
            .collect();
        let mut problem = |p: &[f64]| -> PricingResult<Vec<f64>> {
            Ok(data
                .iter()
                .map(|&(t, y)| p[0] + p[1] * t + p[2] * t * t - y)
                .collect())
        };
        let lm = LevenbergMarquardt::default();
        let out = lm
            .minimize(&mut problem, &[0.0, 0.0, 0.0], &EndCriteria::default())
            .unwrap();
        assert!((out.parameters[0] - 1.5).abs() < 1e-6);
        assert!((out.parameters[1] + 0.5).abs() < 1e-6);
        assert!((out.parameters[2] - 2.0).abs() < 1e-6);
        assert!(out.cost < 1e-12);
    }

    #[test]
    fn rosenbrock_valley() {
        let mut problem = |p: &[f64]| -> PricingResult<Vec<f64>> {
            Ok(vec![10.0 * (p[1] - p[0] * p[0]), 1.0 - p[0]])
        };
        let lm = LevenbergMarquardt::default();
        let criteria = EndCriteria {
            max_iterations: 2000,
            ..EndCriteria::default()
        };
        let out = lm.minimize(&mut problem, &[-1.2, 1.0], &criteria).unwrap();
        assert!((out.parameters[0] - 1.0).abs() < 1e-4);
        assert!((out.parameters[1] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn iteration_cap_is_honored() {
        let mut problem = |p: &[f64]| -> PricingResult<Vec<f64>> {
            Ok(vec![(p[0] - 3.0) * (p[0] - 3.0) + 1.0])
        };
        let lm = LevenbergMarquardt::default();
        let criteria = EndCriteria {
            max_iterations: 3,
            ..EndCriteria::default()
        };
        let out = lm.minimize(&mut problem, &[0.0], &criteria).unwrap();
        assert!(out.iterations <= 3);
    }
}
