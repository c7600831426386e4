//! 1-D root finding.
//!
//! [`Solver1D`] supplies the shared bracketing machinery: starting from a
//! guess and a step, the bracket is expanded geometrically until the
//! function changes sign or the evaluation budget runs out. Concrete
//! algorithms only implement the inner refinement, receiving a valid
//! bracket together with the latest endpoint values.

pub mod bisection;
pub mod brent;
pub mod false_position;
pub mod newton;
pub mod newton_safe;
pub mod ridder;
pub mod secant;

pub use bisection::Bisection;
pub use brent::Brent;
pub use false_position::FalsePosition;
pub use newton::Newton;
pub use newton_safe::NewtonSafe;
pub use ridder::Ridder;
pub use secant::Secant;

use crate::error::{IllegalArgument, IllegalResult, PricingError, PricingResult};

const GROWTH_FACTOR: f64 = 1.6;

/// The function whose zero must be found.
pub trait ObjectiveFunction {
    fn value(&self, x: f64) -> f64;

    /// Analytic derivative, when available. Newton-type refinements
    /// require it.
    fn derivative(&self, _x: f64) -> Option<f64> {
        None
    }
}

/// Adapter turning a plain closure into an objective function.
pub struct Objective<F>(pub F);

impl<F: Fn(f64) -> f64> ObjectiveFunction for Objective<F> {
    fn value(&self, x: f64) -> f64 {
        (self.0)(x)
    }
}

/// Pairs a function with its analytic derivative.
pub struct WithDerivative<F, D> {
    pub f: F,
    pub df: D,
}

impl<F: Fn(f64) -> f64, D: Fn(f64) -> f64> ObjectiveFunction for WithDerivative<F, D> {
    fn value(&self, x: f64) -> f64 {
        (self.f)(x)
    }

    fn derivative(&self, x: f64) -> Option<f64> {
        Some((self.df)(x))
    }
}

/// Shared solver configuration.
#[derive(Debug, Clone)]
pub struct SolverParams {
    /// Budget for function evaluations across bracketing and refinement.
    pub max_evaluations: usize,
    /// Optional lower domain bound, enforced on every trial point.
    pub lower_bound: Option<f64>,
    /// Optional upper domain bound, enforced on every trial point.
    pub upper_bound: Option<f64>,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            max_evaluations: 100,
            lower_bound: None,
            upper_bound: None,
        }
    }
}

/// A validated bracket handed to the refinement stage.
#[derive(Debug, Clone, Copy)]
pub struct Bracket {
    pub root: f64,
    pub xmin: f64,
    pub xmax: f64,
    pub fxmin: f64,
    pub fxmax: f64,
    /// Evaluations already spent while bracketing.
    pub evaluations: usize,
}

pub trait Solver1D {
    fn name(&self) -> &'static str;

    fn params(&self) -> &SolverParams;

    /// Refines a valid bracket down to `accuracy`, i.e. returns x* with
    /// |f(x*)| below it or the bracket narrower than it.
    fn refine(
        &self,
        f: &dyn ObjectiveFunction,
        accuracy: f64,
        bracket: Bracket,
    ) -> PricingResult<f64>;

    fn enforce_bounds(&self, x: f64) -> f64 {
        let params = self.params();
        let mut x = x;
        if let Some(low) = params.lower_bound {
            x = x.max(low);
        }
        if let Some(high) = params.upper_bound {
            x = x.min(high);
        }
        x
    }

    /// Finds a zero of `f` starting from `guess`, scanning for a bracket
    /// with the given initial `step`.
    fn solve(
        &self,
        f: &dyn ObjectiveFunction,
        accuracy: f64,
        guess: f64,
        step: f64,
    ) -> PricingResult<f64> {
        validate_accuracy(accuracy)?;
        let max_evaluations = self.params().max_evaluations;

        let mut root = self.enforce_bounds(guess);
        let mut fx_max = f.value(root);
        if fx_max == 0.0 {
            return Ok(root);
        }

        let (mut xmin, mut xmax, mut fx_min);
        if fx_max > 0.0 {
            xmin = self.enforce_bounds(root - step);
            fx_min = f.value(xmin);
            xmax = root;
        } else {
            xmin = root;
            fx_min = fx_max;
            xmax = self.enforce_bounds(root + step);
            fx_max = f.value(xmax);
        }

        let mut evaluations = 2usize;
        let mut flipflop = -1i8;
        while evaluations <= max_evaluations {
            if fx_min * fx_max <= 0.0 {
                if fx_min == 0.0 {
                    return Ok(xmin);
                }
                if fx_max == 0.0 {
                    return Ok(xmax);
                }
                root = 0.5 * (xmax + xmin);
                return self.refine(
                    f,
                    accuracy,
                    Bracket {
                        root,
                        xmin,
                        xmax,
                        fxmin: fx_min,
                        fxmax: fx_max,
                        evaluations,
                    },
                );
            }
            // Expand the side with the smaller residual; alternate when
            // the residuals tie.
            if fx_min.abs() < fx_max.abs() {
                xmin = self.enforce_bounds(xmin + GROWTH_FACTOR * (xmin - xmax));
                fx_min = f.value(xmin);
            } else if fx_min.abs() > fx_max.abs() {
                xmax = self.enforce_bounds(xmax + GROWTH_FACTOR * (xmax - xmin));
                fx_max = f.value(xmax);
            } else if flipflop == -1 {
                xmin = self.enforce_bounds(xmin + GROWTH_FACTOR * (xmin - xmax));
                fx_min = f.value(xmin);
                flipflop = 1;
            } else {
                xmax = self.enforce_bounds(xmax + GROWTH_FACTOR * (xmax - xmin));
                fx_max = f.value(xmax);
                flipflop = -1;
            }
            evaluations += 1;
        }

        Err(PricingError::IllegalResult(
            IllegalResult::EvaluationBudgetExceeded {
                algorithm: self.name(),
                max_evaluations,
            },
        ))
    }

    /// Finds a zero of `f` inside the explicit bracket [`xmin`, `xmax`].
    fn solve_bracketed(
        &self,
        f: &dyn ObjectiveFunction,
        accuracy: f64,
        guess: f64,
        xmin: f64,
        xmax: f64,
    ) -> PricingResult<f64> {
        validate_accuracy(accuracy)?;
        if xmin >= xmax {
            return Err(invalid_bracket(xmin, xmax, "xmin must be below xmax"));
        }
        if guess < xmin || guess > xmax {
            return Err(invalid_bracket(xmin, xmax, "guess outside the bracket"));
        }

        let fxmin = f.value(xmin);
        if fxmin == 0.0 {
            return Ok(xmin);
        }
        let fxmax = f.value(xmax);
        if fxmax == 0.0 {
            return Ok(xmax);
        }
        if fxmin * fxmax > 0.0 {
            return Err(invalid_bracket(
                xmin,
                xmax,
                "function values have the same sign at both endpoints",
            ));
        }

        self.refine(
            f,
            accuracy,
            Bracket {
                root: guess,
                xmin,
                xmax,
                fxmin,
                fxmax,
                evaluations: 2,
            },
        )
    }
}

fn validate_accuracy(accuracy: f64) -> PricingResult<()> {
    if accuracy <= 0.0 {
        return Err(PricingError::illegal_argument(format!(
            "accuracy ({accuracy}) must be positive"
        )));
    }
    Ok(())
}

fn invalid_bracket(xmin: f64, xmax: f64, reason: &str) -> PricingError {
    PricingError::IllegalArgument(IllegalArgument::InvalidBracket {
        xmin,
        xmax,
        reason: reason.to_string(),
    })
}

pub(crate) fn budget_error(name: &'static str, accuracy: f64, max: usize) -> PricingError {
    PricingError::IllegalResult(IllegalResult::RootNotFound {
        algorithm: name,
        accuracy,
        max_evaluations: max,
    })
}
