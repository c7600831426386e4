use super::{budget_error, Bracket, ObjectiveFunction, Solver1D, SolverParams};
use crate::error::{PricingError, PricingResult};

/// Newton iteration that falls back to bisection whenever a step would
/// leave the bracket or converge too slowly.
#[derive(Debug, Clone, Default)]
pub struct NewtonSafe {
    pub params: SolverParams,
}

pub(crate) fn derivative_or_err(
    f: &dyn ObjectiveFunction,
    x: f64,
    algorithm: &'static str,
) -> PricingResult<f64> {
    f.derivative(x).ok_or_else(|| {
        PricingError::illegal_argument(format!(
            "{algorithm} requires an objective function with a derivative"
        ))
    })
}

pub(crate) fn refine_safe(
    name: &'static str,
    f: &dyn ObjectiveFunction,
    accuracy: f64,
    bracket: Bracket,
    max: usize,
) -> PricingResult<f64> {
    let mut evaluations = bracket.evaluations;

    // Orient so that f(xl) < 0 < f(xh).
    let (mut xl, mut xh) = if bracket.fxmin < 0.0 {
        (bracket.xmin, bracket.xmax)
    } else {
        (bracket.xmax, bracket.xmin)
    };

    let mut root = bracket.root;
    let mut dx_old = (bracket.xmax - bracket.xmin).abs();
    let mut dx = dx_old;
    let mut froot = f.value(root);
    let mut dfroot = derivative_or_err(f, root, name)?;
    evaluations += 1;

    while evaluations <= max {
        let newton_escapes = ((root - xh) * dfroot - froot) * ((root - xl) * dfroot - froot) > 0.0;
        let newton_too_slow = (2.0 * froot).abs() > (dx_old * dfroot).abs();
        if newton_escapes || newton_too_slow {
            dx_old = dx;
            dx = 0.5 * (xh - xl);
            root = xl + dx;
        } else {
            dx_old = dx;
            dx = froot / dfroot;
            root -= dx;
        }
        if dx.abs() < accuracy {
            return Ok(root);
        }
        froot = f.value(root);
        dfroot = derivative_or_err(f, root, name)?;
        evaluations += 1;
        if froot < 0.0 {
            xl = root;
        } else {
            xh = root;
        }
    }

    Err(budget_error(name, accuracy, max))
}

impl Solver1D for NewtonSafe {
    fn name(&self) -> &'static str {
        "NewtonSafe"
    }

    fn params(&self) -> &SolverParams {
        &self.params
    }

    fn refine(
        &self,
        f: &dyn ObjectiveFunction,
        accuracy: f64,
        bracket: Bracket,
    ) -> PricingResult<f64> {
        refine_safe(self.name(), f, accuracy, bracket, self.params.max_evaluations)
    }
}
