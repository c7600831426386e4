use super::{budget_error, Bracket, ObjectiveFunction, Solver1D, SolverParams};
use crate::error::PricingResult;

/// Secant iteration from the better bracket endpoint.
///
/// Fast but not guaranteed to stay inside the bracket; prefer
/// [`super::Brent`] when robustness matters.
#[derive(Debug, Clone, Default)]
pub struct Secant {
    pub params: SolverParams,
}

impl Solver1D for Secant {
    fn name(&self) -> &'static str {
        "Secant"
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
        let max = self.params.max_evaluations;
        let mut evaluations = bracket.evaluations;

        // Start from the endpoint with the smaller residual.
        let (mut root, mut froot, mut xl, mut fl) =
            if bracket.fxmin.abs() < bracket.fxmax.abs() {
                (bracket.xmin, bracket.fxmin, bracket.xmax, bracket.fxmax)
            } else {
                (bracket.xmax, bracket.fxmax, bracket.xmin, bracket.fxmin)
            };

        while evaluations <= max {
            let dx = (xl - root) * froot / (froot - fl);
            xl = root;
            fl = froot;
            root += dx;
            froot = f.value(root);
            evaluations += 1;
            if dx.abs() < accuracy || froot == 0.0 {
                return Ok(root);
            }
        }

        Err(budget_error(self.name(), accuracy, max))
    }
}
