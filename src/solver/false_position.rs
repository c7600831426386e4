use super::{budget_error, Bracket, ObjectiveFunction, Solver1D, SolverParams};
use crate::error::PricingResult;

/// Linear interpolation between the bracket endpoints, keeping the root
/// bracketed at every step.
#[derive(Debug, Clone, Default)]
pub struct FalsePosition {
    pub params: SolverParams,
}

impl Solver1D for FalsePosition {
    fn name(&self) -> &'static str {
        "FalsePosition"
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

        let (mut xl, mut fl, mut xh, mut fh) = if bracket.fxmin < 0.0 {
            (bracket.xmin, bracket.fxmin, bracket.xmax, bracket.fxmax)
        } else {
            (bracket.xmax, bracket.fxmax, bracket.xmin, bracket.fxmin)
        };

        while evaluations <= max {
            let root = xl + (xh - xl) * fl / (fl - fh);
            let froot = f.value(root);
            evaluations += 1;
            let del = if froot < 0.0 {
                let del = xl - root;
                xl = root;
                fl = froot;
                del
            } else {
                let del = xh - root;
                xh = root;
                fh = froot;
                del
            };
            if del.abs() < accuracy || froot == 0.0 {
                return Ok(root);
            }
        }

        Err(budget_error(self.name(), accuracy, max))
    }
}
