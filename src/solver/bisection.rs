use super::{budget_error, Bracket, ObjectiveFunction, Solver1D, SolverParams};
use crate::error::PricingResult;

/// Plain interval halving. Slow and unconditionally convergent.
#[derive(Debug, Clone, Default)]
pub struct Bisection {
    pub params: SolverParams,
}

impl Solver1D for Bisection {
    fn name(&self) -> &'static str {
        "Bisection"
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

        // Orient the interval so the step is taken from the side where f
        // is negative.
        let (mut dx, mut root) = if bracket.fxmin < 0.0 {
            (bracket.xmax - bracket.xmin, bracket.xmin)
        } else {
            (bracket.xmin - bracket.xmax, bracket.xmax)
        };

        while evaluations <= max {
            dx /= 2.0;
            let xmid = root + dx;
            let fmid = f.value(xmid);
            evaluations += 1;
            if fmid <= 0.0 {
                root = xmid;
            }
            if dx.abs() < accuracy || fmid == 0.0 {
                return Ok(root);
            }
        }

        Err(budget_error(self.name(), accuracy, max))
    }
}
