use super::newton_safe::{derivative_or_err, refine_safe};
use super::{budget_error, Bracket, ObjectiveFunction, Solver1D, SolverParams};
use crate::error::PricingResult;

/// Plain Newton iteration; hands over to the safeguarded variant when an
/// iterate escapes the bracket.
#[derive(Debug, Clone, Default)]
pub struct Newton {
    pub params: SolverParams,
}

impl Solver1D for Newton {
    fn name(&self) -> &'static str {
        "Newton"
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
        let mut root = bracket.root;

        while evaluations <= max {
            let froot = f.value(root);
            let dfroot = derivative_or_err(f, root, self.name())?;
            evaluations += 1;
            let dx = froot / dfroot;
            root -= dx;
            if (bracket.xmin - root) * (root - bracket.xmax) < 0.0 {
                // Jumped out of the bracket: restart safeguarded.
                return refine_safe(
                    self.name(),
                    f,
                    accuracy,
                    Bracket {
                        root: 0.5 * (bracket.xmin + bracket.xmax),
                        evaluations,
                        ..bracket
                    },
                    max,
                );
            }
            if dx.abs() < accuracy {
                return Ok(root);
            }
        }

        Err(budget_error(self.name(), accuracy, max))
    }
}
