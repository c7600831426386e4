use super::{budget_error, Bracket, ObjectiveFunction, Solver1D, SolverParams};
use crate::error::{PricingError, PricingResult};

/// Ridder's method: exponential correction of the bracket midpoint.
#[derive(Debug, Clone, Default)]
pub struct Ridder {
    pub params: SolverParams,
}

impl Solver1D for Ridder {
    fn name(&self) -> &'static str {
        "Ridder"
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

        let (mut xl, mut fl) = (bracket.xmin, bracket.fxmin);
        let (mut xh, mut fh) = (bracket.xmax, bracket.fxmax);
        let mut root: Option<f64> = None;

        while evaluations <= max {
            let xm = 0.5 * (xl + xh);
            let fm = f.value(xm);
            evaluations += 1;
            let s = (fm * fm - fl * fh).sqrt();
            if s == 0.0 {
                return root.ok_or_else(|| {
                    PricingError::assertion("Ridder stalled before producing an iterate")
                });
            }
            let sign = if fl >= fh { 1.0 } else { -1.0 };
            let xnew = xm + (xm - xl) * sign * fm / s;
            if let Some(prev) = root {
                if (xnew - prev).abs() <= accuracy {
                    return Ok(prev);
                }
            }
            let froot = f.value(xnew);
            evaluations += 1;
            root = Some(xnew);
            if froot == 0.0 {
                return Ok(xnew);
            }
            // Re-bracket with the midpoint and the new iterate.
            if fm.copysign(froot) != fm {
                xl = xm;
                fl = fm;
                xh = xnew;
                fh = froot;
            } else if fl.copysign(froot) != fl {
                xh = xnew;
                fh = froot;
            } else if fh.copysign(froot) != fh {
                xl = xnew;
                fl = froot;
            } else {
                return Err(PricingError::assertion(
                    "Ridder lost the bracket; function may be discontinuous",
                ));
            }
            if (xh - xl).abs() <= accuracy {
                return Ok(xnew);
            }
        }

        Err(budget_error(self.name(), accuracy, max))
    }
}
