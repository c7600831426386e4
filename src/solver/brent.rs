use super::{budget_error, Bracket, ObjectiveFunction, Solver1D, SolverParams};
use crate::error::PricingResult;

/// Brent's method: inverse quadratic interpolation guarded by bisection.
#[derive(Debug, Clone, Default)]
pub struct Brent {
    pub params: SolverParams,
}

impl Solver1D for Brent {
    fn name(&self) -> &'static str {
        "Brent"
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

        let (mut a, mut b) = (bracket.xmin, bracket.xmax);
        let (mut fa, mut fb) = (bracket.fxmin, bracket.fxmax);
        let (mut c, mut fc) = (b, fb);
        let (mut d, mut e) = (0.0f64, 0.0f64);

        while evaluations <= max {
            if fb * fc > 0.0 {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }
            let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * accuracy;
            let xm = 0.5 * (c - b);
            if xm.abs() <= tol1 || fb == 0.0 {
                return Ok(b);
            }
            if e.abs() >= tol1 && fa.abs() > fb.abs() {
                // Attempt inverse quadratic interpolation.
                let s = fb / fa;
                let (mut p, mut q);
                if a == c {
                    p = 2.0 * xm * s;
                    q = 1.0 - s;
                } else {
                    q = fa / fc;
                    let r = fb / fc;
                    p = s * (2.0 * xm * q * (q - r) - (b - a) * (r - 1.0));
                    q = (q - 1.0) * (r - 1.0) * (s - 1.0);
                }
                if p > 0.0 {
                    q = -q;
                }
                p = p.abs();
                let min1 = 3.0 * xm * q - (tol1 * q).abs();
                let min2 = (e * q).abs();
                if 2.0 * p < min1.min(min2) {
                    e = d;
                    d = p / q;
                } else {
                    d = xm;
                    e = d;
                }
            } else {
                d = xm;
                e = d;
            }
            a = b;
            fa = fb;
            if d.abs() > tol1 {
                b += d;
            } else {
                b += tol1.copysign(xm);
            }
            fb = f.value(b);
            evaluations += 1;
        }

        Err(budget_error(self.name(), accuracy, max))
    }
}
