use super::{StochasticProcess, StochasticProcess1D};
use crate::common::{Real, Time};
use crate::handle::Handle;
use crate::math::matrix::cholesky_factor;
use crate::{
    error::{IllegalArgument, PricingError, PricingResult},
};
use nalgebra::DMatrix;

/// Couples independent 1-D processes through a correlation matrix.
///
/// The matrix is Cholesky-factorized once at construction; each step
/// rotates the iid noise vector by the factor before the component-wise
/// `evolve`.
pub struct StochasticProcessArray {
    processes: Vec<Handle<dyn StochasticProcess1D>>,
    sqrt_correlation: DMatrix<Real>,
}

impl StochasticProcessArray {
    pub fn new(
        processes: Vec<Handle<dyn StochasticProcess1D>>,
        correlation: DMatrix<Real>,
    ) -> PricingResult<Self> {
        if processes.is_empty() {
            return Err(PricingError::illegal_argument(
                "no processes given to the array",
            ));
        }
        if correlation.nrows() != processes.len() {
            return Err(PricingError::IllegalArgument(
                IllegalArgument::DimensionMismatch {
                    expected: processes.len(),
                    actual: correlation.nrows(),
                },
            ));
        }
        let sqrt_correlation = cholesky_factor(&correlation)?;
        Ok(Self {
            processes,
            sqrt_correlation,
        })
    }

    fn correlate(&self, dw: &[Real]) -> Vec<Real> {
        let n = self.processes.len();
        (0..n)
            .map(|i| {
                (0..=i)
                    .map(|j| self.sqrt_correlation[(i, j)] * dw[j])
                    .sum()
            })
            .collect()
    }
}

impl StochasticProcess for StochasticProcessArray {
    fn size(&self) -> usize {
        self.processes.len()
    }

    fn initial_values(&self) -> Vec<Real> {
        self.processes.iter().map(|p| p.x0()).collect()
    }

    fn drift(&self, t: Time, x: &[Real]) -> Vec<Real> {
        self.processes
            .iter()
            .zip(x)
            .map(|(p, &xi)| p.drift(t, xi))
            .collect()
    }

    fn evolve(&self, t0: Time, x0: &[Real], dt: Time, dw: &[Real]) -> Vec<Real> {
        let dz = self.correlate(dw);
        self.processes
            .iter()
            .zip(x0)
            .zip(dz)
            .map(|((p, &xi), zi)| p.evolve(t0, xi, dt, zi))
            .collect()
    }
}
