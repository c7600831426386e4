use crate::common::{Real, Time};
use crate::{error::PricingResult, require};
use ndarray::Array1;
use std::rc::Rc;

/// Coefficients recomputed when the operator is time dependent:
/// returns (below, diagonal, above).
pub type TimeSetter = Rc<dyn Fn(Time) -> (Vec<Real>, Vec<Real>, Vec<Real>)>;

/// Tridiagonal linear map on a discretized value array.
///
/// `below[0]` and `above[n-1]` are unused padding so all three bands have
/// the array length.
#[derive(Clone)]
pub struct TridiagonalOperator {
    below: Vec<Real>,
    diag: Vec<Real>,
    above: Vec<Real>,
    time_setter: Option<TimeSetter>,
}

impl TridiagonalOperator {
    pub fn new(below: Vec<Real>, diag: Vec<Real>, above: Vec<Real>) -> PricingResult<Self> {
        require!(
            diag.len() >= 3,
            "operator needs at least three grid points, got {}",
            diag.len()
        );
        require!(
            below.len() == diag.len() && above.len() == diag.len(),
            "operator bands must share the array length"
        );
        Ok(Self {
            below,
            diag,
            above,
            time_setter: None,
        })
    }

    pub fn identity(size: usize) -> Self {
        Self {
            below: vec![0.0; size],
            diag: vec![1.0; size],
            above: vec![0.0; size],
            time_setter: None,
        }
    }

    pub fn with_time_setter(mut self, setter: TimeSetter) -> Self {
        self.time_setter = Some(setter);
        self
    }

    pub fn size(&self) -> usize {
        self.diag.len()
    }

    pub fn is_time_dependent(&self) -> bool {
        self.time_setter.is_some()
    }

    /// Recomputes the bands for a time-dependent operator; a no-op
    /// otherwise.
    pub fn set_time(&mut self, t: Time) {
        if let Some(setter) = &self.time_setter {
            let (below, diag, above) = setter(t);
            debug_assert_eq!(diag.len(), self.diag.len());
            self.below = below;
            self.diag = diag;
            self.above = above;
        }
    }

    /// y = L·x.
    pub fn apply_to(&self, x: &Array1<Real>) -> Array1<Real> {
        let n = self.size();
        debug_assert_eq!(x.len(), n);
        let mut y = Array1::zeros(n);
        y[0] = self.diag[0] * x[0] + self.above[0] * x[1];
        for i in 1..n - 1 {
            y[i] = self.below[i] * x[i - 1] + self.diag[i] * x[i] + self.above[i] * x[i + 1];
        }
        y[n - 1] = self.below[n - 1] * x[n - 2] + self.diag[n - 1] * x[n - 1];
        y
    }

    /// Solves L·x = rhs by the Thomas algorithm.
    pub fn solve_for(&self, rhs: &Array1<Real>) -> PricingResult<Array1<Real>> {
        let n = self.size();
        debug_assert_eq!(rhs.len(), n);
        let mut scratch = vec![0.0; n];
        let mut x = Array1::zeros(n);

        let mut bet = self.diag[0];
        require!(bet != 0.0, "singular tridiagonal system: zero head pivot");
        x[0] = rhs[0] / bet;
        for i in 1..n {
            scratch[i] = self.above[i - 1] / bet;
            bet = self.diag[i] - self.below[i] * scratch[i];
            require!(bet != 0.0, "singular tridiagonal system at row {}", i);
            x[i] = (rhs[i] - self.below[i] * x[i - 1]) / bet;
        }
        for i in (0..n - 1).rev() {
            let correction = scratch[i + 1] * x[i + 1];
            x[i] -= correction;
        }
        Ok(x)
    }

    /// I + factor·L, the building block of the implicit/explicit schemes.
    pub fn identity_plus_scaled(&self, factor: Real) -> Self {
        let n = self.size();
        let mut out = self.scaled(factor);
        for i in 0..n {
            out.diag[i] += 1.0;
        }
        out
    }

    pub fn scaled(&self, factor: Real) -> Self {
        Self {
            below: self.below.iter().map(|&v| v * factor).collect(),
            diag: self.diag.iter().map(|&v| v * factor).collect(),
            above: self.above.iter().map(|&v| v * factor).collect(),
            time_setter: self.time_setter.clone(),
        }
    }

    pub fn plus(&self, other: &Self) -> PricingResult<Self> {
        require!(
            self.size() == other.size(),
            "operator size mismatch: {} vs {}",
            self.size(),
            other.size()
        );
        Ok(Self {
            below: zip_add(&self.below, &other.below),
            diag: zip_add(&self.diag, &other.diag),
            above: zip_add(&self.above, &other.above),
            time_setter: None,
        })
    }

    pub fn minus(&self, other: &Self) -> PricingResult<Self> {
        self.plus(&other.scaled(-1.0))
    }

    /// Overwrites the first row, e.g. for boundary conditions.
    pub fn set_first_row(&mut self, diag: Real, above: Real) {
        self.diag[0] = diag;
        self.above[0] = above;
    }

    /// Overwrites the last row.
    pub fn set_last_row(&mut self, below: Real, diag: Real) {
        let n = self.size();
        self.below[n - 1] = below;
        self.diag[n - 1] = diag;
    }
}

fn zip_add(a: &[Real], b: &[Real]) -> Vec<Real> {
    a.iter().zip(b).map(|(&x, &y)| x + y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn laplacian(n: usize) -> TridiagonalOperator {
        TridiagonalOperator::new(vec![1.0; n], vec![-2.0; n], vec![1.0; n]).unwrap()
    }

    #[test]
    fn identity_maps_to_itself() {
        let identity = TridiagonalOperator::identity(5);
        let x = array![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(identity.apply_to(&x), x);
    }

    #[test]
    fn solve_inverts_apply() {
        let op = laplacian(6).identity_plus_scaled(-0.3);
        let x = array![0.5, 1.5, -2.0, 3.0, 0.0, 1.0];
        let y = op.apply_to(&x);
        let back = op.solve_for(&y).unwrap();
        for (a, b) in back.iter().zip(x.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn algebra_is_componentwise() {
        let a = laplacian(4);
        let b = a.scaled(2.0);
        let sum = a.plus(&b).unwrap();
        let x = array![1.0, 1.0, 1.0, 1.0];
        let expected = a.apply_to(&x) * 3.0;
        let got = sum.apply_to(&x);
        for (u, v) in got.iter().zip(expected.iter()) {
            assert!((u - v).abs() < 1e-14);
        }
    }

    #[test]
    fn time_setter_refreshes_coefficients() {
        let n = 4;
        let mut op = TridiagonalOperator::identity(n).with_time_setter(Rc::new(move |t| {
            (vec![0.0; n], vec![t; n], vec![0.0; n])
        }));
        assert!(op.is_time_dependent());
        op.set_time(3.0);
        let x = array![1.0, 1.0, 1.0, 1.0];
        assert_eq!(op.apply_to(&x), array![3.0, 3.0, 3.0, 3.0]);
    }
}
