use crate::common::Real;
use crate::{error::PricingResult, require};
use ndarray::Array1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    None,
    /// The stored value is the difference between the two outermost nodes
    /// (f₁ − f₀ at the lower edge, f_{n-1} − f_{n-2} at the upper), NOT
    /// the derivative itself.
    Neumann,
    Dirichlet,
}

#[derive(Debug, Clone, Copy)]
pub struct BoundaryCondition {
    kind: BoundaryKind,
    value: Real,
}

impl BoundaryCondition {
    pub fn none() -> Self {
        Self {
            kind: BoundaryKind::None,
            value: 0.0,
        }
    }

    pub fn new(kind: BoundaryKind, value: Real) -> PricingResult<Self> {
        require!(
            kind == BoundaryKind::None || value.is_finite(),
            "a finite value must be supplied for this boundary condition"
        );
        Ok(Self { kind, value })
    }

    pub fn kind(&self) -> BoundaryKind {
        self.kind
    }

    pub fn value(&self) -> Real {
        self.value
    }

    /// Rewrites the edge row of an implicit system and its right-hand
    /// side.
    pub(crate) fn fix_lower_system(
        &self,
        op: &mut super::TridiagonalOperator,
        rhs: &mut Array1<Real>,
    ) {
        match self.kind {
            BoundaryKind::None => {}
            BoundaryKind::Dirichlet => {
                op.set_first_row(1.0, 0.0);
                rhs[0] = self.value;
            }
            BoundaryKind::Neumann => {
                // f₁ − f₀ = value.
                op.set_first_row(-1.0, 1.0);
                rhs[0] = self.value;
            }
        }
    }

    pub(crate) fn fix_upper_system(
        &self,
        op: &mut super::TridiagonalOperator,
        rhs: &mut Array1<Real>,
    ) {
        let n = rhs.len();
        match self.kind {
            BoundaryKind::None => {}
            BoundaryKind::Dirichlet => {
                op.set_last_row(0.0, 1.0);
                rhs[n - 1] = self.value;
            }
            BoundaryKind::Neumann => {
                // f_{n-1} − f_{n-2} = value.
                op.set_last_row(-1.0, 1.0);
                rhs[n - 1] = self.value;
            }
        }
    }

    /// Enforces the condition on an explicitly updated array.
    pub(crate) fn fix_lower_array(&self, a: &mut Array1<Real>) {
        match self.kind {
            BoundaryKind::None => {}
            BoundaryKind::Dirichlet => a[0] = self.value,
            BoundaryKind::Neumann => a[0] = a[1] - self.value,
        }
    }

    pub(crate) fn fix_upper_array(&self, a: &mut Array1<Real>) {
        let n = a.len();
        match self.kind {
            BoundaryKind::None => {}
            BoundaryKind::Dirichlet => a[n - 1] = self.value,
            BoundaryKind::Neumann => a[n - 1] = a[n - 2] + self.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn neumann_stores_the_node_difference() {
        let bc = BoundaryCondition::new(BoundaryKind::Neumann, 0.5).unwrap();
        let mut a = array![0.0, 2.0, 3.0, 4.0];
        bc.fix_lower_array(&mut a);
        assert_eq!(a[0], 1.5);
        let bc = BoundaryCondition::new(BoundaryKind::Neumann, 1.0).unwrap();
        bc.fix_upper_array(&mut a);
        assert_eq!(a[3], 4.0);
    }

    #[test]
    fn dirichlet_pins_the_edge() {
        let bc = BoundaryCondition::new(BoundaryKind::Dirichlet, 7.0).unwrap();
        let mut a = array![0.0, 2.0, 3.0];
        bc.fix_lower_array(&mut a);
        assert_eq!(a[0], 7.0);
    }

    #[test]
    fn missing_value_is_rejected() {
        assert!(BoundaryCondition::new(BoundaryKind::Neumann, f64::NAN).is_err());
        assert!(BoundaryCondition::new(BoundaryKind::None, f64::NAN).is_ok());
    }
}
