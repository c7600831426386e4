use super::{BoundaryCondition, TridiagonalOperator};
use crate::common::{Real, Time};
use crate::error::PricingResult;
use ndarray::Array1;

/// Advances a value array one step back in time under the backward
/// equation V_t + L V = 0.
pub trait Evolver {
    fn set_step(&mut self, dt: Time);

    /// `t` is the time the array currently represents; after the call it
    /// represents t − dt.
    fn step(&mut self, a: &mut Array1<Real>, t: Time) -> PricingResult<()>;
}

/// θ-weighted mixture of explicit (θ = 0) and implicit (θ = 1) Euler:
/// (I − θ·dt·L) V(t−dt) = (I + (1−θ)·dt·L) V(t).
pub struct MixedScheme {
    operator: TridiagonalOperator,
    theta: Real,
    dt: Time,
    lower: BoundaryCondition,
    upper: BoundaryCondition,
}

impl MixedScheme {
    pub fn new(
        operator: TridiagonalOperator,
        theta: Real,
        lower: BoundaryCondition,
        upper: BoundaryCondition,
    ) -> Self {
        Self {
            operator,
            theta,
            dt: 0.0,
            lower,
            upper,
        }
    }
}

impl Evolver for MixedScheme {
    fn set_step(&mut self, dt: Time) {
        self.dt = dt;
    }

    fn step(&mut self, a: &mut Array1<Real>, t: Time) -> PricingResult<()> {
        debug_assert!(self.dt > 0.0, "set_step must run before step");
        if self.operator.is_time_dependent() {
            self.operator.set_time(t);
        }

        let mut rhs = if self.theta < 1.0 {
            self.operator
                .identity_plus_scaled((1.0 - self.theta) * self.dt)
                .apply_to(a)
        } else {
            a.clone()
        };

        if self.theta == 0.0 {
            self.lower.fix_lower_array(&mut rhs);
            self.upper.fix_upper_array(&mut rhs);
            *a = rhs;
            return Ok(());
        }

        let mut lhs = self.operator.identity_plus_scaled(-self.theta * self.dt);
        self.lower.fix_lower_system(&mut lhs, &mut rhs);
        self.upper.fix_upper_system(&mut lhs, &mut rhs);
        *a = lhs.solve_for(&rhs)?;
        Ok(())
    }
}

pub struct ExplicitEuler(MixedScheme);

impl ExplicitEuler {
    pub fn new(
        operator: TridiagonalOperator,
        lower: BoundaryCondition,
        upper: BoundaryCondition,
    ) -> Self {
        Self(MixedScheme::new(operator, 0.0, lower, upper))
    }
}

impl Evolver for ExplicitEuler {
    fn set_step(&mut self, dt: Time) {
        self.0.set_step(dt);
    }

    fn step(&mut self, a: &mut Array1<Real>, t: Time) -> PricingResult<()> {
        self.0.step(a, t)
    }
}

pub struct ImplicitEuler(MixedScheme);

impl ImplicitEuler {
    pub fn new(
        operator: TridiagonalOperator,
        lower: BoundaryCondition,
        upper: BoundaryCondition,
    ) -> Self {
        Self(MixedScheme::new(operator, 1.0, lower, upper))
    }
}

impl Evolver for ImplicitEuler {
    fn set_step(&mut self, dt: Time) {
        self.0.set_step(dt);
    }

    fn step(&mut self, a: &mut Array1<Real>, t: Time) -> PricingResult<()> {
        self.0.step(a, t)
    }
}

pub struct CrankNicolson(MixedScheme);

impl CrankNicolson {
    pub fn new(
        operator: TridiagonalOperator,
        lower: BoundaryCondition,
        upper: BoundaryCondition,
    ) -> Self {
        Self(MixedScheme::new(operator, 0.5, lower, upper))
    }
}

impl Evolver for CrankNicolson {
    fn set_step(&mut self, dt: Time) {
        self.0.set_step(dt);
    }

    fn step(&mut self, a: &mut Array1<Real>, t: Time) -> PricingResult<()> {
        self.0.step(a, t)
    }
}

/// Hundsdorfer-Verwer predictor-corrector: an explicit predictor, an
/// implicit stage with weight μ, an explicit correction with weight σ and
/// a second implicit stage. Damps the oscillations the plain trapezoidal
/// scheme shows on non-smooth payoffs.
pub struct Hundsdorfer {
    operator: TridiagonalOperator,
    mu: Real,
    sigma: Real,
    dt: Time,
    lower: BoundaryCondition,
    upper: BoundaryCondition,
}

impl Hundsdorfer {
    pub fn new(
        operator: TridiagonalOperator,
        lower: BoundaryCondition,
        upper: BoundaryCondition,
    ) -> Self {
        Self {
            operator,
            mu: 0.5,
            sigma: 0.5,
            dt: 0.0,
            lower,
            upper,
        }
    }

    fn implicit_stage(
        &self,
        explicit_part: &Array1<Real>,
        correction: &Array1<Real>,
    ) -> PricingResult<Array1<Real>> {
        // (I − μ·dt·L)·y = explicit_part − μ·dt·L·correction
        let mut rhs =
            explicit_part - &self.operator.scaled(self.mu * self.dt).apply_to(correction);
        let mut lhs = self.operator.identity_plus_scaled(-self.mu * self.dt);
        self.lower.fix_lower_system(&mut lhs, &mut rhs);
        self.upper.fix_upper_system(&mut lhs, &mut rhs);
        lhs.solve_for(&rhs)
    }
}

impl Evolver for Hundsdorfer {
    fn set_step(&mut self, dt: Time) {
        self.dt = dt;
    }

    fn step(&mut self, a: &mut Array1<Real>, t: Time) -> PricingResult<()> {
        debug_assert!(self.dt > 0.0, "set_step must run before step");
        if self.operator.is_time_dependent() {
            self.operator.set_time(t);
        }
        // Explicit predictor.
        let y0 = self.operator.identity_plus_scaled(self.dt).apply_to(a);
        // First implicit stage against the old value.
        let y1 = self.implicit_stage(&y0, a)?;
        // Explicit correction toward the stage-one solution.
        let l_a = self.operator.apply_to(a);
        let l_y1 = self.operator.apply_to(&y1);
        let corrected = &y0 + &((&l_y1 - &l_a) * (self.sigma * self.dt));
        // Second implicit stage against stage one.
        *a = self.implicit_stage(&corrected, &y1)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Heat-equation rollback: with L = ∂xx on a uniform grid the scheme
    /// applies V(t−dt) = (I + dt·∂xx)V(t), so a sine mode decays by
    /// exp(−π² τ) over a rolled-back span τ.
    fn heat_operator(n: usize, dx: Real) -> TridiagonalOperator {
        let c = 1.0 / (dx * dx);
        TridiagonalOperator::new(vec![c; n], vec![-2.0 * c; n], vec![c; n]).unwrap()
    }

    fn sine_profile(n: usize) -> (Array1<Real>, Real) {
        let dx = 1.0 / (n as Real + 1.0);
        let values = Array1::from_iter(
            (1..=n).map(|i| (std::f64::consts::PI * i as Real * dx).sin()),
        );
        (values, dx)
    }

    fn decay_test(mut evolver: impl Evolver, steps: usize, tolerance: Real) {
        let n = 49;
        let (mut a, _) = sine_profile(n);
        let initial = a.clone();
        let dt = 0.0001;
        evolver.set_step(dt);
        let mut t = steps as Real * dt;
        for _ in 0..steps {
            evolver.step(&mut a, t).unwrap();
            t -= dt;
        }
        // Dirichlet edges at zero; the fundamental sine mode decays by
        // exp(−π² τ).
        let tau = steps as Real * dt;
        let decay = (-std::f64::consts::PI * std::f64::consts::PI * tau).exp();
        let mid = n / 2;
        let expected = initial[mid] * decay;
        assert!(
            (a[mid] - expected).abs() / expected < tolerance,
            "mid value {} vs expected {}",
            a[mid],
            expected
        );
    }

    fn zero_dirichlet() -> (BoundaryCondition, BoundaryCondition) {
        (
            BoundaryCondition::new(BoundaryKind::Dirichlet, 0.0).unwrap(),
            BoundaryCondition::new(BoundaryKind::Dirichlet, 0.0).unwrap(),
        )
    }

    use super::super::BoundaryKind;

    #[test]
    fn explicit_euler_tracks_the_heat_kernel() {
        let (lower, upper) = zero_dirichlet();
        let (_, dx) = sine_profile(49);
        decay_test(
            ExplicitEuler::new(heat_operator(49, dx), lower, upper),
            100,
            1e-2,
        );
    }

    #[test]
    fn implicit_euler_tracks_the_heat_kernel() {
        let (lower, upper) = zero_dirichlet();
        let (_, dx) = sine_profile(49);
        decay_test(
            ImplicitEuler::new(heat_operator(49, dx), lower, upper),
            100,
            1e-2,
        );
    }

    #[test]
    fn crank_nicolson_is_more_accurate_than_euler() {
        let (lower, upper) = zero_dirichlet();
        let (_, dx) = sine_profile(49);
        decay_test(
            CrankNicolson::new(heat_operator(49, dx), lower, upper),
            100,
            1e-3,
        );
    }

    #[test]
    fn hundsdorfer_converges() {
        let (lower, upper) = zero_dirichlet();
        let (_, dx) = sine_profile(49);
        decay_test(
            Hundsdorfer::new(heat_operator(49, dx), lower, upper),
            100,
            1e-2,
        );
    }
}
