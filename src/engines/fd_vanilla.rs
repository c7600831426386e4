use crate::common::Real;
use crate::error::PricingResult;
use crate::handle::Handle;
use crate::instruments::{ExerciseKind, VanillaEngine, VanillaPayoff};
use crate::observer::SimpleQuote;
use crate::pde::{
    bsm_log_grid, AmericanExercise, BoundaryCondition, BoundaryKind, BsmOperator, CrankNicolson,
    FiniteDifferenceModel,
};
use crate::require;
use crate::termstructure::TermStructure;
use crate::time::Date;
use ndarray::Array1;

/// Crank-Nicolson finite-difference pricer for vanilla options on a
/// log-spot grid, with the early-exercise step condition for American
/// contracts.
pub struct FdVanillaEngine {
    spot: Handle<SimpleQuote>,
    curve: Handle<dyn TermStructure>,
    dividend_yield: Real,
    volatility: Real,
    pub grid_points: usize,
    pub time_steps: usize,
}

impl FdVanillaEngine {
    pub fn new(
        spot: Handle<SimpleQuote>,
        curve: Handle<dyn TermStructure>,
        dividend_yield: Real,
        volatility: Real,
        grid_points: usize,
        time_steps: usize,
    ) -> PricingResult<Self> {
        require!(volatility > 0.0, "volatility must be positive");
        require!(grid_points >= 10, "grid too coarse: {grid_points} points");
        require!(time_steps >= 1, "need at least one time step");
        Ok(Self {
            spot,
            curve,
            dividend_yield,
            volatility,
            grid_points,
            time_steps,
        })
    }
}

impl VanillaEngine for FdVanillaEngine {
    fn npv(
        &self,
        payoff: &VanillaPayoff,
        exercise: ExerciseKind,
        maturity: Date,
    ) -> PricingResult<Real> {
        let t = self.curve.time_from_reference(maturity);
        require!(t > 0.0, "option already expired at the curve reference");
        let rate = self.curve.zero_yield(maturity)?;
        let spot = self.spot.value();

        let (log_grid, dx) =
            bsm_log_grid(spot, payoff.strike, self.volatility, t, self.grid_points)?;
        let intrinsic =
            Array1::from_iter(log_grid.iter().map(|&x| payoff.value(x.exp())));

        let operator = BsmOperator::new(self.volatility, rate, self.dividend_yield)?
            .build(self.grid_points, dx)?;
        // Payoff-slope Neumann conditions at both edges.
        let n = intrinsic.len();
        let lower =
            BoundaryCondition::new(BoundaryKind::Neumann, intrinsic[1] - intrinsic[0])?;
        let upper = BoundaryCondition::new(
            BoundaryKind::Neumann,
            intrinsic[n - 1] - intrinsic[n - 2],
        )?;
        let evolver = CrankNicolson::new(operator, lower, upper);
        let mut model = FiniteDifferenceModel::new(evolver);

        let mut values = intrinsic.clone();
        match exercise {
            ExerciseKind::European => {
                model.rollback(&mut values, t, 0.0, self.time_steps, None)?;
            }
            ExerciseKind::American => {
                let condition = AmericanExercise::new(intrinsic);
                model.rollback(&mut values, t, 0.0, self.time_steps, Some(&condition))?;
            }
        }

        // Linear interpolation at the spot's log coordinate.
        let x = spot.ln();
        let hi = log_grid.partition_point(|&g| g < x).clamp(1, n - 1);
        let lo = hi - 1;
        let w = (x - log_grid[lo]) / (log_grid[hi] - log_grid[lo]);
        Ok(values[lo] * (1.0 - w) + values[hi] * w)
    }
}
