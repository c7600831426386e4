use super::dispatch::DispatchableAssetCondition;
use super::evolver::Evolver;
use super::step_condition::StepCondition;
use crate::common::{Real, Time};
use crate::{error::PricingResult, require};
use ndarray::{Array1, Array2};

/// Backward-induction driver: advances a value array from a later time to
/// an earlier one under an evolver, applying an optional step condition
/// after each step.
pub struct FiniteDifferenceModel<E: Evolver> {
    evolver: E,
}

impl<E: Evolver> FiniteDifferenceModel<E> {
    pub fn new(evolver: E) -> Self {
        Self { evolver }
    }

    pub fn evolver_mut(&mut self) -> &mut E {
        &mut self.evolver
    }

    /// Rolls `a` back from `from` to `to` in `steps` equal steps. The
    /// step condition sees the array at the time it has been rolled back
    /// to.
    pub fn rollback(
        &mut self,
        a: &mut Array1<Real>,
        from: Time,
        to: Time,
        steps: usize,
        condition: Option<&dyn StepCondition>,
    ) -> PricingResult<()> {
        require!(
            from > to,
            "rollback must go backward: from = {from} is not later than to = {to}"
        );
        require!(steps > 0, "rollback needs at least one step");
        let dt = (from - to) / steps as Time;
        self.evolver.set_step(dt);
        let mut t = from;
        for _ in 0..steps {
            self.evolver.step(a, t)?;
            t -= dt;
            if let Some(condition) = condition {
                condition.apply_to(a, t);
            }
        }
        Ok(())
    }

    /// Rollback of a state-extended value surface (nodes × states): every
    /// state layer diffuses under the same evolver, then the dispatch
    /// condition resolves the transitions.
    pub fn rollback_layers(
        &mut self,
        values: &mut Array2<Real>,
        from: Time,
        to: Time,
        steps: usize,
        condition: &DispatchableAssetCondition,
    ) -> PricingResult<()> {
        require!(
            from > to,
            "rollback must go backward: from = {from} is not later than to = {to}"
        );
        require!(steps > 0, "rollback needs at least one step");
        let dt = (from - to) / steps as Time;
        self.evolver.set_step(dt);
        let mut t = from;
        for _ in 0..steps {
            for s in 0..values.ncols() {
                let mut layer = values.column(s).to_owned();
                self.evolver.step(&mut layer, t)?;
                values.column_mut(s).assign(&layer);
            }
            t -= dt;
            condition.apply_to(values, t);
        }
        Ok(())
    }
}
