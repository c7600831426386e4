use crate::common::{Real, Time};
use ndarray::Array2;

/// Output level of a running unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLevel {
    Half,
    Full,
}

/// State-machine overlay for a dispatchable asset (the virtual-power-plant
/// payoff): every spatial node carries an extended value vector over the
/// unit's operating states, and each rollback step takes the best
/// admissible transition.
///
/// States: `t_min_down` off phases (the unit may only restart once the
/// last one is reached) and `t_min_up` on phases at each of two output
/// levels (it may only shut down from the final phase). A restart charges
/// the fixed startup cost.
pub struct DispatchableAssetCondition {
    t_min_up: usize,
    t_min_down: usize,
    startup_cost: Real,
    /// Immediate reward of running one step at the given time, spatial
    /// node and output level.
    reward: Box<dyn Fn(Time, usize, OutputLevel) -> Real>,
}

impl DispatchableAssetCondition {
    pub fn new(
        t_min_up: usize,
        t_min_down: usize,
        startup_cost: Real,
        reward: impl Fn(Time, usize, OutputLevel) -> Real + 'static,
    ) -> Self {
        debug_assert!(t_min_up >= 1 && t_min_down >= 1);
        Self {
            t_min_up,
            t_min_down,
            startup_cost,
            reward: Box::new(reward),
        }
    }

    /// Number of state-vector entries per spatial node:
    /// `t_min_down` off states plus `t_min_up` on states per output level.
    pub fn state_count(&self) -> usize {
        self.t_min_down + 2 * self.t_min_up
    }

    fn off_state(&self, d: usize) -> usize {
        d
    }

    fn on_state(&self, u: usize, level: OutputLevel) -> usize {
        self.t_min_down
            + 2 * u
            + match level {
                OutputLevel::Half => 0,
                OutputLevel::Full => 1,
            }
    }

    /// One backward step: `values` is (nodes × states) holding the
    /// continuation values; it is replaced by the optimal values at this
    /// step.
    pub fn apply_to(&self, values: &mut Array2<Real>, t: Time) {
        let nodes = values.nrows();
        debug_assert_eq!(values.ncols(), self.state_count());
        let levels = [OutputLevel::Half, OutputLevel::Full];

        for node in 0..nodes {
            let continuation: Vec<Real> = values.row(node).to_vec();
            let best_running_next = |u_next: usize| -> Real {
                levels
                    .iter()
                    .map(|&l| continuation[self.on_state(u_next, l)])
                    .fold(Real::NEG_INFINITY, Real::max)
            };

            // Off states.
            for d in 0..self.t_min_down {
                let stay = if d + 1 < self.t_min_down {
                    continuation[self.off_state(d + 1)]
                } else {
                    continuation[self.off_state(self.t_min_down - 1)]
                };
                let mut best = stay;
                if d == self.t_min_down - 1 {
                    let start = best_running_next(0) - self.startup_cost;
                    best = best.max(start);
                }
                values[(node, self.off_state(d))] = best;
            }

            // On states.
            for u in 0..self.t_min_up {
                for &level in &levels {
                    let reward = (self.reward)(t, node, level);
                    let keep_running = if u + 1 < self.t_min_up {
                        best_running_next(u + 1)
                    } else {
                        best_running_next(self.t_min_up - 1)
                    };
                    let mut best = keep_running;
                    if u == self.t_min_up - 1 {
                        best = best.max(continuation[self.off_state(0)]);
                    }
                    values[(node, self.on_state(u, level))] = reward + best;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(reward_half: Real, reward_full: Real, startup: Real) -> DispatchableAssetCondition {
        DispatchableAssetCondition::new(2, 2, startup, move |_t, _node, level| match level {
            OutputLevel::Half => reward_half,
            OutputLevel::Full => reward_full,
        })
    }

    #[test]
    fn state_layout() {
        let c = condition(1.0, 2.0, 0.0);
        assert_eq!(c.state_count(), 6);
    }

    #[test]
    fn profitable_unit_accumulates_full_load_rewards() {
        let c = condition(1.0, 2.0, 0.0);
        let mut values = Array2::zeros((1, c.state_count()));
        for _ in 0..10 {
            c.apply_to(&mut values, 0.0);
        }
        // Running at full load for 10 steps earns 20.
        let running = values[(0, c.on_state(0, OutputLevel::Full))];
        assert!((running - 20.0).abs() < 1e-12);
        // The idle unit loses at most one step before it may start.
        let idle = values[(0, c.off_state(c.t_min_down - 1))];
        assert!(idle >= 2.0 * 8.0 && idle <= 20.0);
    }

    #[test]
    fn startup_cost_is_charged_once() {
        let cheap = condition(0.0, 1.0, 0.0);
        let costly = condition(0.0, 1.0, 3.0);
        let mut a = Array2::zeros((1, cheap.state_count()));
        let mut b = Array2::zeros((1, costly.state_count()));
        for _ in 0..10 {
            cheap.apply_to(&mut a, 0.0);
            costly.apply_to(&mut b, 0.0);
        }
        let idle_cheap = a[(0, cheap.off_state(1))];
        let idle_costly = b[(0, costly.off_state(1))];
        assert!((idle_cheap - idle_costly - 3.0).abs() < 1e-12);
    }

    #[test]
    fn loss_making_unit_shuts_down_after_min_up() {
        let c = condition(-1.0, -2.0, 0.0);
        let mut values = Array2::zeros((1, c.state_count()));
        for _ in 0..10 {
            c.apply_to(&mut values, 0.0);
        }
        // From the last on phase the unit can switch off immediately, so
        // it loses at most one half-load step.
        let final_phase = values[(0, c.on_state(c.t_min_up - 1, OutputLevel::Half))];
        assert!(final_phase >= -1.0 - 1e-12);
        // From the first on phase it must honour min-up (two steps).
        let first_phase = values[(0, c.on_state(0, OutputLevel::Half))];
        assert!(first_phase <= -2.0 + 1e-12);
    }
}
