use crate::common::{Real, Time};
use ndarray::Array1;

/// In-place mapping applied to the value array after each rollback step.
pub trait StepCondition {
    fn apply_to(&self, a: &mut Array1<Real>, t: Time);
}

/// Early exercise: the value can never drop below intrinsic.
pub struct AmericanExercise {
    intrinsic: Array1<Real>,
}

impl AmericanExercise {
    pub fn new(intrinsic: Array1<Real>) -> Self {
        Self { intrinsic }
    }
}

impl StepCondition for AmericanExercise {
    fn apply_to(&self, a: &mut Array1<Real>, _t: Time) {
        for (v, &i) in a.iter_mut().zip(self.intrinsic.iter()) {
            *v = v.max(i);
        }
    }
}

/// Shout right: the holder may lock in intrinsic, paid at maturity, while
/// keeping nothing else. The floor is the locked amount discounted from
/// maturity.
pub struct ShoutCondition {
    intrinsic: Array1<Real>,
    rate: Real,
    maturity: Time,
}

impl ShoutCondition {
    pub fn new(intrinsic: Array1<Real>, rate: Real, maturity: Time) -> Self {
        Self {
            intrinsic,
            rate,
            maturity,
        }
    }
}

impl StepCondition for ShoutCondition {
    fn apply_to(&self, a: &mut Array1<Real>, t: Time) {
        let discount = (-self.rate * (self.maturity - t).max(0.0)).exp();
        for (v, &i) in a.iter_mut().zip(self.intrinsic.iter()) {
            *v = v.max(discount * i);
        }
    }
}

/// Continuous barrier monitoring: values beyond the barrier collapse to
/// the rebate.
pub struct BarrierKnockOut {
    grid: Vec<Real>,
    lower: Option<Real>,
    upper: Option<Real>,
    rebate: Real,
}

impl BarrierKnockOut {
    pub fn new(grid: Vec<Real>, lower: Option<Real>, upper: Option<Real>, rebate: Real) -> Self {
        Self {
            grid,
            lower,
            upper,
            rebate,
        }
    }
}

impl StepCondition for BarrierKnockOut {
    fn apply_to(&self, a: &mut Array1<Real>, _t: Time) {
        for (v, &x) in a.iter_mut().zip(&self.grid) {
            let knocked = self.lower.is_some_and(|b| x <= b)
                || self.upper.is_some_and(|b| x >= b);
            if knocked {
                *v = self.rebate;
            }
        }
    }
}

/// Discrete dividend: at each payment time the spot drops by the
/// dividend, implemented as a grid shift with linear interpolation in the
/// log-price coordinate.
pub struct DividendDrop {
    /// Log-price grid the value array lives on.
    log_grid: Vec<Real>,
    /// (payment time, absolute dividend) pairs.
    dividends: Vec<(Time, Real)>,
    /// Half-width of the time window that catches a payment date between
    /// two rollback steps.
    window: Time,
}

impl DividendDrop {
    pub fn new(log_grid: Vec<Real>, dividends: Vec<(Time, Real)>, window: Time) -> Self {
        Self {
            log_grid,
            dividends,
            window,
        }
    }
}

impl StepCondition for DividendDrop {
    fn apply_to(&self, a: &mut Array1<Real>, t: Time) {
        for &(payment, amount) in &self.dividends {
            if (t - payment).abs() > self.window {
                continue;
            }
            // Holder value just before the drop equals the value just
            // after at the reduced spot.
            let shifted: Vec<Real> = self
                .log_grid
                .iter()
                .map(|&x| {
                    let spot = x.exp();
                    let target = (spot - amount).max(1e-12).ln();
                    interpolate(&self.log_grid, a, target)
                })
                .collect();
            for (v, s) in a.iter_mut().zip(shifted) {
                *v = s;
            }
        }
    }
}

fn interpolate(grid: &[Real], values: &Array1<Real>, x: Real) -> Real {
    let n = grid.len();
    if x <= grid[0] {
        return values[0];
    }
    if x >= grid[n - 1] {
        return values[n - 1];
    }
    let hi = grid.partition_point(|&g| g < x);
    let lo = hi - 1;
    let w = (x - grid[lo]) / (grid[hi] - grid[lo]);
    values[lo] * (1.0 - w) + values[hi] * w
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn american_condition_floors_at_intrinsic() {
        let condition = AmericanExercise::new(array![5.0, 3.0, 0.0]);
        let mut a = array![4.0, 4.0, 4.0];
        condition.apply_to(&mut a, 0.5);
        assert_eq!(a, array![5.0, 4.0, 4.0]);
    }

    #[test]
    fn barrier_flattens_to_rebate() {
        let condition =
            BarrierKnockOut::new(vec![80.0, 100.0, 125.0], Some(85.0), None, 1.0);
        let mut a = array![7.0, 7.0, 7.0];
        condition.apply_to(&mut a, 0.5);
        assert_eq!(a, array![1.0, 7.0, 7.0]);
    }

    #[test]
    fn shout_floor_grows_toward_maturity() {
        let condition = ShoutCondition::new(array![10.0], 0.05, 1.0);
        let mut early = array![0.0];
        condition.apply_to(&mut early, 0.0);
        let mut late = array![0.0];
        condition.apply_to(&mut late, 0.9);
        assert!(late[0] > early[0]);
        assert!(late[0] < 10.0);
    }

    #[test]
    fn dividend_drop_shifts_the_surface() {
        // Value function V(S) = S; after a dividend of 5 the value reads
        // S − 5.
        let log_grid: Vec<Real> = (1..=60).map(|i| (5.0 * i as Real).ln()).collect();
        let values = Array1::from_iter(log_grid.iter().map(|&x| x.exp()));
        let condition = DividendDrop::new(log_grid.clone(), vec![(0.5, 5.0)], 1e-6);
        let mut a = values.clone();
        condition.apply_to(&mut a, 0.5);
        // Check an interior node: S = 100 should now read about 95.
        let idx = 19; // S = 100
        assert!((log_grid[idx].exp() - 100.0).abs() < 1e-9);
        assert!((a[idx] - 95.0).abs() < 0.5);
        // Away from the payment date nothing happens.
        let mut untouched = values.clone();
        condition.apply_to(&mut untouched, 0.4);
        assert_eq!(untouched, values);
    }
}
