use crate::{
    common::Time,
    error::{IllegalArgument, PricingError, PricingResult},
    require,
};
use itertools::Itertools;
use ordered_float::OrderedFloat;

/// An ordered grid of non-negative times, immutable after construction.
///
/// Grids always start at 0. Mandatory times supplied by the caller are kept
/// exactly; intermediate points are inserted to honour a target step
/// density.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<Time>,
}

impl TimeGrid {
    /// Regular grid from 0 to `end` with `steps` intervals.
    pub fn regular(end: Time, steps: usize) -> PricingResult<Self> {
        require!(end > 0.0, "time grid end must be positive");
        require!(steps > 0, "time grid needs at least one step");
        let dt = end / steps as Time;
        Ok(Self {
            times: (0..=steps).map(|i| i as Time * dt).collect(),
        })
    }

    /// Grid through the given mandatory times, refined so that no interval
    /// is longer than the smallest mandatory spacing divided by `steps_per_interval`
    /// rounded up. Mandatory times must be non-negative; duplicates and a
    /// leading zero are handled.
    pub fn with_mandatory_times(
        mandatory: &[Time],
        target_steps: usize,
    ) -> PricingResult<Self> {
        require!(!mandatory.is_empty(), "empty list of mandatory times");
        let mut sorted: Vec<Time> = mandatory.to_vec();
        sorted.sort_by_key(|&t| OrderedFloat(t));
        require!(sorted[0] >= 0.0, "negative times not allowed on a grid");
        sorted.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
        if sorted[0] > 1e-12 {
            sorted.insert(0, 0.0);
        } else {
            sorted[0] = 0.0;
        }

        let end = *sorted.last().expect("non-empty by construction");
        let dt_target = if target_steps > 0 {
            end / target_steps as Time
        } else {
            // No refinement requested: keep the mandatory points only.
            return Ok(Self { times: sorted });
        };

        let mut times = vec![0.0];
        for (&a, &b) in sorted.iter().tuple_windows() {
            let n = ((b - a) / dt_target).ceil().max(1.0) as usize;
            let dt = (b - a) / n as Time;
            for i in 1..=n {
                times.push(a + i as Time * dt);
            }
        }
        Ok(Self { times })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[Time] {
        &self.times
    }

    pub fn first(&self) -> Time {
        self.times[0]
    }

    pub fn last(&self) -> Time {
        *self.times.last().expect("grids are never empty")
    }

    pub fn dt(&self, i: usize) -> Time {
        self.times[i + 1] - self.times[i]
    }

    /// Index of the grid point closest to `t`.
    pub fn closest_index(&self, t: Time) -> usize {
        let pos = self
            .times
            .partition_point(|&x| x < t);
        if pos == 0 {
            return 0;
        }
        if pos >= self.times.len() {
            return self.times.len() - 1;
        }
        if (self.times[pos] - t).abs() < (t - self.times[pos - 1]).abs() {
            pos
        } else {
            pos - 1
        }
    }

    /// Index of the grid point equal to `t` within tolerance, or an
    /// illegal-argument error.
    pub fn index_of(&self, t: Time) -> PricingResult<usize> {
        let i = self.closest_index(t);
        if (self.times[i] - t).abs() > 1e-10 {
            return Err(PricingError::IllegalArgument(
                IllegalArgument::TimeNotOnGrid(t),
            ));
        }
        Ok(i)
    }
}

impl std::ops::Index<usize> for TimeGrid {
    type Output = Time;

    fn index(&self, i: usize) -> &Time {
        &self.times[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_grid() {
        let g = TimeGrid::regular(10.0, 4).unwrap();
        assert_eq!(g.times(), &[0.0, 2.5, 5.0, 7.5, 10.0]);
        assert_eq!(g.closest_index(6.0), 2);
        assert_eq!(g.closest_index(6.5), 3);
    }

    #[test]
    fn mandatory_times_survive_refinement() {
        let g = TimeGrid::with_mandatory_times(&[1.0, 2.5], 10).unwrap();
        assert!(g.index_of(1.0).is_ok());
        assert!(g.index_of(2.5).is_ok());
        assert_eq!(g.first(), 0.0);
        assert_eq!(g.last(), 2.5);
    }

    #[test]
    fn off_grid_lookup_fails() {
        let g = TimeGrid::regular(1.0, 2).unwrap();
        assert!(g.index_of(0.3).is_err());
    }
}
