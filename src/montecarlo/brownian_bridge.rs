use crate::common::{Real, Time};
use crate::time::TimeGrid;
use crate::{error::PricingResult, require};

/// Brownian-bridge reordering of iid normal draws along a time grid.
///
/// The endpoint is fixed by the first draw, then midpoints are filled by
/// successive subdivision. With low-discrepancy input this concentrates
/// the best-distributed coordinates on the largest-variance dimensions.
#[derive(Debug, Clone)]
pub struct BrownianBridge {
    times: Vec<Time>,
    left_index: Vec<usize>,
    right_index: Vec<usize>,
    bridge_index: Vec<usize>,
    left_weight: Vec<Real>,
    right_weight: Vec<Real>,
    std_dev: Vec<Real>,
}

impl BrownianBridge {
    /// Builds the bridge over the grid's intervals (the grid origin is not
    /// a draw).
    pub fn new(grid: &TimeGrid) -> PricingResult<Self> {
        let size = grid.len() - 1;
        require!(size >= 1, "brownian bridge needs at least one step");
        let times: Vec<Time> = grid.times()[1..].to_vec();

        let mut map = vec![usize::MAX; size];
        let mut left_index = vec![0; size];
        let mut right_index = vec![0; size];
        let mut bridge_index = vec![0; size];
        let mut left_weight = vec![0.0; size];
        let mut right_weight = vec![0.0; size];
        let mut std_dev = vec![0.0; size];

        // The first draw fixes the endpoint.
        map[size - 1] = 0;
        bridge_index[0] = size - 1;
        std_dev[0] = times[size - 1].sqrt();

        let mut j = 0usize;
        for i in 1..size {
            while map[j] != usize::MAX {
                j += 1;
            }
            let mut k = j;
            while map[k] == usize::MAX {
                k += 1;
            }
            let l = j + ((k - 1 - j) >> 1);
            map[l] = i;
            bridge_index[i] = l;
            left_index[i] = j;
            right_index[i] = k;
            if j != 0 {
                left_weight[i] = (times[k] - times[l]) / (times[k] - times[j - 1]);
                right_weight[i] = (times[l] - times[j - 1]) / (times[k] - times[j - 1]);
                std_dev[i] = ((times[l] - times[j - 1]) * (times[k] - times[l])
                    / (times[k] - times[j - 1]))
                    .sqrt();
            } else {
                left_weight[i] = (times[k] - times[l]) / times[k];
                right_weight[i] = times[l] / times[k];
                std_dev[i] = (times[l] * (times[k] - times[l]) / times[k]).sqrt();
            }
            j = k + 1;
            if j >= size {
                j = 0;
            }
        }

        Ok(Self {
            times,
            left_index,
            right_index,
            bridge_index,
            left_weight,
            right_weight,
            std_dev,
        })
    }

    pub fn size(&self) -> usize {
        self.times.len()
    }

    /// Reorders iid N(0,1) draws into Wiener increments over the grid
    /// intervals (variance dt already included).
    pub fn transform(&self, draws: &[Real]) -> Vec<Real> {
        let size = self.size();
        debug_assert_eq!(draws.len(), size);
        let mut path = vec![0.0; size];
        path[size - 1] = self.std_dev[0] * draws[0];
        for i in 1..size {
            let j = self.left_index[i];
            let k = self.right_index[i];
            let l = self.bridge_index[i];
            path[l] = if j != 0 {
                self.left_weight[i] * path[j - 1]
                    + self.right_weight[i] * path[k]
                    + self.std_dev[i] * draws[i]
            } else {
                self.right_weight[i] * path[k] + self.std_dev[i] * draws[i]
            };
        }
        // Wiener levels to increments.
        let mut increments = vec![0.0; size];
        increments[0] = path[0];
        for i in 1..size {
            increments[i] = path[i] - path[i - 1];
        }
        increments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_reconstruct_the_endpoint() {
        // The terminal Wiener value depends only on the first draw.
        let grid = TimeGrid::regular(4.0, 8).unwrap();
        let bridge = BrownianBridge::new(&grid).unwrap();
        let mut draws = vec![0.0; 8];
        draws[0] = 1.5;
        let inc = bridge.transform(&draws);
        let terminal: Real = inc.iter().sum();
        assert!((terminal - 1.5 * 2.0).abs() < 1e-12); // std dev √4 = 2
    }

    #[test]
    fn bridge_preserves_total_variance() {
        use crate::random::{GaussianRng, InverseCumulativeGaussianRng, LecuyerUniformRng};
        let grid = TimeGrid::regular(1.0, 16).unwrap();
        let bridge = BrownianBridge::new(&grid).unwrap();
        let mut g = InverseCumulativeGaussianRng::new(LecuyerUniformRng::new(99));
        let n = 20_000;
        let mut sum2 = vec![0.0; 16];
        for _ in 0..n {
            let draws: Vec<Real> = (0..16).map(|_| g.next_gaussian()).collect();
            let inc = bridge.transform(&draws);
            for (s, x) in sum2.iter_mut().zip(&inc) {
                *s += x * x;
            }
        }
        for s in &sum2 {
            let var = s / n as f64;
            assert!((var - 1.0 / 16.0).abs() < 0.005, "variance {var}");
        }
    }
}
