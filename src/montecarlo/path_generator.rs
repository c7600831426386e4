use super::{BrownianBridge, MultiPath, Path};
use crate::common::Real;
use crate::handle::Handle;
use crate::math::matrix::cholesky_factor;
use crate::process::{StochasticProcess, StochasticProcess1D};
use crate::random::{GaussianSequenceGenerator, Sample, UniformRng};
use crate::time::TimeGrid;
use crate::{
    error::{IllegalArgument, PricingError, PricingResult},
};
use nalgebra::DMatrix;

/// Produces sample paths of a 1-D process over a time grid, consuming one
/// Gaussian sequence of dimension `steps` per path.
pub struct PathGenerator<R: UniformRng> {
    process: Handle<dyn StochasticProcess1D>,
    grid: TimeGrid,
    generator: GaussianSequenceGenerator<R>,
    bridge: Option<BrownianBridge>,
}

impl<R: UniformRng> PathGenerator<R> {
    pub fn new(
        process: Handle<dyn StochasticProcess1D>,
        grid: TimeGrid,
        generator: GaussianSequenceGenerator<R>,
        brownian_bridge: bool,
    ) -> PricingResult<Self> {
        let steps = grid.len() - 1;
        if generator.dimension() != steps {
            return Err(PricingError::IllegalArgument(
                IllegalArgument::DimensionMismatch {
                    expected: steps,
                    actual: generator.dimension(),
                },
            ));
        }
        let bridge = if brownian_bridge {
            Some(BrownianBridge::new(&grid)?)
        } else {
            None
        };
        Ok(Self {
            process,
            grid,
            generator,
            bridge,
        })
    }

    pub fn next_path(&mut self) -> Sample<Path> {
        let sequence = self.generator.next_sequence();
        let path = self.build(&sequence.value, false);
        Sample::new(path, sequence.weight)
    }

    /// One draw, two paths: the plain one and its antithetic mirror.
    pub fn next_pair(&mut self) -> (Sample<Path>, Sample<Path>) {
        let sequence = self.generator.next_sequence();
        let path = self.build(&sequence.value, false);
        let mirror = self.build(&sequence.value, true);
        (
            Sample::new(path, sequence.weight),
            Sample::new(mirror, sequence.weight),
        )
    }

    fn build(&self, draws: &[Real], antithetic: bool) -> Path {
        let steps = self.grid.len() - 1;
        let mut values = Vec::with_capacity(steps + 1);
        values.push(self.process.x0());

        let sign = if antithetic { -1.0 } else { 1.0 };
        match &self.bridge {
            Some(bridge) => {
                let increments = bridge.transform(draws);
                for i in 0..steps {
                    let t = self.grid[i];
                    let dt = self.grid.dt(i);
                    // Bridge increments carry √dt; rescale to unit normals.
                    let dw = sign * increments[i] / dt.sqrt();
                    values.push(self.process.evolve(t, values[i], dt, dw));
                }
            }
            None => {
                for i in 0..steps {
                    let t = self.grid[i];
                    let dt = self.grid.dt(i);
                    values.push(self.process.evolve(t, values[i], dt, sign * draws[i]));
                }
            }
        }
        Path::new(self.grid.clone(), values)
    }
}

/// Correlated multi-asset path generation: the per-step noise vector is
/// rotated by the Cholesky factor of the correlation matrix before the
/// component-wise evolve.
pub struct MultiPathGenerator<R: UniformRng> {
    processes: Vec<Handle<dyn StochasticProcess1D>>,
    sqrt_correlation: DMatrix<Real>,
    grid: TimeGrid,
    generator: GaussianSequenceGenerator<R>,
}

impl<R: UniformRng> MultiPathGenerator<R> {
    pub fn new(
        processes: Vec<Handle<dyn StochasticProcess1D>>,
        correlation: DMatrix<Real>,
        grid: TimeGrid,
        generator: GaussianSequenceGenerator<R>,
    ) -> PricingResult<Self> {
        let assets = processes.len();
        let steps = grid.len() - 1;
        if generator.dimension() != assets * steps {
            return Err(PricingError::IllegalArgument(
                IllegalArgument::DimensionMismatch {
                    expected: assets * steps,
                    actual: generator.dimension(),
                },
            ));
        }
        // Validates symmetry and positive definiteness.
        let sqrt_correlation = cholesky_factor(&correlation)?;
        if correlation.nrows() != assets {
            return Err(PricingError::IllegalArgument(
                IllegalArgument::DimensionMismatch {
                    expected: assets,
                    actual: correlation.nrows(),
                },
            ));
        }
        Ok(Self {
            processes,
            sqrt_correlation,
            grid,
            generator,
        })
    }

    pub fn next_multi_path(&mut self) -> Sample<MultiPath> {
        let assets = self.processes.len();
        let steps = self.grid.len() - 1;
        let sequence = self.generator.next_sequence();

        let mut values: Vec<Vec<Real>> = self
            .processes
            .iter()
            .map(|p| {
                let mut v = Vec::with_capacity(steps + 1);
                v.push(p.x0());
                v
            })
            .collect();

        for i in 0..steps {
            let t = self.grid[i];
            let dt = self.grid.dt(i);
            let raw = &sequence.value[i * assets..(i + 1) * assets];
            for (j, process) in self.processes.iter().enumerate() {
                let dz: Real = (0..=j)
                    .map(|k| self.sqrt_correlation[(j, k)] * raw[k])
                    .sum();
                let prev = values[j][i];
                values[j].push(process.evolve(t, prev, dt, dz));
            }
        }

        let paths = values
            .into_iter()
            .map(|v| Path::new(self.grid.clone(), v))
            .collect();
        Sample::new(MultiPath::new(paths), sequence.weight)
    }
}

/// Path generation for an intrinsically multi-dimensional process (its
/// own state coupling, e.g. stochastic volatility).
pub struct ProcessPathGenerator<R: UniformRng, P: StochasticProcess> {
    process: P,
    grid: TimeGrid,
    generator: GaussianSequenceGenerator<R>,
}

impl<R: UniformRng, P: StochasticProcess> ProcessPathGenerator<R, P> {
    pub fn new(
        process: P,
        grid: TimeGrid,
        generator: GaussianSequenceGenerator<R>,
    ) -> PricingResult<Self> {
        let needed = (grid.len() - 1) * process.factors();
        if generator.dimension() != needed {
            return Err(PricingError::IllegalArgument(
                IllegalArgument::DimensionMismatch {
                    expected: needed,
                    actual: generator.dimension(),
                },
            ));
        }
        Ok(Self {
            process,
            grid,
            generator,
        })
    }

    pub fn process(&self) -> &P {
        &self.process
    }

    pub fn next_states(&mut self) -> Sample<Vec<Vec<Real>>> {
        let steps = self.grid.len() - 1;
        let factors = self.process.factors();
        let sequence = self.generator.next_sequence();
        let mut states = Vec::with_capacity(steps + 1);
        states.push(self.process.initial_values());
        for i in 0..steps {
            let dw = &sequence.value[i * factors..(i + 1) * factors];
            let next = self
                .process
                .evolve(self.grid[i], &states[i], self.grid.dt(i), dw);
            states.push(next);
        }
        Sample::new(states, sequence.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::matrix::correlation_from_rows;
    use crate::process::BlackScholesProcess;
    use crate::random::LecuyerUniformRng;
    use std::rc::Rc;

    fn bs_handle() -> Handle<dyn StochasticProcess1D> {
        let p = Handle::new(BlackScholesProcess::flat(100.0, 0.05, 0.02, 0.20).unwrap());
        Handle::from_rc(p.rc() as Rc<dyn StochasticProcess1D>)
    }

    fn generator(steps: usize, seed: i64) -> GaussianSequenceGenerator<LecuyerUniformRng> {
        GaussianSequenceGenerator::new(steps, LecuyerUniformRng::new(seed)).unwrap()
    }

    #[test]
    fn paths_start_at_x0_and_are_reproducible() {
        let grid = TimeGrid::regular(10.0, 12).unwrap();
        let mut gen1 =
            PathGenerator::new(bs_handle(), grid.clone(), generator(12, 42), false).unwrap();
        let mut gen2 = PathGenerator::new(bs_handle(), grid, generator(12, 42), false).unwrap();
        for _ in 0..10 {
            let p1 = gen1.next_path().value;
            let p2 = gen2.next_path().value;
            assert_eq!(p1.first(), 0.0);
            assert_eq!(p1.values(), p2.values());
            assert_eq!(p1.len(), 13);
        }
    }

    #[test]
    fn bridge_and_sequential_terminal_distributions_agree() {
        let grid = TimeGrid::regular(1.0, 8).unwrap();
        let mut plain =
            PathGenerator::new(bs_handle(), grid.clone(), generator(8, 7), false).unwrap();
        let mut bridged = PathGenerator::new(bs_handle(), grid, generator(8, 7), true).unwrap();
        let n = 20_000;
        let (mut m1, mut m2) = (0.0, 0.0);
        for _ in 0..n {
            m1 += plain.next_path().value.last();
            m2 += bridged.next_path().value.last();
        }
        // Same process, same law; only the draw ordering differs.
        assert!((m1 / n as f64 - m2 / n as f64).abs() < 0.01);
    }

    #[test]
    fn antithetic_pair_mirrors_the_noise() {
        let grid = TimeGrid::regular(1.0, 4).unwrap();
        let mut generator_ =
            PathGenerator::new(bs_handle(), grid, generator(4, 11), false).unwrap();
        let (a, b) = generator_.next_pair();
        // Log-returns are linear in the draws, so the pair averages to the
        // deterministic drift path.
        let drift = 0.05 - 0.02 - 0.5 * 0.2 * 0.2;
        let avg = 0.5 * (a.value.last() + b.value.last());
        assert!((avg - drift).abs() < 1e-12);
    }

    #[test]
    fn multipath_respects_dimension_checks() {
        let processes = vec![bs_handle(), bs_handle()];
        let correlation = correlation_from_rows(2, &[1.0, 0.5, 0.5, 1.0]).unwrap();
        let grid = TimeGrid::regular(1.0, 6).unwrap();
        assert!(MultiPathGenerator::new(
            processes,
            correlation,
            grid,
            generator(6, 1) // needs 12
        )
        .is_err());
    }

    #[test]
    fn multipath_generates_correlated_assets() {
        let processes = vec![bs_handle(), bs_handle()];
        let correlation = correlation_from_rows(2, &[1.0, 0.9, 0.9, 1.0]).unwrap();
        let grid = TimeGrid::regular(1.0, 6).unwrap();
        let mut generator_ =
            MultiPathGenerator::new(processes, correlation, grid, generator(12, 42)).unwrap();
        let n = 5_000;
        let (mut sx, mut sy, mut sxy, mut sx2, mut sy2) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for _ in 0..n {
            let mp = generator_.next_multi_path().value;
            let (x, y) = (mp[0].last(), mp[1].last());
            sx += x;
            sy += y;
            sxy += x * y;
            sx2 += x * x;
            sy2 += y * y;
        }
        let nf = n as f64;
        let cov = sxy / nf - sx / nf * sy / nf;
        let vx = sx2 / nf - (sx / nf) * (sx / nf);
        let vy = sy2 / nf - (sy / nf) * (sy / nf);
        let rho = cov / (vx * vy).sqrt();
        assert!((rho - 0.9).abs() < 0.02, "sample correlation {rho}");
    }

    #[test]
    fn nd_process_path_shapes() {
        use crate::process::Heston;
        let heston = Heston::new(100.0, 0.04, 0.05, 2.0, 0.04, 0.3, -0.7).unwrap();
        let grid = TimeGrid::regular(1.0, 10).unwrap();
        let mut generator_ =
            ProcessPathGenerator::new(heston, grid, generator(20, 5)).unwrap();
        let states = generator_.next_states().value;
        assert_eq!(states.len(), 11);
        assert_eq!(states[0].len(), 2);
    }
}
