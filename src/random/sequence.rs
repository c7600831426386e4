use super::{Sample, UniformRng};
use crate::math::distributions::inverse_normal_cdf;
use crate::{error::PricingResult, require};

/// Produces fixed-dimension uniform draws with an attached weight.
///
/// Reproducibility is inherited from the underlying engine: identical
/// seeds give identical sequences.
#[derive(Debug, Clone)]
pub struct RandomSequenceGenerator<R: UniformRng> {
    dimension: usize,
    rng: R,
}

impl<R: UniformRng> RandomSequenceGenerator<R> {
    pub fn new(dimension: usize, rng: R) -> PricingResult<Self> {
        require!(dimension > 0, "sequence dimension must be positive");
        Ok(Self { dimension, rng })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn next_sequence(&mut self) -> Sample<Vec<f64>> {
        let mut weight = 1.0;
        let values = (0..self.dimension)
            .map(|_| {
                let s = self.rng.next_sample();
                weight *= s.weight;
                s.value
            })
            .collect();
        Sample::new(values, weight)
    }
}

/// Lifts a uniform sequence to a Gaussian one component-wise through the
/// inverse cumulative normal.
#[derive(Debug, Clone)]
pub struct GaussianSequenceGenerator<R: UniformRng> {
    inner: RandomSequenceGenerator<R>,
}

impl<R: UniformRng> GaussianSequenceGenerator<R> {
    pub fn new(dimension: usize, rng: R) -> PricingResult<Self> {
        Ok(Self {
            inner: RandomSequenceGenerator::new(dimension, rng)?,
        })
    }

    pub fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    pub fn next_sequence(&mut self) -> Sample<Vec<f64>> {
        let mut sample = self.inner.next_sequence();
        for v in &mut sample.value {
            *v = inverse_normal_cdf(*v);
        }
        sample
    }
}
