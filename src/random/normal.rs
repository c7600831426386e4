//! Uniform-to-Gaussian maps.

use super::{GaussianRng, Sample, UniformRng};
use crate::math::distributions::inverse_normal_cdf;
use std::f64::consts::PI;

/// Maps uniforms through the inverse cumulative normal. One uniform per
/// deviate, which keeps low-discrepancy structure intact.
#[derive(Debug, Clone)]
pub struct InverseCumulativeGaussianRng<R: UniformRng> {
    rng: R,
}

impl<R: UniformRng> InverseCumulativeGaussianRng<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn next_sample(&mut self) -> Sample<f64> {
        let u = self.rng.next_sample();
        Sample::new(inverse_normal_cdf(u.value), u.weight)
    }
}

impl<R: UniformRng> GaussianRng for InverseCumulativeGaussianRng<R> {
    fn next_gaussian(&mut self) -> f64 {
        self.next_sample().value
    }
}

/// Box-Muller transform. Consumes uniforms in pairs and caches the second
/// deviate; a zero uniform is redrawn so the logarithm stays finite.
#[derive(Debug, Clone)]
pub struct BoxMullerGaussianRng<R: UniformRng> {
    rng: R,
    cached: Option<f64>,
}

impl<R: UniformRng> BoxMullerGaussianRng<R> {
    pub fn new(rng: R) -> Self {
        Self { rng, cached: None }
    }
}

impl<R: UniformRng> GaussianRng for BoxMullerGaussianRng<R> {
    fn next_gaussian(&mut self) -> f64 {
        if let Some(second) = self.cached.take() {
            return second;
        }
        let mut u1 = self.rng.next_f64();
        while u1 == 0.0 {
            u1 = self.rng.next_f64();
        }
        let u2 = self.rng.next_f64();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * PI * u2;
        self.cached = Some(radius * angle.sin());
        radius * angle.cos()
    }
}

/// Central-limit approximation: sum of 12 uniforms minus 6. Cheap and
/// crude; only for uses where tail accuracy does not matter.
#[derive(Debug, Clone)]
pub struct CltGaussianRng<R: UniformRng> {
    rng: R,
}

impl<R: UniformRng> CltGaussianRng<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: UniformRng> GaussianRng for CltGaussianRng<R> {
    fn next_gaussian(&mut self) -> f64 {
        let sum: f64 = (0..12).map(|_| self.rng.next_f64()).sum();
        sum - 6.0
    }
}
