//! Deterministic random engines and the uniform-to-Gaussian maps on top
//! of them.
//!
//! Every engine owns its state exclusively: two engines seeded identically
//! produce identical streams, and instances never interact. Seed 0 means
//! "self-seed from the system clock".

pub mod dynamic_creator;
pub mod lecuyer;
pub mod normal;
pub mod sequence;
pub mod xoshiro;

pub use dynamic_creator::{MersenneTwisterDynamicRng, MtDescription, MtParameterSearch};
pub use lecuyer::LecuyerUniformRng;
pub use normal::{BoxMullerGaussianRng, CltGaussianRng, InverseCumulativeGaussianRng};
pub use sequence::{GaussianSequenceGenerator, RandomSequenceGenerator};
pub use xoshiro::Xoshiro256StarStar;

/// A weighted draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<T> {
    pub value: T,
    pub weight: f64,
}

impl<T> Sample<T> {
    pub fn new(value: T, weight: f64) -> Self {
        Self { value, weight }
    }
}

/// Uniform generator over the open interval (0, 1).
pub trait UniformRng {
    fn next_f64(&mut self) -> f64;

    /// Weight attached to each draw; plain pseudo-random engines return 1.
    fn weight(&self) -> f64 {
        1.0
    }

    fn next_sample(&mut self) -> Sample<f64> {
        let w = self.weight();
        Sample::new(self.next_f64(), w)
    }
}

/// Standard normal generator.
pub trait GaussianRng {
    fn next_gaussian(&mut self) -> f64;
}

/// Clock-derived seed for self-seeding engines.
pub(crate) fn clock_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x9e3779b97f4a7c15);
    // Avoid handing out 0, which engines interpret as "self-seed" again.
    nanos | 1
}
