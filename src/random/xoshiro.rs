use super::{clock_seed, UniformRng};
use crate::{error::PricingResult, require};

/// SplitMix64 stream, used to expand a single word into a full
/// Xoshiro256** state.
#[derive(Debug, Clone)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }
}

/// Number of draws burned after seeding before the stream is handed out.
const WARM_UP: usize = 1_000;

/// Xoshiro256** generator.
///
/// Fixed permutation on four 64-bit words; the all-zero state is invalid.
/// Equal states produce identical subsequent sequences, and instances
/// share nothing, so parallel use with distinct seeds is safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xoshiro256StarStar {
    s: [u64; 4],
}

impl Xoshiro256StarStar {
    /// Seeds from a single word via SplitMix64 expansion. Seed 0 means
    /// self-seeding from the system clock.
    pub fn new(seed: u64) -> Self {
        let seed = if seed != 0 { seed } else { clock_seed() };
        let mut mix = SplitMix64::new(seed);
        let s = [
            mix.next_u64(),
            mix.next_u64(),
            mix.next_u64(),
            mix.next_u64(),
        ];
        let mut rng = Self { s };
        rng.warm_up();
        rng
    }

    /// Seeds from a full state. The warm-up applies here too, so a stream
    /// continued from a saved state must be rebuilt via [`Self::state`]
    /// plus raw stepping, not through this constructor.
    pub fn from_state(s0: u64, s1: u64, s2: u64, s3: u64) -> PricingResult<Self> {
        require!(
            s0 != 0 || s1 != 0 || s2 != 0 || s3 != 0,
            "xoshiro256** state must not be all zero"
        );
        let mut rng = Self { s: [s0, s1, s2, s3] };
        rng.warm_up();
        Ok(rng)
    }

    fn warm_up(&mut self) {
        for _ in 0..WARM_UP {
            self.next_u64();
        }
    }

    pub fn state(&self) -> [u64; 4] {
        self.s
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = self.s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = self.s[1] << 17;
        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);
        result
    }

    /// Uniform double in (0, 1): (n + 0.5) / 2⁶⁴.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() as f64 + 0.5) / 18_446_744_073_709_551_616.0
    }
}

impl UniformRng for Xoshiro256StarStar {
    fn next_f64(&mut self) -> f64 {
        Xoshiro256StarStar::next_f64(self)
    }
}

impl rand::RngCore for Xoshiro256StarStar {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        Xoshiro256StarStar::next_u64(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

impl rand::SeedableRng for Xoshiro256StarStar {
    type Seed = [u8; 32];

    fn from_seed(seed: Self::Seed) -> Self {
        let mut words = [0u64; 4];
        for (i, chunk) in seed.chunks(8).enumerate() {
            words[i] = u64::from_le_bytes(chunk.try_into().expect("chunks of 8"));
        }
        if words == [0, 0, 0, 0] {
            // The all-zero state is invalid; expand it instead.
            return Self::new(1);
        }
        let mut rng = Self { s: words };
        rng.warm_up();
        rng
    }
}
