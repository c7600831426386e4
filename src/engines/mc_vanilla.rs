use crate::common::{Real, Time};
use crate::error::{IllegalArgument, PricingError, PricingResult};
use crate::handle::Handle;
use crate::instruments::{ExerciseKind, VanillaEngine, VanillaOption, VanillaPayoff};
use crate::math::distributions::inverse_normal_cdf;
use crate::math::statistics::Statistics;
use crate::montecarlo::PathGenerator;
use crate::observer::SimpleQuote;
use crate::process::{BlackScholesProcess, StochasticProcess1D};
use crate::random::{GaussianSequenceGenerator, UniformRng, Xoshiro256StarStar};
use crate::require;
use crate::termstructure::TermStructure;
use crate::time::{Date, TimeGrid};
use rayon::prelude::*;
use std::rc::Rc;

/// Monte-Carlo pricer for European vanillas on Black-Scholes dynamics.
///
/// Paths are generated with a seeded Xoshiro256** stream, optionally in
/// antithetic pairs; the estimate comes with its statistical error.
pub struct McEuropeanEngine {
    spot: Handle<SimpleQuote>,
    curve: Handle<dyn TermStructure>,
    dividend_yield: Real,
    volatility: Real,
    pub time_steps: usize,
    pub samples: usize,
    pub seed: u64,
    pub antithetic: bool,
}

impl McEuropeanEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spot: Handle<SimpleQuote>,
        curve: Handle<dyn TermStructure>,
        dividend_yield: Real,
        volatility: Real,
        time_steps: usize,
        samples: usize,
        seed: u64,
        antithetic: bool,
    ) -> PricingResult<Self> {
        require!(volatility > 0.0, "volatility must be positive");
        require!(time_steps >= 1, "need at least one time step");
        require!(samples >= 100, "need at least 100 samples, got {samples}");
        Ok(Self {
            spot,
            curve,
            dividend_yield,
            volatility,
            time_steps,
            samples,
            seed,
            antithetic,
        })
    }

    /// Estimate plus statistical error.
    pub fn value_with_error(
        &self,
        payoff: &VanillaPayoff,
        maturity: Date,
    ) -> PricingResult<(Real, Real)> {
        let t = self.curve.time_from_reference(maturity);
        require!(t > 0.0, "option already expired at the curve reference");
        let rate = self.curve.zero_yield(maturity)?;
        let discount = self.curve.discount(maturity)?;
        let spot = self.spot.value();

        let process = Handle::new(BlackScholesProcess::flat(
            spot,
            rate,
            self.dividend_yield,
            self.volatility,
        )?);
        let dynamic: Handle<dyn StochasticProcess1D> =
            Handle::from_rc(process.rc() as Rc<dyn StochasticProcess1D>);
        let grid = TimeGrid::regular(t, self.time_steps)?;
        let generator = GaussianSequenceGenerator::new(
            self.time_steps,
            Xoshiro256StarStar::new(self.seed),
        )?;
        let mut paths = PathGenerator::new(dynamic, grid, generator, false)?;

        let mut statistics = Statistics::new();
        if self.antithetic {
            for _ in 0..self.samples / 2 {
                let (a, b) = paths.next_pair();
                let va = payoff.value(process.price_from_state(a.value.last()));
                let vb = payoff.value(process.price_from_state(b.value.last()));
                statistics.add_weighted(0.5 * (va + vb), a.weight);
            }
        } else {
            for _ in 0..self.samples {
                let sample = paths.next_path();
                let v = payoff.value(process.price_from_state(sample.value.last()));
                statistics.add_weighted(v, sample.weight);
            }
        }
        Ok((
            discount * statistics.mean()?,
            discount * statistics.error_estimate()?,
        ))
    }

    /// Parallel estimator sampling the terminal state exactly (one draw
    /// per sample); each batch owns an independently seeded stream.
    pub fn value_parallel(
        &self,
        payoff: &VanillaPayoff,
        maturity: Date,
        batches: usize,
    ) -> PricingResult<Real> {
        require!(batches >= 1, "need at least one batch");
        let t: Time = self.curve.time_from_reference(maturity);
        require!(t > 0.0, "option already expired at the curve reference");
        let rate = self.curve.zero_yield(maturity)?;
        let discount = self.curve.discount(maturity)?;
        let spot = self.spot.value();
        let drift = (rate - self.dividend_yield - 0.5 * self.volatility * self.volatility) * t;
        let diffusion = self.volatility * t.sqrt();
        let per_batch = self.samples / batches;
        let payoff = *payoff;
        let seed = self.seed;

        let total: Real = (0..batches)
            .into_par_iter()
            .map(|b| {
                let mut rng = Xoshiro256StarStar::new(seed.wrapping_add(b as u64 + 1));
                let mut sum = 0.0;
                for _ in 0..per_batch {
                    let z = inverse_normal_cdf(rng.next_f64());
                    let terminal = spot * (drift + diffusion * z).exp();
                    sum += payoff.value(terminal);
                }
                sum
            })
            .sum();
        Ok(discount * total / (per_batch * batches) as Real)
    }
}

impl VanillaEngine for McEuropeanEngine {
    fn npv(
        &self,
        payoff: &VanillaPayoff,
        exercise: ExerciseKind,
        maturity: Date,
    ) -> PricingResult<Real> {
        if exercise != ExerciseKind::European {
            return Err(PricingError::IllegalArgument(IllegalArgument::Message(
                "Monte-Carlo engine prices European exercise only".into(),
            )));
        }
        Ok(self.value_with_error(payoff, maturity)?.0)
    }
}

/// Wires a vanilla option to this engine and the curve in one call.
pub fn wire_mc_option(option: &VanillaOption, engine: Rc<McEuropeanEngine>) {
    use crate::instrument::Instrument;
    option.set_term_structure(engine.curve.clone());
    option.set_pricing_engine(engine);
}
