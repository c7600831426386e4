use crate::common::{Real, Time, Volatility};
use crate::math::black::{black_formula, black_implied_stddev, OptionType};
use crate::math::interpolation::{Extrapolation, LinearInterpolation};
use crate::{error::PricingResult, require};

/// Default strike gap for finite-difference digitals and densities.
pub const DEFAULT_DIGITAL_GAP: Real = 1e-5;

/// The call-price/vol curve at a fixed expiry.
///
/// An arbitrage-free section has call prices convex and non-increasing in
/// the strike, digitals non-increasing in [0, 1], and non-negative
/// density.
pub trait SmileSection {
    fn exercise_time(&self) -> Time;

    /// The forward level the section is centred on.
    fn atm_level(&self) -> Real;

    fn volatility(&self, strike: Real) -> PricingResult<Volatility>;

    /// Total standard deviation σ(K)·√T.
    fn stddev(&self, strike: Real) -> PricingResult<Real> {
        Ok(self.volatility(strike)? * self.exercise_time().sqrt())
    }

    /// Undiscounted option price on the forward.
    fn option_price(&self, strike: Real, option_type: OptionType) -> PricingResult<Real> {
        black_formula(
            option_type,
            strike,
            self.atm_level(),
            self.stddev(strike)?,
            1.0,
        )
    }

    /// Undiscounted digital call price −∂C/∂K, by centered finite
    /// difference.
    fn digital_option_price(&self, strike: Real, gap: Real) -> PricingResult<Real> {
        let k_low = (strike - 0.5 * gap).max(0.0);
        let up = self.option_price(strike + 0.5 * gap, OptionType::Call)?;
        let down = self.option_price(k_low, OptionType::Call)?;
        Ok((down - up) / (strike + 0.5 * gap - k_low))
    }

    /// Implied density ∂²C/∂K², by centered finite difference.
    fn density(&self, strike: Real, gap: Real) -> PricingResult<Real> {
        let mid = self.option_price(strike, OptionType::Call)?;
        let up = self.option_price(strike + gap, OptionType::Call)?;
        let down = self.option_price((strike - gap).max(0.0), OptionType::Call)?;
        Ok((up - 2.0 * mid + down) / (gap * gap))
    }
}

/// Single-vol section.
#[derive(Debug, Clone)]
pub struct FlatSmileSection {
    exercise_time: Time,
    vol: Volatility,
    atm: Real,
}

impl FlatSmileSection {
    pub fn new(exercise_time: Time, vol: Volatility, atm: Real) -> PricingResult<Self> {
        require!(exercise_time > 0.0, "exercise time must be positive");
        require!(vol >= 0.0, "volatility must be non-negative");
        require!(atm > 0.0, "forward must be positive");
        Ok(Self {
            exercise_time,
            vol,
            atm,
        })
    }
}

impl SmileSection for FlatSmileSection {
    fn exercise_time(&self) -> Time {
        self.exercise_time
    }

    fn atm_level(&self) -> Real {
        self.atm
    }

    fn volatility(&self, _strike: Real) -> PricingResult<Volatility> {
        Ok(self.vol)
    }
}

/// Section interpolating total standard deviations linearly in the
/// strike, flat beyond the quoted range.
pub struct InterpolatedSmileSection {
    exercise_time: Time,
    atm: Real,
    interpolation: LinearInterpolation,
}

impl InterpolatedSmileSection {
    pub fn new(
        exercise_time: Time,
        strikes: Vec<Real>,
        stddevs: Vec<Real>,
        atm: Real,
    ) -> PricingResult<Self> {
        require!(exercise_time > 0.0, "exercise time must be positive");
        require!(atm > 0.0, "forward must be positive");
        Ok(Self {
            exercise_time,
            atm,
            interpolation: LinearInterpolation::new(strikes, stddevs, Extrapolation::Flat)?,
        })
    }

    /// Builds the section from call prices by inverting the Black
    /// formula at each strike.
    pub fn from_call_prices(
        exercise_time: Time,
        strikes: Vec<Real>,
        prices: &[Real],
        atm: Real,
    ) -> PricingResult<Self> {
        let stddevs = strikes
            .iter()
            .zip(prices)
            .map(|(&k, &p)| black_implied_stddev(OptionType::Call, k, atm, p, 1.0))
            .collect::<PricingResult<Vec<_>>>()?;
        Self::new(exercise_time, strikes, stddevs, atm)
    }
}

impl SmileSection for InterpolatedSmileSection {
    fn exercise_time(&self) -> Time {
        self.exercise_time
    }

    fn atm_level(&self) -> Real {
        self.atm
    }

    fn volatility(&self, strike: Real) -> PricingResult<Volatility> {
        Ok(self.interpolation.value(strike) / self.exercise_time.sqrt())
    }

    fn stddev(&self, strike: Real) -> PricingResult<Real> {
        Ok(self.interpolation.value(strike))
    }
}
