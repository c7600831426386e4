use super::smile::SmileSection;
use crate::common::{Real, Time, Volatility};
use crate::math::black::{black_implied_stddev, OptionType};
use crate::math::distributions::{inverse_normal_cdf, normal_cdf};
use crate::math::interpolation::{Extrapolation, LinearInterpolation};
use crate::solver::{Brent, Objective, Solver1D};
use crate::{
    error::{IllegalResult, PricingError, PricingResult},
    require,
};
use std::rc::Rc;
use tracing::debug;

/// Tolerance of the goodness predicate on finite-difference slopes and
/// densities. Fixed so core-strike determination is platform independent.
const GOOD_TOL: Real = 1e-12;

/// Moneyness checkpoints used when the caller does not supply a grid.
const DEFAULT_MONEYNESS: [Real; 19] = [
    0.01, 0.05, 0.10, 0.25, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0, 1.25, 1.5, 2.0, 5.0, 7.5, 10.0,
    15.0, 20.0,
];

/// Displaced-lognormal wing c(k) = f·Φ(d₁) − (k+s)·Φ(d₂), with
/// d₁/₂ = (ln(f/(k+s)) ± σ²/2)/σ. Matched to price and slope at the core
/// strike; below k = −s the wing continues linearly with slope −1.
#[derive(Debug, Clone, Copy)]
struct LognormalWing {
    forward: Real,
    sigma: Real,
    shift: Real,
}

impl LognormalWing {
    fn price(&self, k: Real) -> Real {
        let displaced = k + self.shift;
        if displaced <= 0.0 {
            return self.forward - k - self.shift;
        }
        let d2 = ((self.forward / displaced).ln() - 0.5 * self.sigma * self.sigma) / self.sigma;
        self.forward * normal_cdf(d2 + self.sigma) - displaced * normal_cdf(d2)
    }

    /// Fit σ and s so that the wing matches `price` and `slope` at `k`.
    fn fit(forward: Real, k: Real, price: Real, slope: Real) -> PricingResult<Self> {
        let slope = slope.clamp(-1.0 + 1e-10, -1e-10);
        let d2_target = inverse_normal_cdf(-slope);
        let objective = |sigma: f64| {
            let shift = forward * (-d2_target * sigma - 0.5 * sigma * sigma).exp() - k;
            forward * normal_cdf(d2_target + sigma) - (k + shift) * normal_cdf(d2_target) - price
        };
        let solver = Brent::default();
        let sigma = solver
            .solve_bracketed(&Objective(objective), 1e-12, 0.5, 1e-8, 10.0)
            .map_err(|_| {
                PricingError::IllegalResult(IllegalResult::NegativeDensity { strike: k })
            })?;
        let shift = forward * (-d2_target * sigma - 0.5 * sigma * sigma).exp() - k;
        Ok(Self {
            forward,
            sigma,
            shift,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum RightWing {
    Lognormal(LognormalWing),
    /// c(k) = a·exp(−b·k).
    Exponential { a: Real, b: Real },
}

impl RightWing {
    fn price(&self, k: Real) -> Real {
        match self {
            RightWing::Lognormal(w) => w.price(k),
            RightWing::Exponential { a, b } => a * (-b * k).exp(),
        }
    }
}

enum Interior {
    /// Pass the input smile through between the core strikes.
    Source,
    /// Linear interpolation of total standard deviations over the good
    /// strike subset.
    StdDevs(LinearInterpolation),
}

/// Arbitrage-free smile reconstruction around an ATM reference.
///
/// Input strikes are scanned for the slope condition c′ ∈ [−1, 0] and a
/// non-negative local density; the maximal good run containing the ATM
/// strike forms the core. Displaced-lognormal wings (optionally a pure
/// exponential tail on the right) continue the smile outside the core
/// with matched price and slope, which keeps call prices convex and
/// non-increasing, digitals monotone in [0, 1], and the density
/// non-negative on the whole half-line.
pub struct KahaleSmileSection {
    source: Rc<dyn SmileSection>,
    forward: Real,
    exercise_time: Time,
    left_strike: Real,
    right_strike: Real,
    left_wing: LognormalWing,
    right_wing: RightWing,
    interior: Interior,
}

impl KahaleSmileSection {
    pub fn new(
        source: Rc<dyn SmileSection>,
        interpolate: bool,
        exponential_extrapolation: bool,
        delete_arbitrage_points: bool,
        moneyness_grid: &[Real],
        gap: Real,
    ) -> PricingResult<Self> {
        require!(gap > 0.0, "finite-difference gap must be positive");
        let forward = source.atm_level();
        let moneyness: Vec<Real> = if moneyness_grid.is_empty() {
            DEFAULT_MONEYNESS.to_vec()
        } else {
            moneyness_grid.to_vec()
        };

        let mut strikes: Vec<Real> = moneyness
            .iter()
            .filter(|&&m| m > 0.0)
            .map(|&m| m * forward)
            .collect();
        strikes.sort_by_key(|&k| ordered_float::OrderedFloat(k));
        strikes.dedup_by(|a, b| (*a - *b).abs() < 1e-14);
        require!(strikes.len() >= 3, "need at least three positive strikes");

        let mut prices: Vec<Real> = strikes
            .iter()
            .map(|&k| source.option_price(k, OptionType::Call))
            .collect::<PricingResult<Vec<_>>>()?;

        // Optionally thin out arbitrageable interior points, re-checking
        // until the remaining grid is clean.
        loop {
            let good = goodness(forward, &strikes, &prices);
            if !delete_arbitrage_points || good.iter().all(|&g| g) || strikes.len() <= 3 {
                break;
            }
            let atm_idx = closest_index(&strikes, forward);
            let mut removed = false;
            for i in (0..strikes.len()).rev() {
                if !good[i] && i != atm_idx && strikes.len() > 3 {
                    debug!(strike = strikes[i], "dropping arbitrageable strike");
                    strikes.remove(i);
                    prices.remove(i);
                    removed = true;
                }
            }
            if !removed {
                break;
            }
        }

        let good = goodness(forward, &strikes, &prices);
        let atm_idx = closest_index(&strikes, forward);
        let seed = nearest_good(&good, atm_idx).ok_or(PricingError::IllegalResult(
            IllegalResult::NegativeDensity { strike: forward },
        ))?;
        let mut left_index = seed;
        while left_index > 0 && good[left_index - 1] {
            left_index -= 1;
        }
        let mut right_index = seed;
        while right_index + 1 < strikes.len() && good[right_index + 1] {
            right_index += 1;
        }

        let left_strike = strikes[left_index];
        let right_strike = strikes[right_index];

        let interior = if interpolate {
            let core = &strikes[left_index..=right_index];
            let stddevs = core
                .iter()
                .zip(&prices[left_index..=right_index])
                .map(|(&k, &c)| black_implied_stddev(OptionType::Call, k, forward, c, 1.0))
                .collect::<PricingResult<Vec<_>>>()?;
            Interior::StdDevs(LinearInterpolation::new(
                core.to_vec(),
                stddevs,
                Extrapolation::Flat,
            )?)
        } else {
            Interior::Source
        };

        let interior_price = |k: Real| -> PricingResult<Real> {
            match &interior {
                Interior::Source => source.option_price(k, OptionType::Call),
                Interior::StdDevs(interp) => crate::math::black::black_formula(
                    OptionType::Call,
                    k,
                    forward,
                    interp.value(k),
                    1.0,
                ),
            }
        };

        // Wings matched to the interior's value and one-sided slope at
        // the core strikes.
        let g = gap.min(0.25 * (right_strike - left_strike)).max(1e-8);
        let c_left = prices[left_index];
        let slope_left = (interior_price(left_strike + g)? - c_left) / g;
        let left_wing = LognormalWing::fit(forward, left_strike, c_left, slope_left)?;

        let c_right = prices[right_index];
        let slope_right = (c_right - interior_price(right_strike - g)?) / g;
        let right_wing = if exponential_extrapolation {
            let slope = slope_right.clamp(-1.0 + 1e-10, -1e-10);
            let b = -slope / c_right;
            let a = c_right * (b * right_strike).exp();
            RightWing::Exponential { a, b }
        } else {
            RightWing::Lognormal(LognormalWing::fit(
                forward,
                right_strike,
                c_right,
                slope_right,
            )?)
        };

        let exercise_time = source.exercise_time();
        Ok(Self {
            source,
            forward,
            exercise_time,
            left_strike,
            right_strike,
            left_wing,
            right_wing,
            interior,
        })
    }

    /// Smallest strike of the arbitrage-free core.
    pub fn left_core_strike(&self) -> Real {
        self.left_strike
    }

    /// Largest strike of the arbitrage-free core.
    pub fn right_core_strike(&self) -> Real {
        self.right_strike
    }

    fn call_price(&self, strike: Real) -> PricingResult<Real> {
        if strike < self.left_strike {
            return Ok(self.left_wing.price(strike));
        }
        if strike > self.right_strike {
            return Ok(self.right_wing.price(strike));
        }
        match &self.interior {
            Interior::Source => self.source.option_price(strike, OptionType::Call),
            Interior::StdDevs(interp) => crate::math::black::black_formula(
                OptionType::Call,
                strike,
                self.forward,
                interp.value(strike),
                1.0,
            ),
        }
    }
}

impl SmileSection for KahaleSmileSection {
    fn exercise_time(&self) -> Time {
        self.exercise_time
    }

    fn atm_level(&self) -> Real {
        self.forward
    }

    fn volatility(&self, strike: Real) -> PricingResult<Volatility> {
        let strike = strike.max(1e-8);
        let stddev = black_implied_stddev(
            OptionType::Call,
            strike,
            self.forward,
            self.call_price(strike)?,
            1.0,
        )?;
        Ok(stddev / self.exercise_time.sqrt())
    }

    fn option_price(&self, strike: Real, option_type: OptionType) -> PricingResult<Real> {
        let call = self.call_price(strike)?;
        Ok(match option_type {
            OptionType::Call => call,
            // Parity on the forward.
            OptionType::Put => call - (self.forward - strike),
        })
    }
}

/// Goodness of each grid strike: slope within [−1, 0] and non-negative
/// local density, both by grid finite differences anchored at
/// (0, forward) on the left.
fn goodness(forward: Real, strikes: &[Real], prices: &[Real]) -> Vec<bool> {
    let n = strikes.len();
    let seg = |i: isize| -> Real {
        if i < 0 {
            (prices[0] - forward) / strikes[0]
        } else {
            let i = i as usize;
            (prices[i + 1] - prices[i]) / (strikes[i + 1] - strikes[i])
        }
    };
    (0..n)
        .map(|i| {
            let slope = if i + 1 < n {
                seg(i as isize)
            } else {
                seg(i as isize - 1)
            };
            let slope_ok = slope >= -1.0 - GOOD_TOL && slope <= GOOD_TOL;
            let density_ok = if i + 1 < n {
                seg(i as isize) - seg(i as isize - 1) >= -GOOD_TOL
            } else {
                true
            };
            slope_ok && density_ok
        })
        .collect()
}

fn closest_index(strikes: &[Real], forward: Real) -> usize {
    strikes
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (*a - forward)
                .abs()
                .partial_cmp(&(*b - forward).abs())
                .expect("finite strikes")
        })
        .map(|(i, _)| i)
        .expect("non-empty grid")
}

fn nearest_good(good: &[bool], from: usize) -> Option<usize> {
    (0..good.len())
        .filter(|&i| good[i])
        .min_by_key(|&i| i.abs_diff(from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::black::black_formula;
    use crate::volatility::smile::InterpolatedSmileSection;

    const ATM: Real = 0.05;
    const T: Time = 1.0;

    fn strikes() -> Vec<Real> {
        (1..=10).map(|i| i as Real / 100.0).collect()
    }

    fn money() -> Vec<Real> {
        strikes().iter().map(|k| k / ATM).collect()
    }

    fn flat_smile_calls() -> Vec<Real> {
        strikes()
            .iter()
            .map(|&k| black_formula(OptionType::Call, k, ATM, 0.5, 1.0).unwrap())
            .collect()
    }

    fn section_from(calls: &[Real]) -> Rc<dyn SmileSection> {
        Rc::new(
            InterpolatedSmileSection::from_call_prices(T, strikes(), calls, ATM).unwrap(),
        )
    }

    #[test]
    fn arbitrage_free_input_keeps_full_core() {
        let sec = KahaleSmileSection::new(
            section_from(&flat_smile_calls()),
            false,
            false,
            false,
            &money(),
            1e-5,
        )
        .unwrap();
        assert!((sec.left_core_strike() - 0.01).abs() < 1e-8);
        assert!((sec.right_core_strike() - 0.10).abs() < 1e-8);
    }

    #[test]
    fn input_smile_is_reproduced_inside_the_core() {
        let source = section_from(&flat_smile_calls());
        let sec =
            KahaleSmileSection::new(source.clone(), false, false, false, &money(), 1e-5)
                .unwrap();
        let mut k = 0.01;
        while k <= 0.10 + 1e-12 {
            let p0 = source.option_price(k, OptionType::Call).unwrap();
            let p1 = sec.option_price(k, OptionType::Call).unwrap();
            assert!((p0 - p1).abs() < 1e-8, "mismatch at {k}");
            k += 0.0001;
        }
    }

    #[test]
    fn left_arbitrage_moves_the_left_core() {
        let mut calls = flat_smile_calls();
        calls[0] = (ATM - 0.01) + 0.0010;
        let sec = KahaleSmileSection::new(
            section_from(&calls),
            false,
            false,
            false,
            &money(),
            1e-5,
        )
        .unwrap();
        assert!((sec.left_core_strike() - 0.02).abs() < 1e-8);
        assert!((sec.right_core_strike() - 0.10).abs() < 1e-8);
    }

    #[test]
    fn interior_arbitrage_truncates_the_right_core() {
        let mut calls = flat_smile_calls();
        calls[8] = 0.9 * calls[9] + 0.1 * calls[8];
        let sec = KahaleSmileSection::new(
            section_from(&calls),
            false,
            false,
            false,
            &money(),
            1e-5,
        )
        .unwrap();
        assert!((sec.left_core_strike() - 0.01).abs() < 1e-8);
        assert!((sec.right_core_strike() - 0.08).abs() < 1e-8);
    }

    #[test]
    fn deleting_arbitrage_points_restores_the_far_core() {
        let mut calls = flat_smile_calls();
        calls[8] = 0.9 * calls[9] + 0.1 * calls[8];
        let sec = KahaleSmileSection::new(
            section_from(&calls),
            true,
            false,
            true,
            &money(),
            1e-5,
        )
        .unwrap();
        assert!((sec.right_core_strike() - 0.10).abs() < 1e-8);
    }

    #[test]
    fn digitals_are_monotone_and_bounded() {
        for (interpolate, exponential) in [(false, false), (true, false), (false, true)] {
            let sec = KahaleSmileSection::new(
                section_from(&flat_smile_calls()),
                interpolate,
                exponential,
                false,
                &money(),
                1e-5,
            )
            .unwrap();
            let mut k = 0.001;
            let mut previous = 1.0;
            while k <= 0.20 + 1e-12 {
                let digital = sec.digital_option_price(k, 1e-5).unwrap();
                assert!(
                    digital <= previous + 1e-8 && digital >= -1e-10,
                    "digital arbitrage at {k} (interp {interpolate}, exp {exponential})"
                );
                previous = digital;
                k += 0.0001;
            }
        }
    }

    #[test]
    fn density_is_non_negative_everywhere() {
        let sec = KahaleSmileSection::new(
            section_from(&flat_smile_calls()),
            false,
            true,
            false,
            &money(),
            1e-5,
        )
        .unwrap();
        let mut k = 0.002;
        while k <= 0.5 {
            assert!(
                sec.density(k, 1e-5).unwrap() >= -1e-8,
                "negative density at {k}"
            );
            k += 0.001;
        }
    }
}
