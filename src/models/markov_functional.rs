//! Markov-functional model calibrated to a strip of market smiles.
//!
//! The model works in the terminal measure: the numeraire is the zero
//! bond maturing at the latest payment date T_N, and the driving state x
//! is the Gaussian [`super::MfStateProcess`]. Going backward through the
//! calibration expiries, deflated zero bonds are propagated by
//! Gauss-Hermite conditional expectations, and at each expiry the
//! monotone map from state to underlying rate is implied by equating
//! model digital prices with market digitals read off the (possibly
//! Kahale-adjusted) smile. The numeraire grid follows from the rate map,
//! which makes the model reproduce every calibration smile by
//! construction up to quadrature error.

use crate::common::{Rate, Real, Time};
use crate::error::{IllegalArgument, IllegalResult, PricingError, PricingResult};
use crate::handle::Handle;
use crate::math::black::OptionType;
use crate::math::distributions::{gaussian_pdf, normal_cdf};
use crate::math::integration::GaussHermite;
use crate::math::interpolation::{Extrapolation, LinearInterpolation};
use crate::math::optimization::{EndCriteria, LevenbergMarquardt};
use crate::models::gaussian1d::Gaussian1dModel;
use crate::models::mf_state_process::MfStateProcess;
use crate::process::StochasticProcess1D;
use crate::require;
use crate::solver::{Brent, Objective, Solver1D};
use crate::termstructure::TermStructure;
use crate::time::Date;
use crate::volatility::{
    KahaleSmileSection, OptionletVolatilityStructure, SmileSection, SwaptionVolatilityStructure,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::ops::BitOr;
use std::rc::Rc;
use tracing::{debug, instrument};

// ================================================================================================
// Settings
// ================================================================================================

/// Smile pre-processing switches, combinable with `|`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Adjustments(u32);

impl Adjustments {
    pub const NONE: Adjustments = Adjustments(0);
    /// Replace each raw smile by its arbitrage-free Kahale
    /// reconstruction.
    pub const KAHALE_SMILE: Adjustments = Adjustments(1);
    /// Exponential instead of displaced-lognormal right wing.
    pub const SMILE_EXPONENTIAL_EXTRAPOLATION: Adjustments = Adjustments(2);
    /// Interpolate implied stddevs across the good strikes instead of
    /// passing the raw smile through.
    pub const KAHALE_INTERPOLATION: Adjustments = Adjustments(4);
    /// Drop arbitrageable interior strikes before reconstruction.
    pub const SMILE_DELETE_ARBITRAGE_POINTS: Adjustments = Adjustments(8);

    pub fn contains(&self, other: Adjustments) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Adjustments {
    type Output = Adjustments;

    fn bitor(self, rhs: Adjustments) -> Adjustments {
        Adjustments(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    pub y_grid_points: usize,
    pub y_std_devs: Real,
    pub gauss_hermite_points: usize,
    /// Strike gap for finite-differencing call prices into digitals.
    pub digital_gap: Real,
    /// Accuracy of the per-node market rate inversion.
    pub market_rate_accuracy: Real,
    pub lower_rate_bound: Rate,
    pub upper_rate_bound: Rate,
    /// Moneyness multiples of the ATM forward checked in the outputs.
    pub smile_moneyness_checkpoints: Vec<Real>,
    pub adjustments: Adjustments,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            y_grid_points: 64,
            y_std_devs: 7.0,
            gauss_hermite_points: 32,
            digital_gap: 1e-5,
            market_rate_accuracy: 1e-7,
            lower_rate_bound: 0.0,
            upper_rate_bound: 2.0,
            smile_moneyness_checkpoints: vec![0.5, 0.75, 1.0, 1.25, 1.5, 2.0],
            adjustments: Adjustments::KAHALE_SMILE | Adjustments::SMILE_EXPONENTIAL_EXTRAPOLATION,
        }
    }
}

impl ModelSettings {
    pub fn with_y_grid_points(mut self, n: usize) -> Self {
        self.y_grid_points = n;
        self
    }

    pub fn with_y_std_devs(mut self, s: Real) -> Self {
        self.y_std_devs = s;
        self
    }

    pub fn with_gauss_hermite_points(mut self, n: usize) -> Self {
        self.gauss_hermite_points = n;
        self
    }

    pub fn with_adjustments(mut self, adjustments: Adjustments) -> Self {
        self.adjustments = adjustments;
        self
    }

    pub fn with_smile_moneyness_checkpoints(mut self, checkpoints: Vec<Real>) -> Self {
        self.smile_moneyness_checkpoints = checkpoints;
        self
    }
}

// ================================================================================================
// Calibration basket & outputs
// ================================================================================================

/// The instrument strip whose smiles pin the numeraire.
#[derive(Debug, Clone)]
pub enum CalibrationBasket {
    /// One swaption per expiry, all underlying swaps ending at the
    /// terminal date. Fixed-leg payments must fall on later expiries or
    /// the terminal date.
    CoterminalSwaptions {
        expiry_dates: Vec<Date>,
        terminal_date: Date,
    },
    /// Contiguous caplets: caplet i runs from fixing i to the next
    /// fixing, the last one to the terminal date.
    Caplets {
        fixing_dates: Vec<Date>,
        terminal_date: Date,
    },
}

/// Per-expiry calibration diagnostics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModelOutputs {
    pub expiries: Vec<Date>,
    pub market_zerorate: Vec<Real>,
    pub model_zerorate: Vec<Real>,
    pub smile_strikes: Vec<Vec<Real>>,
    pub market_call_premium: Vec<Vec<Real>>,
    pub model_call_premium: Vec<Vec<Real>>,
    pub market_put_premium: Vec<Vec<Real>>,
    pub model_put_premium: Vec<Vec<Real>>,
    pub market_raw_call_premium: Vec<Vec<Real>>,
    pub market_raw_put_premium: Vec<Vec<Real>>,
}

impl fmt::Display for ModelOutputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Markov functional model calibration")?;
        for (i, expiry) in self.expiries.iter().enumerate() {
            writeln!(
                f,
                "expiry {expiry}: zero rate market {:.6} model {:.6}",
                self.market_zerorate[i], self.model_zerorate[i]
            )?;
            for (j, strike) in self.smile_strikes[i].iter().enumerate() {
                writeln!(
                    f,
                    "  K = {strike:.6}: call market {:.8} model {:.8} | put market {:.8} model {:.8}",
                    self.market_call_premium[i][j],
                    self.model_call_premium[i][j],
                    self.market_put_premium[i][j],
                    self.model_put_premium[i][j]
                )?;
            }
        }
        Ok(())
    }
}

// ================================================================================================
// Model
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BasketKind {
    Swaption,
    Caplet,
}

struct Schedule {
    payment_times: Vec<Time>,
    accruals: Vec<Real>,
}

struct ExpiryTabulation {
    variance: Real,
    /// Underlying rate per grid node, increasing.
    rates: Vec<Real>,
    /// Deflated annuity weight per node.
    weights: Vec<Real>,
    /// 1/N(T_i, ·) per node.
    inv_numeraire: Vec<Real>,
    /// D(T_i, t, ·) for later tabulated times t < T_N.
    deflated_bonds: Vec<(Time, Vec<Real>)>,
}

/// Markov-functional interest-rate model; see the module docs for the
/// construction.
pub struct MarkovFunctional {
    settings: ModelSettings,
    curve: Handle<dyn TermStructure>,
    kind: BasketKind,
    expiry_dates: Vec<Date>,
    expiry_times: Vec<Time>,
    schedules: Vec<Schedule>,
    numeraire_time: Time,
    smiles: Vec<Rc<dyn SmileSection>>,
    raw_smiles: Vec<Rc<dyn SmileSection>>,
    /// Market discount factors at every tabulated time.
    market_df: Vec<(Time, Real)>,
    state: RefCell<MfStateProcess>,
    grid: Vec<Real>,
    gh: GaussHermite,
    tabulation: RefCell<Vec<ExpiryTabulation>>,
    outputs: RefCell<ModelOutputs>,
}

const TIME_TOL: Time = 1e-6;

impl MarkovFunctional {
    /// Builds and calibrates the model to swaption smiles.
    pub fn with_swaption_smiles(
        curve: Handle<dyn TermStructure>,
        volatilities: Rc<dyn SwaptionVolatilityStructure>,
        basket: CalibrationBasket,
        reversion: Real,
        settings: ModelSettings,
    ) -> PricingResult<Self> {
        let CalibrationBasket::CoterminalSwaptions {
            expiry_dates,
            terminal_date,
        } = basket
        else {
            return Err(PricingError::illegal_argument(
                "swaption smile construction needs a coterminal swaption basket",
            ));
        };
        Self::build(
            curve,
            BasketKind::Swaption,
            expiry_dates,
            terminal_date,
            reversion,
            settings,
            |curve, expiry, schedule, numeraire_time| {
                let t_expiry = curve.time_from_reference(expiry);
                let swap_length = numeraire_time - t_expiry;
                let forward = forward_swap_rate(curve, expiry, schedule)?;
                volatilities.smile_section(expiry, swap_length, forward)
            },
        )
    }

    /// Builds and calibrates the model to caplet smiles.
    pub fn with_caplet_smiles(
        curve: Handle<dyn TermStructure>,
        volatilities: Rc<dyn OptionletVolatilityStructure>,
        basket: CalibrationBasket,
        reversion: Real,
        settings: ModelSettings,
    ) -> PricingResult<Self> {
        let CalibrationBasket::Caplets {
            fixing_dates,
            terminal_date,
        } = basket
        else {
            return Err(PricingError::illegal_argument(
                "caplet smile construction needs a caplet basket",
            ));
        };
        Self::build(
            curve,
            BasketKind::Caplet,
            fixing_dates,
            terminal_date,
            reversion,
            settings,
            |curve, expiry, schedule, _numeraire_time| {
                let forward = forward_period_rate(curve, expiry, schedule)?;
                volatilities.smile_section(expiry, forward)
            },
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        curve: Handle<dyn TermStructure>,
        kind: BasketKind,
        expiry_dates: Vec<Date>,
        terminal_date: Date,
        reversion: Real,
        settings: ModelSettings,
        smile_source: impl Fn(
            &dyn TermStructure,
            Date,
            &Schedule,
            Time,
        ) -> PricingResult<Rc<dyn SmileSection>>,
    ) -> PricingResult<Self> {
        require!(!expiry_dates.is_empty(), "empty calibration basket");
        require!(
            expiry_dates.windows(2).all(|w| w[0] < w[1]),
            "calibration expiries must be increasing"
        );
        require!(
            *expiry_dates.last().expect("non-empty") < terminal_date,
            "terminal date must lie beyond the last expiry"
        );
        require!(
            settings.y_grid_points >= 8,
            "state grid needs at least 8 points"
        );

        let n = expiry_dates.len();
        let expiry_times: Vec<Time> = expiry_dates
            .iter()
            .map(|&d| curve.time_from_reference(d))
            .collect();
        let numeraire_time = curve.time_from_reference(terminal_date);

        // Normalized schedules. Payment dates are later expiries plus the
        // terminal date, which keeps every deflated bond on the
        // tabulation.
        let mut schedules = Vec::with_capacity(n);
        for i in 0..n {
            let mut dates: Vec<Date> = match kind {
                BasketKind::Swaption => {
                    let mut d: Vec<Date> = expiry_dates[i + 1..].to_vec();
                    d.push(terminal_date);
                    d
                }
                BasketKind::Caplet => {
                    vec![if i + 1 < n {
                        expiry_dates[i + 1]
                    } else {
                        terminal_date
                    }]
                }
            };
            let mut previous = expiry_dates[i];
            let mut payment_times = Vec::with_capacity(dates.len());
            let mut accruals = Vec::with_capacity(dates.len());
            for d in dates.drain(..) {
                payment_times.push(curve.time_from_reference(d));
                accruals.push((d - previous) as Real / 365.0);
                previous = d;
            }
            schedules.push(Schedule {
                payment_times,
                accruals,
            });
        }

        // Market discount factors for every time the tabulation touches.
        let mut market_df: Vec<(Time, Real)> = Vec::new();
        for (i, &d) in expiry_dates.iter().enumerate() {
            market_df.push((expiry_times[i], curve.discount(d)?));
        }
        market_df.push((numeraire_time, curve.discount(terminal_date)?));

        // Smiles, with the configured pre-processing.
        let mut raw_smiles = Vec::with_capacity(n);
        let mut smiles: Vec<Rc<dyn SmileSection>> = Vec::with_capacity(n);
        for i in 0..n {
            let raw = smile_source(
                &*curve,
                expiry_dates[i],
                &schedules[i],
                numeraire_time,
            )?;
            raw_smiles.push(raw.clone());
            if settings.adjustments.contains(Adjustments::KAHALE_SMILE) {
                let kahale = KahaleSmileSection::new(
                    raw,
                    settings
                        .adjustments
                        .contains(Adjustments::KAHALE_INTERPOLATION),
                    settings
                        .adjustments
                        .contains(Adjustments::SMILE_EXPONENTIAL_EXTRAPOLATION),
                    settings
                        .adjustments
                        .contains(Adjustments::SMILE_DELETE_ARBITRAGE_POINTS),
                    &[],
                    settings.digital_gap,
                )?;
                smiles.push(Rc::new(kahale));
            } else {
                smiles.push(raw_smiles[i].clone());
            }
        }

        let state = MfStateProcess::new(
            reversion,
            expiry_times[..n - 1].to_vec(),
            vec![0.01; n],
        )?;

        let points = settings.y_grid_points;
        let span = settings.y_std_devs;
        let grid: Vec<Real> = (0..points)
            .map(|k| -span + 2.0 * span * k as Real / (points - 1) as Real)
            .collect();

        let model = Self {
            gh: GaussHermite::new(settings.gauss_hermite_points)?,
            settings,
            curve,
            kind,
            expiry_dates,
            expiry_times,
            schedules,
            numeraire_time,
            smiles,
            raw_smiles,
            market_df,
            state: RefCell::new(state),
            grid,
            tabulation: RefCell::new(Vec::new()),
            outputs: RefCell::new(ModelOutputs::default()),
        };
        model.update_numeraire_tabulation()?;
        Ok(model)
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }

    pub fn expiry_dates(&self) -> &[Date] {
        &self.expiry_dates
    }

    pub fn model_outputs(&self) -> ModelOutputs {
        self.outputs.borrow().clone()
    }

    pub fn volatilities(&self) -> Vec<Real> {
        self.state.borrow().vols().to_vec()
    }

    /// Replaces the per-step volatilities and recalibrates the numeraire.
    pub fn set_volatilities(&self, vols: Vec<Real>) -> PricingResult<()> {
        self.state.borrow_mut().set_vols(vols)?;
        self.update_numeraire_tabulation()
    }

    fn market_discount(&self, t: Time) -> PricingResult<Real> {
        self.market_df
            .iter()
            .find(|(s, _)| (s - t).abs() < TIME_TOL)
            .map(|(_, df)| *df)
            .ok_or(PricingError::IllegalArgument(
                IllegalArgument::NotACalibrationTime(t),
            ))
    }

    fn expiry_index(&self, t: Time) -> PricingResult<usize> {
        self.expiry_times
            .iter()
            .position(|&s| (s - t).abs() < TIME_TOL)
            .ok_or(PricingError::IllegalArgument(
                IllegalArgument::NotACalibrationTime(t),
            ))
    }

    /// Currency annuity of calibration instrument i off the input curve.
    fn market_annuity(&self, i: usize) -> PricingResult<Real> {
        let schedule = &self.schedules[i];
        let mut annuity = 0.0;
        for (&t, &tau) in schedule.payment_times.iter().zip(&schedule.accruals) {
            annuity += tau * self.market_discount(t)?;
        }
        Ok(annuity)
    }

    // --------------------------------------------------------------------------------------------
    // Numeraire calibration
    // --------------------------------------------------------------------------------------------

    #[instrument(skip(self), fields(expiries = self.expiry_times.len()))]
    fn update_numeraire_tabulation(&self) -> PricingResult<()> {
        let n = self.expiry_times.len();
        let p0n = self.market_discount(self.numeraire_time)?;
        let mut tabs: Vec<Option<ExpiryTabulation>> = (0..n).map(|_| None).collect();

        for i in (0..n).rev() {
            let variance = {
                let state = self.state.borrow();
                state.variance(0.0, 0.0, self.expiry_times[i])
            };

            // Deflated bonds for the schedule's non-terminal payments,
            // by conditional expectation off the next expiry.
            let mut deflated_bonds: Vec<(Time, Vec<Real>)> = Vec::new();
            for &t in &self.schedules[i].payment_times {
                if (t - self.numeraire_time).abs() < TIME_TOL {
                    continue;
                }
                let next = tabs[i + 1]
                    .as_ref()
                    .ok_or(PricingError::Assertion(
                        crate::error::AssertionFailure::MissingTabulation(i + 1),
                    ))?;
                let source = if (t - self.expiry_times[i + 1]).abs() < TIME_TOL {
                    &next.inv_numeraire
                } else {
                    &next
                        .deflated_bonds
                        .iter()
                        .find(|(s, _)| (s - t).abs() < TIME_TOL)
                        .ok_or(PricingError::IllegalArgument(
                            IllegalArgument::Message(format!(
                                "payment time {t} is neither a later expiry nor the terminal date"
                            )),
                        ))?
                        .1
                };
                let values =
                    self.conditional_expectation(source, next.variance, variance);
                deflated_bonds.push((t, values));
            }

            // Deflated annuity weight per node.
            let points = self.grid.len();
            let mut weights = vec![0.0; points];
            for (j, &t) in self.schedules[i].payment_times.iter().enumerate() {
                let tau = self.schedules[i].accruals[j];
                if (t - self.numeraire_time).abs() < TIME_TOL {
                    for w in weights.iter_mut() {
                        *w += tau;
                    }
                } else {
                    let bonds = &deflated_bonds
                        .iter()
                        .find(|(s, _)| (s - t).abs() < TIME_TOL)
                        .expect("tabulated above")
                        .1;
                    for (w, d) in weights.iter_mut().zip(bonds.iter()) {
                        *w += tau * d;
                    }
                }
            }

            // Market digitals against model digitals: solve the rate map.
            let smile = &self.smiles[i];
            let market_annuity = self.market_annuity(i)?;
            let digitals = upper_integrals(&self.grid, &weights);
            let mut rates = vec![0.0; points];
            for k in 0..points {
                let target = (digitals[k] * p0n / market_annuity).clamp(0.0, 1.0 - 1e-14);
                rates[k] = self.invert_market_digital(smile.as_ref(), target)?;
            }
            self.enforce_monotone(&mut rates, i)?;

            // Numeraire grid from the rate map.
            let inv_numeraire: Vec<Real> = match self.kind {
                BasketKind::Swaption => weights
                    .iter()
                    .zip(&rates)
                    .map(|(&w, &g)| 1.0 + w * g)
                    .collect(),
                BasketKind::Caplet => {
                    let tau = self.schedules[i].accruals[0];
                    weights
                        .iter()
                        .zip(&rates)
                        .map(|(&w, &g)| w * (1.0 / tau + g))
                        .collect()
                }
            };

            debug!(
                expiry = %self.expiry_dates[i],
                variance,
                "numeraire tabulated"
            );
            tabs[i] = Some(ExpiryTabulation {
                variance,
                rates,
                weights,
                inv_numeraire,
                deflated_bonds,
            });
        }

        crate::ensure_invariant!(
            tabs.iter().all(|t| t.is_some()),
            "numeraire tabulation incomplete after the backward pass"
        );
        *self.tabulation.borrow_mut() = tabs.into_iter().flatten().collect();
        self.compute_outputs(p0n)?;
        Ok(())
    }

    /// E[f(x') | x] on the normalized grid: x' ~ N(x, Δv), f linear
    /// between the next expiry's nodes.
    fn conditional_expectation(
        &self,
        next_values: &[Real],
        next_variance: Real,
        variance: Real,
    ) -> Vec<Real> {
        let dv = (next_variance - variance).max(0.0);
        let next_sd = next_variance.sqrt();
        let sd = variance.sqrt();
        let interp = LinearInterpolation::new(
            self.grid.clone(),
            next_values.to_vec(),
            Extrapolation::Linear,
        )
        .expect("grid is strictly increasing");
        if dv < 1e-16 {
            // Degenerate step: state carries over.
            return self
                .grid
                .iter()
                .map(|&s| interp.value(s * sd / next_sd))
                .collect();
        }
        let step_sd = dv.sqrt();
        self.grid
            .iter()
            .map(|&s| {
                let x = s * sd;
                self.gh.gaussian_expectation(|z| {
                    interp.value((x + step_sd * z) / next_sd)
                })
            })
            .collect()
    }

    /// Finds K with market digital(K) = `target`; digitals decrease in
    /// the strike, rates live in [lower_rate_bound, upper_rate_bound].
    fn invert_market_digital(
        &self,
        smile: &dyn SmileSection,
        target: Real,
    ) -> PricingResult<Rate> {
        let gap = self.settings.digital_gap;
        let low = self.settings.lower_rate_bound.max(gap);
        let high = self.settings.upper_rate_bound;
        let digital_low = smile.digital_option_price(low, gap)?;
        if target >= digital_low {
            return Ok(self.settings.lower_rate_bound);
        }
        let digital_high = smile.digital_option_price(high, gap)?;
        if target <= digital_high {
            return Ok(high);
        }
        let objective =
            |k: Real| -> Real { smile.digital_option_price(k, gap).unwrap_or(0.0) - target };
        let solver = Brent::default();
        solver.solve_bracketed(
            &Objective(objective),
            self.settings.market_rate_accuracy,
            0.5 * (low + high),
            low,
            high,
        )
    }

    fn enforce_monotone(&self, rates: &mut [Real], expiry: usize) -> PricingResult<()> {
        let tolerance = 100.0 * self.settings.market_rate_accuracy;
        for k in 1..rates.len() {
            if rates[k] < rates[k - 1] {
                crate::reject_result!(
                    rates[k - 1] - rates[k] <= tolerance,
                    IllegalResult::NonMonotoneRates {
                        expiry: self.expiry_dates[expiry].to_string(),
                    }
                );
                rates[k] = rates[k - 1];
            }
        }
        Ok(())
    }

    fn compute_outputs(&self, p0n: Real) -> PricingResult<()> {
        let n = self.expiry_times.len();
        let tabs = self.tabulation.borrow();
        let mut out = ModelOutputs {
            expiries: self.expiry_dates.clone(),
            ..ModelOutputs::default()
        };
        for i in 0..n {
            let tab = &tabs[i];
            let t = self.expiry_times[i];
            let market_df = self.market_discount(t)?;
            out.market_zerorate.push(-market_df.ln() / t);
            let model_df = p0n * integral_phi(&self.grid, &tab.inv_numeraire);
            out.model_zerorate.push(-model_df.ln() / t);

            let smile = &self.smiles[i];
            let raw = &self.raw_smiles[i];
            let forward = smile.atm_level();
            let annuity = self.market_annuity(i)?;
            let mut strikes = Vec::new();
            let (mut mc, mut mdc, mut mp, mut mdp, mut rc, mut rp) =
                (Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new());
            for &m in &self.settings.smile_moneyness_checkpoints {
                let strike = m * forward;
                strikes.push(strike);
                mc.push(annuity * smile.option_price(strike, OptionType::Call)?);
                mp.push(annuity * smile.option_price(strike, OptionType::Put)?);
                rc.push(annuity * raw.option_price(strike, OptionType::Call)?);
                rp.push(annuity * raw.option_price(strike, OptionType::Put)?);
                mdc.push(
                    p0n * option_integral(&self.grid, &tab.rates, &tab.weights, strike, true),
                );
                mdp.push(
                    p0n * option_integral(&self.grid, &tab.rates, &tab.weights, strike, false),
                );
            }
            out.smile_strikes.push(strikes);
            out.market_call_premium.push(mc);
            out.model_call_premium.push(mdc);
            out.market_put_premium.push(mp);
            out.model_put_premium.push(mdp);
            out.market_raw_call_premium.push(rc);
            out.market_raw_put_premium.push(rp);
        }
        *self.outputs.borrow_mut() = out;
        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Secondary calibration
    // --------------------------------------------------------------------------------------------

    /// Least-squares fit of the per-step volatilities to a set of
    /// helpers: minimizes Σ wᵢ·(model − market)² under the end criteria.
    pub fn calibrate(
        &self,
        helpers: &[&dyn crate::calibration::CalibrationHelper],
        optimizer: &LevenbergMarquardt,
        criteria: &EndCriteria,
    ) -> PricingResult<()> {
        require!(!helpers.is_empty(), "no calibration helpers given");
        let initial = self.volatilities();
        let mut problem = |params: &[f64]| -> PricingResult<Vec<f64>> {
            // Positivity via squaring.
            let vols: Vec<Real> = params.iter().map(|&p| p * p).collect();
            self.set_volatilities(vols)?;
            helpers
                .iter()
                .map(|h| {
                    let weight = h.weight().sqrt();
                    Ok(weight * (h.model_value(self)? - h.market_value()?))
                })
                .collect()
        };
        let start: Vec<Real> = initial.iter().map(|v| v.sqrt()).collect();
        let result = optimizer.minimize(&mut problem, &start, criteria)?;
        let vols: Vec<Real> = result.parameters.iter().map(|&p| p * p).collect();
        self.set_volatilities(vols)?;
        debug!(cost = result.cost, iterations = result.iterations, "volatility calibration done");
        Ok(())
    }
}

impl Gaussian1dModel for MarkovFunctional {
    fn termstructure(&self) -> Handle<dyn TermStructure> {
        self.curve.clone()
    }

    fn numeraire_time(&self) -> Time {
        self.numeraire_time
    }

    fn state_stddev(&self, t: Time) -> Real {
        self.state.borrow().variance(0.0, 0.0, t).sqrt()
    }

    fn numeraire(&self, t: Time, y: Real) -> PricingResult<Real> {
        if t.abs() < TIME_TOL {
            return self.market_discount(self.numeraire_time);
        }
        let i = self.expiry_index(t)?;
        let tabs = self.tabulation.borrow();
        let tab = &tabs[i];
        let s = y / tab.variance.sqrt();
        let interp = LinearInterpolation::new(
            self.grid.clone(),
            tab.inv_numeraire.clone(),
            Extrapolation::Linear,
        )?;
        Ok(1.0 / interp.value(s).max(1e-12))
    }

    fn zerobond(&self, t: Time, maturity: Time, y: Real) -> PricingResult<Real> {
        if t.abs() < TIME_TOL {
            return self.market_discount(maturity);
        }
        if (maturity - t).abs() < TIME_TOL {
            return Ok(1.0);
        }
        let numeraire = self.numeraire(t, y)?;
        if (maturity - self.numeraire_time).abs() < TIME_TOL {
            return Ok(numeraire);
        }
        let i = self.expiry_index(t)?;
        let tabs = self.tabulation.borrow();
        let tab = &tabs[i];
        let bonds = &tab
            .deflated_bonds
            .iter()
            .find(|(s, _)| (s - maturity).abs() < TIME_TOL)
            .ok_or(PricingError::IllegalArgument(
                IllegalArgument::NotACalibrationTime(maturity),
            ))?
            .1;
        let s = y / tab.variance.sqrt();
        let interp =
            LinearInterpolation::new(self.grid.clone(), bonds.to_vec(), Extrapolation::Linear)?;
        Ok(interp.value(s) * numeraire)
    }
}

// ================================================================================================
// Quadrature helpers on the normalized grid
// ================================================================================================

fn phi(s: Real) -> Real {
    gaussian_pdf(s, 0.0, 1.0)
}

/// Simpson on one interval with linear f.
fn simpson_interval(a: Real, b: Real, fa: Real, fb: Real) -> Real {
    let m = 0.5 * (a + b);
    let fm = 0.5 * (fa + fb);
    (b - a) / 6.0 * (fa * phi(a) + 4.0 * fm * phi(m) + fb * phi(b))
}

/// ∫ f(s)·φ(s) ds over the grid plus flat tails.
fn integral_phi(grid: &[Real], f: &[Real]) -> Real {
    let n = grid.len();
    let mut total = f[0] * normal_cdf(grid[0]) + f[n - 1] * (1.0 - normal_cdf(grid[n - 1]));
    for k in 0..n - 1 {
        total += simpson_interval(grid[k], grid[k + 1], f[k], f[k + 1]);
    }
    total
}

/// J(k) = ∫_{s_k}^{∞} w(s)·φ(s) ds for every node.
fn upper_integrals(grid: &[Real], w: &[Real]) -> Vec<Real> {
    let n = grid.len();
    let mut out = vec![0.0; n];
    out[n - 1] = w[n - 1] * (1.0 - normal_cdf(grid[n - 1]));
    for k in (0..n - 1).rev() {
        out[k] = out[k + 1] + simpson_interval(grid[k], grid[k + 1], w[k], w[k + 1]);
    }
    out
}

/// ∫ (±(g(s) − K))⁺ · w(s) · φ(s) ds with the kink located exactly on the
/// piecewise-linear rate map.
fn option_integral(grid: &[Real], g: &[Real], w: &[Real], strike: Real, call: bool) -> Real {
    let n = grid.len();
    let payoff = |gv: Real| -> Real {
        if call {
            (gv - strike).max(0.0)
        } else {
            (strike - gv).max(0.0)
        }
    };
    let mut total = payoff(g[0]) * w[0] * normal_cdf(grid[0])
        + payoff(g[n - 1]) * w[n - 1] * (1.0 - normal_cdf(grid[n - 1]));
    for k in 0..n - 1 {
        let (a, b) = (grid[k], grid[k + 1]);
        let (ga, gb) = (g[k], g[k + 1]);
        let (wa, wb) = (w[k], w[k + 1]);
        // Split at the kink when the strike is crossed inside the
        // interval.
        let crossing = (ga - strike) * (gb - strike) < 0.0;
        if crossing {
            let frac = (strike - ga) / (gb - ga);
            let s_star = a + frac * (b - a);
            total += simpson_payoff(a, s_star, payoff(ga) * wa, 0.0);
            total += simpson_payoff(s_star, b, 0.0, payoff(gb) * wb);
        } else {
            total += simpson_payoff(a, b, payoff(ga) * wa, payoff(gb) * wb);
        }
    }
    total
}

fn simpson_payoff(a: Real, b: Real, fa: Real, fb: Real) -> Real {
    if b <= a {
        return 0.0;
    }
    simpson_interval(a, b, fa, fb)
}

// ================================================================================================
// Curve helpers
// ================================================================================================

fn forward_swap_rate(
    curve: &dyn TermStructure,
    expiry: Date,
    schedule: &Schedule,
) -> PricingResult<Rate> {
    let reference = curve.reference_date();
    let df_by_time = |t: Time| -> PricingResult<Real> {
        // Times were produced from dates through the same day count, so
        // the round trip is exact to the day.
        let days = (t * 365.0).round() as i64;
        curve.discount(reference + days)
    };
    let t_expiry = curve.time_from_reference(expiry);
    let mut annuity = 0.0;
    for (&t, &tau) in schedule.payment_times.iter().zip(&schedule.accruals) {
        annuity += tau * df_by_time(t)?;
    }
    let terminal = *schedule.payment_times.last().expect("non-empty schedule");
    Ok((df_by_time(t_expiry)? - df_by_time(terminal)?) / annuity)
}

fn forward_period_rate(
    curve: &dyn TermStructure,
    expiry: Date,
    schedule: &Schedule,
) -> PricingResult<Rate> {
    let reference = curve.reference_date();
    let t_expiry = curve.time_from_reference(expiry);
    let t_pay = schedule.payment_times[0];
    let tau = schedule.accruals[0];
    let df_start = curve.discount(reference + (t_expiry * 365.0).round() as i64)?;
    let df_end = curve.discount(reference + (t_pay * 365.0).round() as i64)?;
    Ok((df_start / df_end - 1.0) / tau)
}
