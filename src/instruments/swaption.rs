use crate::common::{Rate, Real, Time};
use crate::error::{PricingError, PricingResult};
use crate::handle::Handle;
use crate::instrument::{Instrument, InstrumentCore, PriceMode};
use crate::math::black::{black_formula, OptionType};
use crate::termstructure::TermStructure;
use crate::time::Date;
use crate::require;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapKind {
    Payer,
    Receiver,
}

/// European swaption on a fixed-vs-float swap, described by its fixed-leg
/// schedule.
pub struct Swaption {
    core: InstrumentCore,
    pub kind: SwapKind,
    pub expiry: Date,
    /// Fixed-leg payment dates, strictly after the expiry.
    pub payment_dates: Vec<Date>,
    /// Fixed-leg accrual fractions, one per payment date.
    pub accruals: Vec<Real>,
    pub strike: Rate,
}

impl Swaption {
    pub fn new(
        isin: impl Into<String>,
        kind: SwapKind,
        expiry: Date,
        payment_dates: Vec<Date>,
        accruals: Vec<Real>,
        strike: Rate,
    ) -> PricingResult<Self> {
        require!(!payment_dates.is_empty(), "swaption needs a fixed schedule");
        require!(
            payment_dates.len() == accruals.len(),
            "schedule/accrual count mismatch: {} vs {}",
            payment_dates.len(),
            accruals.len()
        );
        require!(
            payment_dates.iter().all(|&d| d > expiry),
            "every payment date must lie after the expiry"
        );
        require!(
            payment_dates.windows(2).all(|w| w[0] < w[1]),
            "payment dates must be increasing"
        );
        Ok(Self {
            core: InstrumentCore::new(isin, "european swaption", PriceMode::OverTheCounter),
            kind,
            expiry,
            payment_dates,
            accruals,
            strike,
        })
    }

    /// An annual-fixed-leg swaption with expiry in `expiry_years` on a
    /// swap running to `terminal_years` (coterminal convention).
    pub fn coterminal(
        isin: impl Into<String>,
        kind: SwapKind,
        reference: Date,
        expiry_years: i32,
        terminal_years: i32,
        strike: Rate,
    ) -> PricingResult<Self> {
        require!(
            terminal_years > expiry_years,
            "terminal year {terminal_years} must exceed expiry year {expiry_years}"
        );
        let expiry = reference.plus_years(expiry_years)?;
        let mut payment_dates = Vec::new();
        let mut accruals = Vec::new();
        let mut previous = expiry;
        for y in (expiry_years + 1)..=terminal_years {
            let d = reference.plus_years(y)?;
            payment_dates.push(d);
            accruals.push((d - previous) as Real / 365.0);
            previous = d;
        }
        Self::new(isin, kind, expiry, payment_dates, accruals, strike)
    }

    pub fn terminal_date(&self) -> Date {
        *self.payment_dates.last().expect("validated non-empty")
    }

    /// Fixed-leg annuity Σ τⱼ·P(0, tⱼ).
    pub fn annuity(&self, curve: &dyn TermStructure) -> PricingResult<Real> {
        let mut a = 0.0;
        for (d, tau) in self.payment_dates.iter().zip(&self.accruals) {
            a += tau * curve.discount(*d)?;
        }
        Ok(a)
    }

    /// Forward swap rate of the underlying.
    pub fn forward_rate(&self, curve: &dyn TermStructure) -> PricingResult<Rate> {
        let float_leg = curve.discount(self.expiry)? - curve.discount(self.terminal_date())?;
        Ok(float_leg / self.annuity(curve)?)
    }

    pub fn exercise_time(&self, curve: &dyn TermStructure) -> Time {
        curve.time_from_reference(self.expiry)
    }
}

impl Instrument for Swaption {
    fn core(&self) -> &InstrumentCore {
        &self.core
    }

    fn use_term_structure(&self) -> bool {
        true
    }

    fn use_swaption_volatility(&self) -> bool {
        true
    }

    fn use_forward_volatility(&self) -> bool {
        false
    }

    /// Black-76 valuation on the annuity numeraire.
    fn perform_swaption_vol_calculations(&self) -> PricingResult<()> {
        let core = self.core();
        let curve = core
            .term_structure()
            .ok_or_else(|| PricingError::illegal_argument("term structure not set"))?;
        let vol = core
            .swaption_volatility()
            .ok_or_else(|| PricingError::illegal_argument("swaption volatility not set"))?;
        if self.expiry <= curve.reference_date() {
            core.set_expired(true);
            return Ok(());
        }
        let forward = self.forward_rate(&*curve)?;
        let annuity = self.annuity(&*curve)?;
        let t = self.exercise_time(&*curve);
        let swap_length = curve.time_from_reference(self.terminal_date()) - t;
        let sigma = vol.volatility(self.expiry, swap_length, self.strike, forward)?;
        let option_type = match self.kind {
            SwapKind::Payer => OptionType::Call,
            SwapKind::Receiver => OptionType::Put,
        };
        let npv = annuity
            * black_formula(option_type, self.strike, forward, sigma * t.sqrt(), 1.0)?;
        core.set_npv(npv);
        Ok(())
    }

    /// The curve moving re-triggers the same valuation.
    fn perform_term_structure_calculations(&self) -> PricingResult<()> {
        if self.core().swaption_volatility().is_some() {
            self.perform_swaption_vol_calculations()?;
        }
        Ok(())
    }
}

/// Convenience for tests and calibration baskets: wires curve and vol in
/// one call.
pub fn wire_swaption(
    swaption: &Swaption,
    curve: Handle<dyn TermStructure>,
    vol: std::rc::Rc<dyn crate::volatility::SwaptionVolatilityStructure>,
) {
    swaption.set_term_structure(curve);
    swaption.set_swaption_volatility(vol);
}
