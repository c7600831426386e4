use crate::common::{Rate, Real};
use crate::error::{PricingError, PricingResult};
use crate::instrument::{Instrument, InstrumentCore, PriceMode};
use crate::math::black::{black_formula, OptionType};
use crate::require;
use crate::termstructure::TermStructure;
use crate::time::Date;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapFloorKind {
    Cap,
    Floor,
}

/// Strip of caplets/floorlets on a simply compounded forward rate.
pub struct CapFloor {
    core: InstrumentCore,
    pub kind: CapFloorKind,
    /// Period start (fixing) dates.
    pub fixing_dates: Vec<Date>,
    /// Period end / payment dates, aligned with the fixings.
    pub payment_dates: Vec<Date>,
    /// Accrual fractions per period.
    pub accruals: Vec<Real>,
    pub strike: Rate,
}

impl CapFloor {
    pub fn new(
        isin: impl Into<String>,
        kind: CapFloorKind,
        fixing_dates: Vec<Date>,
        payment_dates: Vec<Date>,
        accruals: Vec<Real>,
        strike: Rate,
    ) -> PricingResult<Self> {
        require!(!fixing_dates.is_empty(), "cap/floor needs periods");
        require!(
            fixing_dates.len() == payment_dates.len() && fixing_dates.len() == accruals.len(),
            "fixing/payment/accrual counts must agree"
        );
        require!(
            fixing_dates
                .iter()
                .zip(&payment_dates)
                .all(|(f, p)| f < p),
            "each fixing must precede its payment"
        );
        Ok(Self {
            core: InstrumentCore::new(isin, "cap/floor", PriceMode::OverTheCounter),
            kind,
            fixing_dates,
            payment_dates,
            accruals,
            strike,
        })
    }

    /// Annual periods out to `years`.
    pub fn annual(
        isin: impl Into<String>,
        kind: CapFloorKind,
        reference: Date,
        years: i32,
        strike: Rate,
    ) -> PricingResult<Self> {
        require!(years >= 1, "need at least one period, got {years}");
        let mut fixing_dates = Vec::new();
        let mut payment_dates = Vec::new();
        let mut accruals = Vec::new();
        for y in 0..years {
            let start = reference.plus_years(y)?;
            let end = reference.plus_years(y + 1)?;
            fixing_dates.push(start);
            payment_dates.push(end);
            accruals.push((end - start) as Real / 365.0);
        }
        Self::new(isin, kind, fixing_dates, payment_dates, accruals, strike)
    }

    /// Simply compounded forward rate of period `i`.
    pub fn forward_rate(&self, curve: &dyn TermStructure, i: usize) -> PricingResult<Rate> {
        let df_start = curve.discount(self.fixing_dates[i])?;
        let df_end = curve.discount(self.payment_dates[i])?;
        Ok((df_start / df_end - 1.0) / self.accruals[i])
    }
}

impl Instrument for CapFloor {
    fn core(&self) -> &InstrumentCore {
        &self.core
    }

    fn use_term_structure(&self) -> bool {
        true
    }

    fn use_swaption_volatility(&self) -> bool {
        false
    }

    fn use_forward_volatility(&self) -> bool {
        true
    }

    /// Black-76 caplet-by-caplet valuation off the forward (optionlet)
    /// volatility structure.
    fn perform_forward_vol_calculations(&self) -> PricingResult<()> {
        let core = self.core();
        let curve = core
            .term_structure()
            .ok_or_else(|| PricingError::illegal_argument("term structure not set"))?;
        let vols = core
            .forward_volatility()
            .ok_or_else(|| PricingError::illegal_argument("forward volatility not set"))?;

        let option_type = match self.kind {
            CapFloorKind::Cap => OptionType::Call,
            CapFloorKind::Floor => OptionType::Put,
        };
        let mut npv = 0.0;
        let mut any_live = false;
        for i in 0..self.fixing_dates.len() {
            let fixing = self.fixing_dates[i];
            if fixing <= curve.reference_date() {
                continue;
            }
            any_live = true;
            let forward = self.forward_rate(&*curve, i)?;
            let t = curve.time_from_reference(fixing);
            let sigma = vols.volatility(fixing, self.strike, forward)?;
            let df = curve.discount(self.payment_dates[i])?;
            npv += self.accruals[i]
                * black_formula(option_type, self.strike, forward, sigma * t.sqrt(), df)?;
        }
        if !any_live {
            core.set_expired(true);
            return Ok(());
        }
        core.set_npv(npv);
        Ok(())
    }

    fn perform_term_structure_calculations(&self) -> PricingResult<()> {
        if self.core().forward_volatility().is_some() {
            self.perform_forward_vol_calculations()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Handle;
    use crate::termstructure::FlatForward;
    use crate::time::DayCount;
    use crate::volatility::ConstantOptionletVolatility;
    use std::rc::Rc;

    fn reference() -> Date {
        Date::from_dmy(14, 11, 2012).unwrap()
    }

    fn wire(cap: &CapFloor, rate: Rate, vol: f64) {
        let c = Handle::new(FlatForward::new(reference(), rate, DayCount::Actual365Fixed));
        cap.set_term_structure(Handle::from_rc(c.rc() as Rc<dyn TermStructure>));
        cap.set_forward_volatility(Rc::new(ConstantOptionletVolatility::new(
            reference(),
            vol,
            DayCount::Actual365Fixed,
        )));
    }

    #[test]
    fn cap_floor_parity_at_the_forward() {
        // With strike = forward per period, cap and floor have the same
        // value; the first period has no optionality left and is skipped.
        let cap = CapFloor::annual("C1", CapFloorKind::Cap, reference(), 5, 0.0304).unwrap();
        let floor = CapFloor::annual("F1", CapFloorKind::Floor, reference(), 5, 0.0304).unwrap();
        wire(&cap, 0.03, 0.2);
        wire(&floor, 0.03, 0.2);
        let c = cap.npv().unwrap();
        let f = floor.npv().unwrap();
        assert!(c > 0.0);
        // Strike is only approximately ATM for every period, so allow a
        // small gap.
        assert!((c - f).abs() < 5e-4, "cap {c} vs floor {f}");
    }

    #[test]
    fn deep_out_of_the_money_cap_is_nearly_worthless() {
        let cap = CapFloor::annual("C2", CapFloorKind::Cap, reference(), 5, 0.30).unwrap();
        wire(&cap, 0.03, 0.2);
        assert!(cap.npv().unwrap() < 1e-6);
    }

    #[test]
    fn forward_rates_match_the_curve_compounding() {
        let cap = CapFloor::annual("C3", CapFloorKind::Cap, reference(), 3, 0.03).unwrap();
        let c = Handle::new(FlatForward::new(reference(), 0.03, DayCount::Actual365Fixed));
        let curve: Handle<dyn TermStructure> = Handle::from_rc(c.rc() as Rc<dyn TermStructure>);
        let f = cap.forward_rate(&*curve, 1).unwrap();
        // Simply compounded annual forward of a 3% continuous curve.
        assert!((f - (0.03f64.exp() - 1.0)).abs() < 1e-3, "forward {f}");
    }
}
