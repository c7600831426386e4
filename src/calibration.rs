//! Black-vol calibration helpers: instruments that expose their market
//! value, their value under a model, and the difference the optimizer
//! squeezes.

use crate::common::{Rate, Real, Time, Volatility};
use crate::error::PricingResult;
use crate::handle::Handle;
use crate::math::black::{black_formula, OptionType};
use crate::models::gaussian1d::Gaussian1dModel;
use crate::require;
use crate::solver::{Brent, Objective, Solver1D};
use crate::termstructure::TermStructure;
use crate::time::Date;

/// An instrument quoted in the market that a model should reproduce.
pub trait CalibrationHelper {
    /// Value implied by the quoted Black volatility.
    fn market_value(&self) -> PricingResult<Real>;

    /// Value under the model being calibrated.
    fn model_value(&self, model: &dyn Gaussian1dModel) -> PricingResult<Real>;

    fn weight(&self) -> Real {
        1.0
    }

    /// Black volatility reproducing `value`, found by root search.
    fn implied_volatility(&self, value: Real, accuracy: Real) -> PricingResult<Volatility>;

    /// Relative pricing error of the model against the market.
    fn calibration_error(&self, model: &dyn Gaussian1dModel) -> PricingResult<Real> {
        let market = self.market_value()?;
        Ok((market - self.model_value(model)?) / market)
    }
}

/// European swaption quoted by its Black volatility.
pub struct SwaptionHelper {
    curve: Handle<dyn TermStructure>,
    expiry: Date,
    payment_dates: Vec<Date>,
    accruals: Vec<Real>,
    strike: Rate,
    vol: Volatility,
    weight: Real,
    integration_points: usize,
}

impl SwaptionHelper {
    pub fn new(
        curve: Handle<dyn TermStructure>,
        expiry: Date,
        payment_dates: Vec<Date>,
        accruals: Vec<Real>,
        strike: Option<Rate>,
        vol: Volatility,
        weight: Real,
    ) -> PricingResult<Self> {
        require!(!payment_dates.is_empty(), "swaption helper needs a schedule");
        require!(
            payment_dates.len() == accruals.len(),
            "schedule/accrual mismatch"
        );
        let mut helper = Self {
            curve,
            expiry,
            payment_dates,
            accruals,
            strike: 0.0,
            vol,
            weight,
            integration_points: 64,
        };
        // A missing strike means ATM.
        helper.strike = match strike {
            Some(k) => k,
            None => helper.forward_rate()?,
        };
        Ok(helper)
    }

    pub fn forward_rate(&self) -> PricingResult<Rate> {
        let annuity = self.annuity()?;
        let float_leg = self.curve.discount(self.expiry)?
            - self
                .curve
                .discount(*self.payment_dates.last().expect("non-empty"))?;
        Ok(float_leg / annuity)
    }

    pub fn annuity(&self) -> PricingResult<Real> {
        let mut annuity = 0.0;
        for (d, tau) in self.payment_dates.iter().zip(&self.accruals) {
            annuity += tau * self.curve.discount(*d)?;
        }
        Ok(annuity)
    }

    fn exercise_time(&self) -> Time {
        self.curve.time_from_reference(self.expiry)
    }

    fn black_value(&self, vol: Volatility) -> PricingResult<Real> {
        let forward = self.forward_rate()?;
        let stddev = vol * self.exercise_time().sqrt();
        Ok(self.annuity()? * black_formula(OptionType::Call, self.strike, forward, stddev, 1.0)?)
    }
}

impl CalibrationHelper for SwaptionHelper {
    fn market_value(&self) -> PricingResult<Real> {
        self.black_value(self.vol)
    }

    fn model_value(&self, model: &dyn Gaussian1dModel) -> PricingResult<Real> {
        let payment_times: Vec<Time> = self
            .payment_dates
            .iter()
            .map(|&d| self.curve.time_from_reference(d))
            .collect();
        crate::engines::gaussian1d::swaption_npv(
            model,
            self.exercise_time(),
            &payment_times,
            &self.accruals,
            self.strike,
            crate::instruments::SwapKind::Payer,
            self.integration_points,
        )
    }

    fn weight(&self) -> Real {
        self.weight
    }

    fn implied_volatility(&self, value: Real, accuracy: Real) -> PricingResult<Volatility> {
        let objective = |vol: Real| self.black_value(vol).unwrap_or(f64::MAX) - value;
        let solver = Brent::default();
        solver.solve_bracketed(&Objective(objective), accuracy, 0.2, 1e-7, 5.0)
    }
}

/// Cap quoted by its flat Black volatility.
pub struct CapHelper {
    curve: Handle<dyn TermStructure>,
    fixing_dates: Vec<Date>,
    payment_dates: Vec<Date>,
    accruals: Vec<Real>,
    strike: Rate,
    vol: Volatility,
    weight: Real,
    integration_points: usize,
}

impl CapHelper {
    pub fn new(
        curve: Handle<dyn TermStructure>,
        fixing_dates: Vec<Date>,
        payment_dates: Vec<Date>,
        accruals: Vec<Real>,
        strike: Rate,
        vol: Volatility,
        weight: Real,
    ) -> PricingResult<Self> {
        require!(!fixing_dates.is_empty(), "cap helper needs periods");
        require!(
            fixing_dates.len() == payment_dates.len() && fixing_dates.len() == accruals.len(),
            "period description mismatch"
        );
        Ok(Self {
            curve,
            fixing_dates,
            payment_dates,
            accruals,
            strike,
            vol,
            weight,
            integration_points: 64,
        })
    }

    fn black_value(&self, vol: Volatility) -> PricingResult<Real> {
        let mut value = 0.0;
        for i in 0..self.fixing_dates.len() {
            let t = self.curve.time_from_reference(self.fixing_dates[i]);
            if t <= 0.0 {
                continue;
            }
            let df_start = self.curve.discount(self.fixing_dates[i])?;
            let df_end = self.curve.discount(self.payment_dates[i])?;
            let forward = (df_start / df_end - 1.0) / self.accruals[i];
            value += self.accruals[i]
                * black_formula(
                    OptionType::Call,
                    self.strike,
                    forward,
                    vol * t.sqrt(),
                    df_end,
                )?;
        }
        Ok(value)
    }
}

impl CalibrationHelper for CapHelper {
    fn market_value(&self) -> PricingResult<Real> {
        self.black_value(self.vol)
    }

    fn model_value(&self, model: &dyn Gaussian1dModel) -> PricingResult<Real> {
        let fixings: Vec<Time> = self
            .fixing_dates
            .iter()
            .map(|&d| self.curve.time_from_reference(d))
            .collect();
        let payments: Vec<Time> = self
            .payment_dates
            .iter()
            .map(|&d| self.curve.time_from_reference(d))
            .collect();
        crate::engines::gaussian1d::capfloor_npv(
            model,
            &fixings,
            &payments,
            &self.accruals,
            self.strike,
            crate::instruments::CapFloorKind::Cap,
            self.integration_points,
        )
    }

    fn weight(&self) -> Real {
        self.weight
    }

    fn implied_volatility(&self, value: Real, accuracy: Real) -> PricingResult<Volatility> {
        let objective = |vol: Real| self.black_value(vol).unwrap_or(f64::MAX) - value;
        let solver = Brent::default();
        solver.solve_bracketed(&Objective(objective), accuracy, 0.2, 1e-7, 5.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::termstructure::FlatForward;
    use crate::time::DayCount;
    use std::rc::Rc;

    fn reference() -> Date {
        Date::from_dmy(14, 11, 2012).unwrap()
    }

    fn curve() -> Handle<dyn TermStructure> {
        let c = Handle::new(FlatForward::new(reference(), 0.03, DayCount::Actual365Fixed));
        Handle::from_rc(c.rc() as Rc<dyn TermStructure>)
    }

    fn helper(vol: Volatility) -> SwaptionHelper {
        let expiry = reference().plus_years(1).unwrap();
        let payments: Vec<Date> = (2..=5)
            .map(|y| reference().plus_years(y).unwrap())
            .collect();
        let accruals = vec![1.0; payments.len()];
        SwaptionHelper::new(curve(), expiry, payments, accruals, None, vol, 1.0).unwrap()
    }

    #[test]
    fn implied_volatility_round_trip() {
        let h = helper(0.20);
        let value = h.market_value().unwrap();
        assert!(value > 0.0);
        let implied = h.implied_volatility(value, 1e-10).unwrap();
        assert!((implied - 0.20).abs() < 1e-8);
    }

    #[test]
    fn market_value_grows_with_volatility() {
        assert!(helper(0.30).market_value().unwrap() > helper(0.10).market_value().unwrap());
    }
}
