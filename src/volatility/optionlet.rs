use super::smile::{FlatSmileSection, InterpolatedSmileSection, SmileSection};
use crate::common::{Real, Time, Volatility};
use crate::math::interpolation::{Extrapolation, LinearInterpolation};
use crate::observer::Observable;
use crate::time::{Date, DayCount};
use crate::{error::PricingResult, require};
use std::rc::Rc;

const SECTION_MONEYNESS: [Real; 9] = [0.25, 0.5, 0.75, 0.9, 1.0, 1.1, 1.25, 1.5, 2.0];

/// Caplet/floorlet (forward) volatilities per option date and strike.
pub trait OptionletVolatilityStructure {
    fn observable(&self) -> &Observable;

    fn reference_date(&self) -> Date;

    fn day_count(&self) -> DayCount {
        DayCount::Actual365Fixed
    }

    fn exercise_time(&self, option_date: Date) -> Time {
        self.day_count()
            .year_fraction(self.reference_date(), option_date)
    }

    fn volatility(
        &self,
        option_date: Date,
        strike: Real,
        forward: Real,
    ) -> PricingResult<Volatility>;

    fn smile_section(
        &self,
        option_date: Date,
        forward: Real,
    ) -> PricingResult<Rc<dyn SmileSection>> {
        let t = self.exercise_time(option_date);
        let mut strikes = Vec::with_capacity(SECTION_MONEYNESS.len());
        let mut stddevs = Vec::with_capacity(SECTION_MONEYNESS.len());
        for &m in &SECTION_MONEYNESS {
            let k = m * forward;
            strikes.push(k);
            stddevs.push(self.volatility(option_date, k, forward)? * t.sqrt());
        }
        Ok(Rc::new(InterpolatedSmileSection::new(
            t, strikes, stddevs, forward,
        )?))
    }
}

/// Flat optionlet volatility.
pub struct ConstantOptionletVolatility {
    reference_date: Date,
    vol: Volatility,
    day_count: DayCount,
    observable: Observable,
}

impl ConstantOptionletVolatility {
    pub fn new(reference_date: Date, vol: Volatility, day_count: DayCount) -> Self {
        Self {
            reference_date,
            vol,
            day_count,
            observable: Observable::new(),
        }
    }
}

impl OptionletVolatilityStructure for ConstantOptionletVolatility {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn reference_date(&self) -> Date {
        self.reference_date
    }

    fn day_count(&self) -> DayCount {
        self.day_count
    }

    fn volatility(
        &self,
        _option_date: Date,
        _strike: Real,
        _forward: Real,
    ) -> PricingResult<Volatility> {
        Ok(self.vol)
    }

    fn smile_section(
        &self,
        option_date: Date,
        forward: Real,
    ) -> PricingResult<Rc<dyn SmileSection>> {
        Ok(Rc::new(FlatSmileSection::new(
            self.exercise_time(option_date),
            self.vol,
            forward,
        )?))
    }
}

/// Term structure of optionlet vols, linear in option time, flat in
/// strike.
pub struct OptionletVolatilityCurve {
    reference_date: Date,
    day_count: DayCount,
    interpolation: LinearInterpolation,
    observable: Observable,
}

impl OptionletVolatilityCurve {
    pub fn new(
        reference_date: Date,
        option_dates: Vec<Date>,
        vols: Vec<Volatility>,
        day_count: DayCount,
    ) -> PricingResult<Self> {
        require!(!option_dates.is_empty(), "empty optionlet curve");
        require!(
            option_dates.len() == vols.len(),
            "date/vol count mismatch: {} vs {}",
            option_dates.len(),
            vols.len()
        );
        let mut times = vec![0.0];
        let mut values = vec![vols[0]];
        for (d, v) in option_dates.iter().zip(&vols) {
            times.push(day_count.year_fraction(reference_date, *d));
            values.push(*v);
        }
        Ok(Self {
            reference_date,
            day_count,
            interpolation: LinearInterpolation::new(times, values, Extrapolation::Flat)?,
            observable: Observable::new(),
        })
    }
}

impl OptionletVolatilityStructure for OptionletVolatilityCurve {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn reference_date(&self) -> Date {
        self.reference_date
    }

    fn day_count(&self) -> DayCount {
        self.day_count
    }

    fn volatility(
        &self,
        option_date: Date,
        _strike: Real,
        _forward: Real,
    ) -> PricingResult<Volatility> {
        Ok(self.interpolation.value(self.exercise_time(option_date)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_vol_and_flat_section() {
        let r = Date::from_dmy(14, 11, 2012).unwrap();
        let c = ConstantOptionletVolatility::new(r, 0.20, DayCount::Actual365Fixed);
        let d = r.plus_years(2).unwrap();
        assert_eq!(c.volatility(d, 0.05, 0.03).unwrap(), 0.20);
        let s = c.smile_section(d, 0.03).unwrap();
        assert!((s.exercise_time() - c.exercise_time(d)).abs() < 1e-12);
    }

    #[test]
    fn curve_interpolates_in_time() {
        let r = Date::from_dmy(14, 11, 2012).unwrap();
        let curve = OptionletVolatilityCurve::new(
            r,
            vec![r.plus_years(1).unwrap(), r.plus_years(3).unwrap()],
            vec![0.30, 0.20],
            DayCount::Actual365Fixed,
        )
        .unwrap();
        let v = curve
            .volatility(r.plus_years(2).unwrap(), 0.0, 0.0)
            .unwrap();
        assert!(v < 0.30 && v > 0.20);
    }
}
