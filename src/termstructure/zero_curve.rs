use super::{NativeQuantity, TermStructure};
use crate::common::{Rate, Real};
use crate::math::interpolation::{Extrapolation, LinearInterpolation};
use crate::observer::Observable;
use crate::time::{Date, DayCount};
use crate::{error::PricingResult, require};

/// Zero-yield curve linearly interpolated in time over pillar dates.
pub struct InterpolatedZeroCurve {
    reference_date: Date,
    max_date: Date,
    day_count: DayCount,
    interpolation: LinearInterpolation,
    observable: Observable,
}

impl InterpolatedZeroCurve {
    pub fn new(
        reference_date: Date,
        dates: Vec<Date>,
        zero_yields: Vec<Rate>,
        day_count: DayCount,
    ) -> PricingResult<Self> {
        require!(!dates.is_empty(), "zero curve needs at least one pillar");
        require!(
            dates.len() == zero_yields.len(),
            "pillar/rate count mismatch: {} vs {}",
            dates.len(),
            zero_yields.len()
        );
        require!(
            dates.windows(2).all(|w| w[0] < w[1]),
            "pillar dates must be strictly increasing"
        );
        require!(
            dates[0] > reference_date,
            "first pillar must lie after the reference date"
        );

        // Anchor the interpolation at t = 0 with the first pillar's rate
        // so short queries stay flat.
        let mut times = vec![0.0];
        let mut rates = vec![zero_yields[0]];
        for (d, r) in dates.iter().zip(&zero_yields) {
            times.push(day_count.year_fraction(reference_date, *d));
            rates.push(*r);
        }
        Ok(Self {
            reference_date,
            max_date: *dates.last().expect("non-empty checked above"),
            day_count,
            interpolation: LinearInterpolation::new(times, rates, Extrapolation::Flat)?,
            observable: Observable::new(),
        })
    }
}

impl TermStructure for InterpolatedZeroCurve {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn reference_date(&self) -> Date {
        self.reference_date
    }

    fn max_date(&self) -> Date {
        self.max_date
    }

    fn day_count(&self) -> DayCount {
        self.day_count
    }

    fn native(&self) -> NativeQuantity {
        NativeQuantity::ZeroYield
    }

    fn native_value(&self, date: Date) -> PricingResult<Real> {
        Ok(self.interpolation.value(self.time_from_reference(date)))
    }
}
