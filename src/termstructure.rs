//! Term structures of interest rates.
//!
//! A term structure is anything that natively provides one of
//! {zero yield, discount factor, instantaneous forward} plus shared
//! metadata; the other two quantities are derived through the standard
//! adapters in this module's provided methods. The capability is explicit
//! via [`NativeQuantity`] rather than through an inheritance ladder.

pub mod flat_forward;
pub mod implied;
pub mod spreaded;
pub mod zero_curve;

pub use flat_forward::FlatForward;
pub use implied::ImpliedTermStructure;
pub use spreaded::SpreadedTermStructure;
pub use zero_curve::InterpolatedZeroCurve;

use crate::common::{DiscountFactor, Rate, Real, Time};
use crate::error::{IllegalArgument, PricingError, PricingResult};
use crate::math::integration::trapezoid;
use crate::observer::Observable;
use crate::time::{Date, DayCount};

/// The quantity a concrete curve natively implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeQuantity {
    ZeroYield,
    Discount,
    Forward,
}

pub trait TermStructure {
    /// Subject for update notifications; dependents register here.
    fn observable(&self) -> &Observable;

    /// The date rates are measured from.
    fn reference_date(&self) -> Date;

    /// Earliest queryable date.
    fn min_date(&self) -> Date {
        self.reference_date()
    }

    /// Latest queryable date.
    fn max_date(&self) -> Date;

    fn day_count(&self) -> DayCount {
        DayCount::Actual365Fixed
    }

    fn native(&self) -> NativeQuantity;

    /// The natively implemented quantity at `date`. Implementations may
    /// assume the range check has already run.
    fn native_value(&self, date: Date) -> PricingResult<Real>;

    fn time_from_reference(&self, date: Date) -> Time {
        self.day_count().year_fraction(self.reference_date(), date)
    }

    fn check_range(&self, date: Date) -> PricingResult<()> {
        if date < self.min_date() || date > self.max_date() {
            return Err(PricingError::IllegalArgument(
                IllegalArgument::CurveRangeViolation {
                    date: date.to_string(),
                    min: self.min_date().to_string(),
                    max: self.max_date().to_string(),
                },
            ));
        }
        Ok(())
    }

    /// Continuously compounded zero yield at `date`.
    fn zero_yield(&self, date: Date) -> PricingResult<Rate> {
        self.check_range(date)?;
        match self.native() {
            NativeQuantity::ZeroYield => self.native_value(date),
            NativeQuantity::Discount => {
                let t = self.time_from_reference(date);
                if t < 1e-8 {
                    // At the reference date fall back to the first daily
                    // discount ratio.
                    let next = date + 1;
                    let df = self.native_value(next)?;
                    return Ok(-df.ln() / self.time_from_reference(next));
                }
                let df = self.native_value(date)?;
                Ok(-df.ln() / t)
            }
            NativeQuantity::Forward => {
                let t = self.time_from_reference(date);
                if t < 1e-8 {
                    return self.native_value(date);
                }
                // Average the instantaneous forward by trapezoidal
                // integration from the reference date.
                let reference = self.reference_date();
                let days = (date - reference) as f64;
                let steps = (days as usize).clamp(1, 256);
                Ok(trapezoid(
                    |u| {
                        let d = reference + (u * days).round() as i64;
                        self.native_value(d).unwrap_or(0.0)
                    },
                    0.0,
                    1.0,
                    steps,
                ))
            }
        }
    }

    /// Discount factor at `date`.
    fn discount(&self, date: Date) -> PricingResult<DiscountFactor> {
        self.check_range(date)?;
        match self.native() {
            NativeQuantity::Discount => self.native_value(date),
            _ => {
                let r = self.zero_yield(date)?;
                Ok((-r * self.time_from_reference(date)).exp())
            }
        }
    }

    /// Instantaneous forward rate at `date`, by daily finite difference
    /// for curves that do not provide it natively.
    fn forward(&self, date: Date) -> PricingResult<Rate> {
        self.check_range(date)?;
        match self.native() {
            NativeQuantity::Forward => self.native_value(date),
            NativeQuantity::ZeroYield => {
                // f(d) = r(d) + t · dr/dt, one-day difference; backward at
                // the far boundary.
                let (d0, d1) = if date < self.max_date() {
                    (date, date + 1)
                } else {
                    (date - 1, date)
                };
                let r0 = self.native_value(d0)?;
                let r1 = self.native_value(d1)?;
                let days = (date - self.reference_date()) as Real;
                Ok(self.native_value(date)? + days * (r1 - r0))
            }
            NativeQuantity::Discount => {
                let (d0, d1) = if date < self.max_date() {
                    (date, date + 1)
                } else {
                    (date - 1, date)
                };
                let df0 = self.native_value(d0)?;
                let df1 = self.native_value(d1)?;
                Ok((df0 / df1).ln() * 365.0)
            }
        }
    }
}
