use crate::{
    common::Null,
    error::{IllegalArgument, PricingError, PricingResult},
};
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Units used to describe time periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    Days,
    Weeks,
    Months,
    Years,
}

/// A time period described by a length and a [`TimeUnit`], e.g. "6 months".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub length: i32,
    pub unit: TimeUnit,
}

impl Period {
    pub const fn new(length: i32, unit: TimeUnit) -> Self {
        Self { length, unit }
    }

    pub const fn days(n: i32) -> Self {
        Self::new(n, TimeUnit::Days)
    }

    pub const fn weeks(n: i32) -> Self {
        Self::new(n, TimeUnit::Weeks)
    }

    pub const fn months(n: i32) -> Self {
        Self::new(n, TimeUnit::Months)
    }

    pub const fn years(n: i32) -> Self {
        Self::new(n, TimeUnit::Years)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match self.unit {
            TimeUnit::Days => "D",
            TimeUnit::Weeks => "W",
            TimeUnit::Months => "M",
            TimeUnit::Years => "Y",
        };
        write!(f, "{}{}", self.length, unit)
    }
}

/// Concrete date class.
///
/// A `Date` is an integer serial number compatible with the one used by
/// spreadsheet applications (serial 367 is January 1st, 1901) with a limited
/// date algebra on top: shifting by days/weeks/months/years and taking
/// differences in days. Month and year arithmetic clamps to the end of the
/// target month, delegated to [`chrono`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Date {
    serial: i64,
}

/// Serial of January 1st, 1901.
const MIN_SERIAL: i64 = 367;
/// Serial of December 31st, 2199.
const MAX_SERIAL: i64 = 109_574;
/// The chrono date at serial 0.
const EPOCH: (i32, u32, u32) = (1899, 12, 30);

impl Date {
    /// The null sentinel, ordered before every valid date.
    pub(crate) const NULL: Date = Date { serial: 0 };

    /// Builds a date from its serial number.
    pub fn from_serial(serial: i64) -> PricingResult<Self> {
        if !(MIN_SERIAL..=MAX_SERIAL).contains(&serial) {
            return Err(PricingError::IllegalArgument(
                IllegalArgument::DateOutOfRange {
                    serial,
                    min: MIN_SERIAL,
                    max: MAX_SERIAL,
                },
            ));
        }
        Ok(Self { serial })
    }

    /// Builds a date from day, month and year.
    pub fn from_dmy(day: u32, month: u32, year: i32) -> PricingResult<Self> {
        let naive = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            PricingError::illegal_argument(format!("invalid calendar date {day}-{month}-{year}"))
        })?;
        Self::from_naive(naive)
    }

    pub fn from_naive(naive: NaiveDate) -> PricingResult<Self> {
        let epoch = NaiveDate::from_ymd_opt(EPOCH.0, EPOCH.1, EPOCH.2)
            .ok_or_else(|| PricingError::assertion("epoch date out of chrono range"))?;
        Self::from_serial((naive - epoch).num_days())
    }

    pub fn serial(&self) -> i64 {
        self.serial
    }

    pub fn to_naive(&self) -> NaiveDate {
        // Serial range is validated on construction, so the sum stays well
        // inside chrono's range.
        NaiveDate::from_ymd_opt(EPOCH.0, EPOCH.1, EPOCH.2).unwrap()
            + Days::new(self.serial as u64)
    }

    pub fn weekday(&self) -> chrono::Weekday {
        self.to_naive().weekday()
    }

    pub fn day_of_month(&self) -> u32 {
        self.to_naive().day()
    }

    /// One-based (January 1st = 1).
    pub fn day_of_year(&self) -> u32 {
        self.to_naive().ordinal()
    }

    pub fn month(&self) -> u32 {
        self.to_naive().month()
    }

    pub fn year(&self) -> i32 {
        self.to_naive().year()
    }

    pub fn is_leap(year: i32) -> bool {
        (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
    }

    /// Earliest representable date (January 1st, 1901).
    pub fn min_date() -> Self {
        Self { serial: MIN_SERIAL }
    }

    /// Latest representable date (December 31st, 2199).
    pub fn max_date() -> Self {
        Self { serial: MAX_SERIAL }
    }

    pub fn plus_days(&self, days: i64) -> PricingResult<Self> {
        Self::from_serial(self.serial + days)
    }

    pub fn plus_weeks(&self, weeks: i64) -> PricingResult<Self> {
        self.plus_days(7 * weeks)
    }

    pub fn plus_months(&self, months: i32) -> PricingResult<Self> {
        let naive = self.to_naive();
        let shifted = if months >= 0 {
            naive.checked_add_months(Months::new(months as u32))
        } else {
            naive.checked_sub_months(Months::new((-months) as u32))
        }
        .ok_or_else(|| PricingError::illegal_argument(format!("month shift {months} overflows")))?;
        Self::from_naive(shifted)
    }

    pub fn plus_years(&self, years: i32) -> PricingResult<Self> {
        self.plus_months(12 * years)
    }

    pub fn plus(&self, n: i32, unit: TimeUnit) -> PricingResult<Self> {
        match unit {
            TimeUnit::Days => self.plus_days(n as i64),
            TimeUnit::Weeks => self.plus_weeks(n as i64),
            TimeUnit::Months => self.plus_months(n),
            TimeUnit::Years => self.plus_years(n),
        }
    }

    pub fn plus_period(&self, period: Period) -> PricingResult<Self> {
        self.plus(period.length, period.unit)
    }
}

impl Null for Date {
    fn null() -> Self {
        Self::NULL
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "(null date)")
        } else {
            write!(f, "{}", self.to_naive())
        }
    }
}

// Day-shift algebra. Shifts that leave the allowed range saturate at the
// boundary dates; use `plus_days` for a checked version.

impl Add<i64> for Date {
    type Output = Date;

    fn add(self, days: i64) -> Date {
        Date {
            serial: (self.serial + days).clamp(MIN_SERIAL, MAX_SERIAL),
        }
    }
}

impl Sub<i64> for Date {
    type Output = Date;

    fn sub(self, days: i64) -> Date {
        self + (-days)
    }
}

impl AddAssign<i64> for Date {
    fn add_assign(&mut self, days: i64) {
        *self = *self + days;
    }
}

impl SubAssign<i64> for Date {
    fn sub_assign(&mut self, days: i64) {
        *self = *self - days;
    }
}

/// Difference in days between dates.
impl Sub<Date> for Date {
    type Output = i64;

    fn sub(self, other: Date) -> i64 {
        self.serial - other.serial
    }
}
