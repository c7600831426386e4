use super::date::Date;
use crate::common::Time;
use serde::{Deserialize, Serialize};

/// Day-count conventions for converting date intervals into year fractions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayCount {
    /// **Actual/365 (Fixed).**
    /// Actual days difference divided by fixed 365.
    Actual365Fixed,

    /// **Actual/360 (money-market standard).**
    Actual360,

    /// **30/360 (US bond basis).**
    /// Assumes every month has 30 days and a year has 360 days, with the
    /// usual end-of-month adjustments.
    Thirty360,

    /// **Actual/Actual (ISDA).**
    /// Splits the interval at year boundaries and divides by the actual
    /// length of each year.
    ActualActualIsda,
}

impl DayCount {
    /// Number of days between `d1` and `d2` under this convention.
    pub fn day_count(&self, d1: Date, d2: Date) -> i64 {
        match self {
            DayCount::Actual365Fixed | DayCount::Actual360 | DayCount::ActualActualIsda => d2 - d1,
            DayCount::Thirty360 => {
                let dd1 = d1.day_of_month().min(30) as i64;
                let mut dd2 = d2.day_of_month() as i64;
                if dd2 == 31 && dd1 == 30 {
                    dd2 = 30;
                }
                360 * (d2.year() as i64 - d1.year() as i64)
                    + 30 * (d2.month() as i64 - d1.month() as i64)
                    + (dd2 - dd1)
            }
        }
    }

    /// Year fraction between `d1` and `d2`. Negative when `d2 < d1`.
    pub fn year_fraction(&self, d1: Date, d2: Date) -> Time {
        match self {
            DayCount::Actual365Fixed => (d2 - d1) as Time / 365.0,
            DayCount::Actual360 => (d2 - d1) as Time / 360.0,
            DayCount::Thirty360 => self.day_count(d1, d2) as Time / 360.0,
            DayCount::ActualActualIsda => {
                if d1 == d2 {
                    return 0.0;
                }
                if d1 > d2 {
                    return -self.year_fraction(d2, d1);
                }
                let (y1, y2) = (d1.year(), d2.year());
                if y1 == y2 {
                    let base = if Date::is_leap(y1) { 366.0 } else { 365.0 };
                    return (d2 - d1) as Time / base;
                }
                let base1 = if Date::is_leap(y1) { 366.0 } else { 365.0 };
                let base2 = if Date::is_leap(y2) { 366.0 } else { 365.0 };
                // Whole years in between plus the two stub periods.
                let start_of_next = Date::from_dmy(1, 1, y1 + 1).expect("valid year start");
                let start_of_last = Date::from_dmy(1, 1, y2).expect("valid year start");
                (y2 - y1 - 1) as Time
                    + (start_of_next - d1) as Time / base1
                    + (d2 - start_of_last) as Time / base2
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32, m: u32, y: i32) -> Date {
        Date::from_dmy(d, m, y).unwrap()
    }

    #[test]
    fn actual_365_fixed() {
        let t = DayCount::Actual365Fixed.year_fraction(date(1, 1, 2005), date(1, 1, 2006));
        assert!((t - 1.0).abs() < 1e-12);
    }

    #[test]
    fn thirty_360_flattens_months() {
        let dc = DayCount::Thirty360;
        assert_eq!(dc.day_count(date(31, 1, 2005), date(28, 2, 2005)), 28);
        assert_eq!(dc.day_count(date(30, 1, 2005), date(31, 3, 2005)), 60);
        let t = dc.year_fraction(date(15, 1, 2005), date(15, 1, 2006));
        assert!((t - 1.0).abs() < 1e-12);
    }

    #[test]
    fn act_act_isda_splits_at_year_end() {
        let dc = DayCount::ActualActualIsda;
        // 2003-11-01 to 2004-05-01, the classic ISDA example: 0.49772...
        let t = dc.year_fraction(date(1, 11, 2003), date(1, 5, 2004));
        assert!((t - (61.0 / 365.0 + 121.0 / 366.0)).abs() < 1e-12);
    }

    #[test]
    fn reversed_interval_is_negative() {
        let dc = DayCount::Actual360;
        let t = dc.year_fraction(date(1, 3, 2005), date(1, 1, 2005));
        assert!(t < 0.0);
    }
}
