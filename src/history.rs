//! Container for historical data.
//!
//! A `History` stores one (possibly null) datum per calendar day between
//! its first and last date. Gaps in the input date set are filled with
//! nulls, which the valid-entry iterator skips.

use crate::{
    common::{Null, Real},
    error::{IllegalArgument, PricingError, PricingResult},
};
use crate::time::Date;

#[derive(Debug, Clone, PartialEq)]
pub struct History {
    first_date: Date,
    values: Vec<Real>,
}

impl History {
    /// Builds a history from a contiguous range of values covering every
    /// day from `first_date` to `last_date` included.
    pub fn from_range(first_date: Date, last_date: Date, values: Vec<Real>) -> PricingResult<Self> {
        if last_date < first_date {
            return Err(PricingError::IllegalArgument(
                IllegalArgument::InvalidHistoryRange(format!("{first_date} > {last_date}")),
            ));
        }
        let expected = (last_date - first_date + 1) as usize;
        if values.len() != expected {
            return Err(PricingError::IllegalArgument(
                IllegalArgument::DimensionMismatch {
                    expected,
                    actual: values.len(),
                },
            ));
        }
        Ok(Self { first_date, values })
    }

    /// Builds a history from sorted (date, value) pairs, null-filling any
    /// gap in the date set.
    ///
    /// Duplicate dates are allowed when they carry the same value; the
    /// duplicates are discarded. A duplicate date with a different value
    /// is an illegal argument.
    pub fn from_pairs(dates: &[Date], values: &[Real]) -> PricingResult<Self> {
        if dates.is_empty() {
            return Err(PricingError::IllegalArgument(
                IllegalArgument::InvalidHistoryRange("empty date set".into()),
            ));
        }
        if dates.len() != values.len() {
            return Err(PricingError::IllegalArgument(
                IllegalArgument::DimensionMismatch {
                    expected: dates.len(),
                    actual: values.len(),
                },
            ));
        }

        let first_date = dates[0];
        let last_date = dates[dates.len() - 1];
        let size = (last_date - first_date + 1) as usize;
        let mut filled = vec![Real::null(); size];
        let mut previous = None;
        for (&date, &value) in dates.iter().zip(values) {
            match previous {
                Some(p) if date < p => {
                    return Err(PricingError::IllegalArgument(
                        IllegalArgument::UnsortedDates(format!("{date} after {p}")),
                    ));
                }
                Some(p) if date == p => {
                    let idx = (date - first_date) as usize;
                    if filled[idx] != value {
                        return Err(PricingError::IllegalArgument(
                            IllegalArgument::InconsistentDuplicate(date.to_string()),
                        ));
                    }
                }
                _ => {
                    filled[(date - first_date) as usize] = value;
                }
            }
            previous = Some(date);
        }
        Ok(Self {
            first_date,
            values: filled,
        })
    }

    /// First date for which a datum exists.
    pub fn first_date(&self) -> Date {
        self.first_date
    }

    /// Last date for which a datum exists.
    pub fn last_date(&self) -> Date {
        self.first_date + (self.values.len() as i64 - 1)
    }

    /// Number of stored data including null ones.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The (possibly null) datum at the given date; null outside the range.
    pub fn value(&self, date: Date) -> Real {
        if date < self.first_date || date > self.last_date() {
            return Real::null();
        }
        self.values[(date - self.first_date) as usize]
    }

    /// Lazy sequence of all (date, value) entries, nulls included.
    pub fn entries(&self) -> impl Iterator<Item = (Date, Real)> + '_ {
        let first = self.first_date;
        self.values
            .iter()
            .enumerate()
            .map(move |(i, &v)| (first + i as i64, v))
    }

    /// Lazy sequence of the entries carrying actual data.
    pub fn valid_entries(&self) -> impl Iterator<Item = (Date, Real)> + '_ {
        self.entries().filter(|(_, v)| !v.is_null())
    }
}

impl std::ops::Index<Date> for History {
    type Output = Real;

    fn index(&self, date: Date) -> &Real {
        &self.values[(date - self.first_date) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32, m: u32, y: i32) -> Date {
        Date::from_dmy(d, m, y).unwrap()
    }

    #[test]
    fn gaps_are_null_filled() {
        let dates = [date(1, 1, 2005), date(3, 1, 2005)];
        let h = History::from_pairs(&dates, &[1.0, 2.0]).unwrap();
        assert_eq!(h.first_date(), date(1, 1, 2005));
        assert_eq!(h.last_date(), date(3, 1, 2005));
        assert_eq!(h.len(), 3);
        assert!(h[date(2, 1, 2005)].is_null());
        assert_eq!(h[date(3, 1, 2005)], 2.0);
    }

    #[test]
    fn valid_entries_skip_nulls() {
        let dates = [date(1, 1, 2005), date(4, 1, 2005)];
        let h = History::from_pairs(&dates, &[1.0, 4.0]).unwrap();
        let valid: Vec<_> = h.valid_entries().collect();
        assert_eq!(valid, vec![(date(1, 1, 2005), 1.0), (date(4, 1, 2005), 4.0)]);
        assert_eq!(h.entries().count(), 4);
    }

    #[test]
    fn consistent_duplicates_are_discarded() {
        let dates = [date(1, 1, 2005), date(1, 1, 2005), date(2, 1, 2005)];
        let h = History::from_pairs(&dates, &[1.0, 1.0, 2.0]).unwrap();
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn inconsistent_duplicates_are_rejected() {
        let dates = [date(1, 1, 2005), date(1, 1, 2005)];
        assert!(History::from_pairs(&dates, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn unsorted_dates_are_rejected() {
        let dates = [date(2, 1, 2005), date(1, 1, 2005)];
        assert!(History::from_pairs(&dates, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn round_trip_lookup() {
        let dates = [date(1, 3, 2005), date(2, 3, 2005), date(5, 3, 2005)];
        let values = [10.0, 11.0, 12.0];
        let h = History::from_pairs(&dates, &values).unwrap();
        for (d, v) in dates.iter().zip(values) {
            assert_eq!(h[*d], v);
        }
    }
}
