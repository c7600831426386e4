//! Process-global pricing settings.
//!
//! The evaluation date is mutable thread-local state; every test that sets
//! it must restore it, which [`EvaluationDateGuard`] does on drop.

use crate::{common::Null, time::Date};
use std::cell::Cell;

thread_local! {
    static EVALUATION_DATE: Cell<Date> = const { Cell::new(Date::NULL) };
}

pub struct Settings;

impl Settings {
    /// The date all pricing is performed at. A null stored value means
    /// "today".
    pub fn evaluation_date() -> Date {
        let stored = EVALUATION_DATE.with(|d| d.get());
        if stored.is_null() {
            Date::from_naive(chrono::Utc::now().date_naive())
                .unwrap_or_else(|_| Date::min_date())
        } else {
            stored
        }
    }

    /// Sets the evaluation date. Passing a null date reverts to "today".
    pub fn set_evaluation_date(date: Date) {
        EVALUATION_DATE.with(|d| d.set(date));
    }

    pub fn clear_evaluation_date() {
        Self::set_evaluation_date(Date::null());
    }
}

/// Saves the evaluation date on construction and restores it on drop.
pub struct EvaluationDateGuard {
    saved: Date,
}

impl EvaluationDateGuard {
    pub fn set(date: Date) -> Self {
        let saved = EVALUATION_DATE.with(|d| d.get());
        Settings::set_evaluation_date(date);
        Self { saved }
    }
}

impl Drop for EvaluationDateGuard {
    fn drop(&mut self) {
        Settings::set_evaluation_date(self.saved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_prior_date() {
        let pinned = Date::from_dmy(26, 4, 2005).unwrap();
        {
            let _guard = EvaluationDateGuard::set(pinned);
            assert_eq!(Settings::evaluation_date(), pinned);
        }
        assert!(Settings::evaluation_date() >= Date::min_date());
        assert_ne!(Settings::evaluation_date(), pinned);
    }
}
