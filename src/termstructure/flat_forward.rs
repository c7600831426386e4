use super::{NativeQuantity, TermStructure};
use crate::common::{Rate, Real};
use crate::handle::Handle;
use crate::observer::{Observable, Observer, SimpleQuote};
use crate::time::{Date, DayCount};
use crate::error::PricingResult;
use std::cell::RefCell;
use std::rc::Rc;

enum RateSource {
    Fixed(Rate),
    Quoted(Handle<SimpleQuote>),
}

/// Flat continuously compounded curve; the simplest usable term
/// structure and the workhorse of test setups.
pub struct FlatForward {
    reference_date: Date,
    source: RateSource,
    day_count: DayCount,
    observable: Observable,
    _relay: RefCell<Option<Rc<dyn Observer>>>,
}

struct QuoteRelay {
    target: std::rc::Weak<FlatForward>,
}

impl Observer for QuoteRelay {
    fn update(&self) {
        if let Some(curve) = self.target.upgrade() {
            curve.observable.notify_observers();
        }
    }
}

impl FlatForward {
    pub fn new(reference_date: Date, rate: Rate, day_count: DayCount) -> Self {
        Self {
            reference_date,
            source: RateSource::Fixed(rate),
            day_count,
            observable: Observable::new(),
            _relay: RefCell::new(None),
        }
    }

    /// A flat curve referenced at the process-global evaluation date.
    pub fn today(rate: Rate, day_count: DayCount) -> Self {
        Self::new(crate::settings::Settings::evaluation_date(), rate, day_count)
    }

    /// A flat curve linked to a quote: quote updates propagate to every
    /// observer of the curve.
    pub fn linked(
        reference_date: Date,
        quote: Handle<SimpleQuote>,
        day_count: DayCount,
    ) -> Handle<Self> {
        let curve = Handle::new(Self {
            reference_date,
            source: RateSource::Quoted(quote.clone()),
            day_count,
            observable: Observable::new(),
            _relay: RefCell::new(None),
        });
        let relay: Rc<dyn Observer> = Rc::new(QuoteRelay {
            target: Rc::downgrade(&curve.rc()),
        });
        quote.observable().register(&relay);
        *curve._relay.borrow_mut() = Some(relay);
        curve
    }

    pub fn rate(&self) -> Rate {
        match &self.source {
            RateSource::Fixed(r) => *r,
            RateSource::Quoted(q) => q.value(),
        }
    }
}

impl TermStructure for FlatForward {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn reference_date(&self) -> Date {
        self.reference_date
    }

    fn max_date(&self) -> Date {
        Date::max_date()
    }

    fn day_count(&self) -> DayCount {
        self.day_count
    }

    fn native(&self) -> NativeQuantity {
        NativeQuantity::ZeroYield
    }

    fn native_value(&self, _date: Date) -> PricingResult<Real> {
        Ok(self.rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::Observer;
    use std::cell::Cell;

    fn curve() -> FlatForward {
        FlatForward::new(
            Date::from_dmy(14, 11, 2012).unwrap(),
            0.03,
            DayCount::Actual365Fixed,
        )
    }

    #[test]
    fn discount_is_exponential_in_zero_yield() {
        let c = curve();
        let mut d = c.reference_date() + 30;
        while d <= c.reference_date() + 3650 {
            let t = c.time_from_reference(d);
            let expected = (-0.03 * t).exp();
            let df = c.discount(d).unwrap();
            assert!(
                (df - expected).abs() / expected < 1e-10,
                "adapter identity violated at {d}"
            );
            d += 97;
        }
    }

    #[test]
    fn flat_curve_has_flat_forwards() {
        let c = curve();
        let d = c.reference_date() + 365;
        assert!((c.forward(d).unwrap() - 0.03).abs() < 1e-12);
        assert!((c.zero_yield(d).unwrap() - 0.03).abs() < 1e-15);
    }

    #[test]
    fn out_of_range_queries_fail() {
        let c = curve();
        assert!(c.discount(c.reference_date() - 1).is_err());
    }

    #[test]
    fn today_constructor_follows_the_evaluation_date() {
        use crate::settings::EvaluationDateGuard;
        let pinned = Date::from_dmy(26, 4, 2005).unwrap();
        let _guard = EvaluationDateGuard::set(pinned);
        let c = FlatForward::today(0.02, DayCount::Actual365Fixed);
        assert_eq!(c.reference_date(), pinned);
    }

    #[test]
    fn quote_updates_reach_curve_observers() {
        struct Counter {
            hits: Cell<usize>,
        }
        impl Observer for Counter {
            fn update(&self) {
                self.hits.set(self.hits.get() + 1);
            }
        }

        let quote = Handle::new(SimpleQuote::new(0.03));
        let curve = FlatForward::linked(
            Date::from_dmy(14, 11, 2012).unwrap(),
            quote.clone(),
            DayCount::Actual365Fixed,
        );
        let counter = Rc::new(Counter { hits: Cell::new(0) });
        curve
            .observable()
            .register(&(counter.clone() as Rc<dyn Observer>));

        quote.set_value(0.04);
        assert_eq!(counter.hits.get(), 1);
        let d = curve.reference_date() + 365;
        assert!((curve.zero_yield(d).unwrap() - 0.04).abs() < 1e-15);
    }
}
