use super::{NativeQuantity, TermStructure};
use crate::common::Real;
use crate::handle::Handle;
use crate::observer::{Observable, Observer};
use crate::time::{Date, DayCount};
use crate::{error::PricingResult, require};
use std::cell::RefCell;
use std::rc::Rc;

/// The curve implied at a future date by an existing one: discount
/// factors are quotients off the base curve, and updates of the base are
/// re-forwarded to this structure's observers.
pub struct ImpliedTermStructure {
    base: Handle<dyn TermStructure>,
    implied_reference: Date,
    observable: Observable,
    _relay: RefCell<Option<Rc<dyn Observer>>>,
}

struct BaseRelay {
    target: std::rc::Weak<ImpliedTermStructure>,
}

impl Observer for BaseRelay {
    fn update(&self) {
        if let Some(structure) = self.target.upgrade() {
            structure.observable.notify_observers();
        }
    }
}

impl ImpliedTermStructure {
    pub fn new(
        base: Handle<dyn TermStructure>,
        implied_reference: Date,
    ) -> PricingResult<Handle<Self>> {
        require!(
            implied_reference >= base.reference_date() && implied_reference <= base.max_date(),
            "implied reference date {} outside the base curve range",
            implied_reference
        );
        let structure = Handle::new(Self {
            base: base.clone(),
            implied_reference,
            observable: Observable::new(),
            _relay: RefCell::new(None),
        });
        let relay: Rc<dyn Observer> = Rc::new(BaseRelay {
            target: Rc::downgrade(&structure.rc()),
        });
        base.observable().register(&relay);
        *structure._relay.borrow_mut() = Some(relay);
        Ok(structure)
    }
}

impl TermStructure for ImpliedTermStructure {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn reference_date(&self) -> Date {
        self.implied_reference
    }

    fn max_date(&self) -> Date {
        self.base.max_date()
    }

    fn day_count(&self) -> DayCount {
        self.base.day_count()
    }

    fn native(&self) -> NativeQuantity {
        NativeQuantity::Discount
    }

    fn native_value(&self, date: Date) -> PricingResult<Real> {
        Ok(self.base.discount(date)? / self.base.discount(self.implied_reference)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::termstructure::FlatForward;
    use std::cell::Cell;

    fn base() -> Handle<dyn TermStructure> {
        let c = Handle::new(FlatForward::new(
            Date::from_dmy(14, 11, 2012).unwrap(),
            0.03,
            DayCount::Actual365Fixed,
        ));
        Handle::from_rc(c.rc() as Rc<dyn TermStructure>)
    }

    #[test]
    fn discounts_are_quotients_of_the_base() {
        let b = base();
        let asof = b.reference_date().plus_years(1).unwrap();
        let implied = ImpliedTermStructure::new(b.clone(), asof).unwrap();
        let d = asof.plus_years(2).unwrap();
        let expected = b.discount(d).unwrap() / b.discount(asof).unwrap();
        assert!((implied.discount(d).unwrap() - expected).abs() < 1e-14);
        // A flat curve stays flat when shifted.
        assert!((implied.zero_yield(d).unwrap() - 0.03).abs() < 1e-9);
    }

    #[test]
    fn base_updates_are_reforwarded() {
        struct Counter {
            hits: Cell<usize>,
        }
        impl Observer for Counter {
            fn update(&self) {
                self.hits.set(self.hits.get() + 1);
            }
        }

        let b = base();
        let asof = b.reference_date().plus_years(1).unwrap();
        let implied = ImpliedTermStructure::new(b.clone(), asof).unwrap();
        let counter = Rc::new(Counter { hits: Cell::new(0) });
        implied
            .observable()
            .register(&(counter.clone() as Rc<dyn Observer>));
        b.observable().notify_observers();
        assert_eq!(counter.hits.get(), 1);
    }
}
