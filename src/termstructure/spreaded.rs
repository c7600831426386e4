use super::{NativeQuantity, TermStructure};
use crate::common::{Real, Rate};
use crate::handle::Handle;
use crate::observer::{Observable, Observer, SimpleQuote};
use crate::time::{Date, DayCount};
use crate::error::PricingResult;
use std::cell::RefCell;
use std::rc::Rc;

enum SpreadSource {
    Fixed(Rate),
    Quoted(Handle<SimpleQuote>),
}

/// Base curve plus a parallel zero-yield spread.
pub struct SpreadedTermStructure {
    base: Handle<dyn TermStructure>,
    spread: SpreadSource,
    observable: Observable,
    _relays: RefCell<Vec<Rc<dyn Observer>>>,
}

struct Relay {
    target: std::rc::Weak<SpreadedTermStructure>,
}

impl Observer for Relay {
    fn update(&self) {
        if let Some(structure) = self.target.upgrade() {
            structure.observable.notify_observers();
        }
    }
}

impl SpreadedTermStructure {
    pub fn new(base: Handle<dyn TermStructure>, spread: Rate) -> Handle<Self> {
        Self::build(base, SpreadSource::Fixed(spread))
    }

    /// Spread linked to a quote; both base-curve and spread updates are
    /// re-forwarded.
    pub fn linked(base: Handle<dyn TermStructure>, spread: Handle<SimpleQuote>) -> Handle<Self> {
        Self::build(base, SpreadSource::Quoted(spread))
    }

    fn build(base: Handle<dyn TermStructure>, spread: SpreadSource) -> Handle<Self> {
        let structure = Handle::new(Self {
            base: base.clone(),
            spread,
            observable: Observable::new(),
            _relays: RefCell::new(Vec::new()),
        });
        let relay: Rc<dyn Observer> = Rc::new(Relay {
            target: Rc::downgrade(&structure.rc()),
        });
        base.observable().register(&relay);
        structure._relays.borrow_mut().push(relay);
        if let SpreadSource::Quoted(q) = &structure.spread {
            let relay: Rc<dyn Observer> = Rc::new(Relay {
                target: Rc::downgrade(&structure.rc()),
            });
            q.observable().register(&relay);
            structure._relays.borrow_mut().push(relay);
        }
        structure
    }

    pub fn spread(&self) -> Rate {
        match &self.spread {
            SpreadSource::Fixed(s) => *s,
            SpreadSource::Quoted(q) => q.value(),
        }
    }
}

impl TermStructure for SpreadedTermStructure {
    fn observable(&self) -> &Observable {
        &self.observable
    }

    fn reference_date(&self) -> Date {
        self.base.reference_date()
    }

    fn max_date(&self) -> Date {
        self.base.max_date()
    }

    fn day_count(&self) -> DayCount {
        self.base.day_count()
    }

    fn native(&self) -> NativeQuantity {
        NativeQuantity::ZeroYield
    }

    fn native_value(&self, date: Date) -> PricingResult<Real> {
        Ok(self.base.zero_yield(date)? + self.spread())
    }
}
