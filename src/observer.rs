//! Subject/observer notification graph.
//!
//! Market data and derived structures form a DAG: quotes notify curves,
//! curves notify instruments. Subjects hold weak back-references, so an
//! observer that is simply dropped deregisters itself for free and a
//! pending notification to it becomes a no-op.

use crate::common::Real;
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Receives `update()` when an observed subject changes.
pub trait Observer {
    fn update(&self);
}

/// A subject in the notification graph.
///
/// Registration is idempotent: registering the same observer twice is a
/// no-op. Deregistration of an unknown (or already dead) observer is a
/// no-op as well. Observers that register during a notification are only
/// notified on the next cycle.
#[derive(Default)]
pub struct Observable {
    observers: RefCell<SmallVec<[Weak<dyn Observer>; 4]>>,
}

impl Observable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: &Rc<dyn Observer>) {
        let mut observers = self.observers.borrow_mut();
        let already_there = observers
            .iter()
            .any(|w| w.upgrade().is_some_and(|o| Rc::ptr_eq(&o, observer)));
        if !already_there {
            observers.push(Rc::downgrade(observer));
        }
    }

    pub fn unregister(&self, observer: &Rc<dyn Observer>) {
        self.observers
            .borrow_mut()
            .retain(|w| w.upgrade().is_some_and(|o| !Rc::ptr_eq(&o, observer)));
    }

    pub fn unregister_all(&self) {
        self.observers.borrow_mut().clear();
    }

    /// Calls `update()` on every live observer.
    ///
    /// The registry is snapshotted first so observers may (de)register
    /// other observers re-entrantly; such changes take effect on the next
    /// notification. Dead entries are pruned on the way.
    pub fn notify_observers(&self) {
        let snapshot: Vec<Weak<dyn Observer>> = {
            let mut observers = self.observers.borrow_mut();
            observers.retain(|w| w.strong_count() > 0);
            observers.iter().cloned().collect()
        };
        for weak in snapshot {
            if let Some(observer) = weak.upgrade() {
                observer.update();
            }
        }
    }

    /// Number of live registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }
}

impl std::fmt::Debug for Observable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable")
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// An observable mutable scalar market datum.
#[derive(Debug, Default)]
pub struct SimpleQuote {
    value: Cell<Real>,
    observable: Observable,
}

impl SimpleQuote {
    pub fn new(value: Real) -> Self {
        Self {
            value: Cell::new(value),
            observable: Observable::new(),
        }
    }

    pub fn value(&self) -> Real {
        self.value.get()
    }

    /// Sets a new value and notifies on change.
    pub fn set_value(&self, value: Real) {
        if value != self.value.get() {
            self.value.set(value);
            self.observable.notify_observers();
        }
    }

    pub fn observable(&self) -> &Observable {
        &self.observable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        hits: Cell<usize>,
    }

    impl Observer for Counter {
        fn update(&self) {
            self.hits.set(self.hits.get() + 1);
        }
    }

    fn counter() -> Rc<Counter> {
        Rc::new(Counter { hits: Cell::new(0) })
    }

    #[test]
    fn registration_is_idempotent() {
        let subject = Observable::new();
        let obs = counter();
        let dynamic: Rc<dyn Observer> = obs.clone();
        subject.register(&dynamic);
        subject.register(&dynamic);
        subject.notify_observers();
        assert_eq!(obs.hits.get(), 1);
    }

    #[test]
    fn dropped_observers_are_skipped() {
        let subject = Observable::new();
        let obs = counter();
        let keep = counter();
        subject.register(&(obs.clone() as Rc<dyn Observer>));
        subject.register(&(keep.clone() as Rc<dyn Observer>));
        drop(obs);
        subject.notify_observers();
        assert_eq!(keep.hits.get(), 1);
        assert_eq!(subject.observer_count(), 1);
    }

    #[test]
    fn unregistering_twice_is_harmless() {
        let subject = Observable::new();
        let obs = counter();
        let dynamic: Rc<dyn Observer> = obs.clone();
        subject.register(&dynamic);
        subject.unregister(&dynamic);
        subject.unregister(&dynamic);
        subject.notify_observers();
        assert_eq!(obs.hits.get(), 0);
    }

    #[test]
    fn quote_notifies_only_on_change() {
        let quote = Rc::new(SimpleQuote::new(100.0));
        let obs = counter();
        quote.observable().register(&(obs.clone() as Rc<dyn Observer>));
        quote.set_value(100.0);
        assert_eq!(obs.hits.get(), 0);
        quote.set_value(101.0);
        assert_eq!(obs.hits.get(), 1);
    }
}
