use crate::common::Real;
use crate::error::{PricingError, PricingResult};
use crate::instrument::{Instrument, InstrumentCore, PriceMode};
use crate::math::black::OptionType;
use crate::time::Date;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseKind {
    European,
    American,
}

#[derive(Debug, Clone, Copy)]
pub struct VanillaPayoff {
    pub option_type: OptionType,
    pub strike: Real,
}

impl VanillaPayoff {
    pub fn new(option_type: OptionType, strike: Real) -> Self {
        Self {
            option_type,
            strike,
        }
    }

    pub fn value(&self, spot: Real) -> Real {
        match self.option_type {
            OptionType::Call => (spot - self.strike).max(0.0),
            OptionType::Put => (self.strike - spot).max(0.0),
        }
    }
}

/// Pricing backend for plain vanilla options; engines own their market
/// data through handles.
pub trait VanillaEngine {
    fn npv(
        &self,
        payoff: &VanillaPayoff,
        exercise: ExerciseKind,
        maturity: Date,
    ) -> PricingResult<Real>;
}

/// A plain vanilla equity option delegating valuation to a pluggable
/// engine.
pub struct VanillaOption {
    core: InstrumentCore,
    payoff: VanillaPayoff,
    exercise: ExerciseKind,
    maturity: Date,
    engine: RefCell<Option<Rc<dyn VanillaEngine>>>,
}

impl VanillaOption {
    pub fn new(
        isin: impl Into<String>,
        description: impl Into<String>,
        payoff: VanillaPayoff,
        exercise: ExerciseKind,
        maturity: Date,
    ) -> Self {
        Self {
            core: InstrumentCore::new(isin, description, PriceMode::OverTheCounter),
            payoff,
            exercise,
            maturity,
            engine: RefCell::new(None),
        }
    }

    pub fn payoff(&self) -> &VanillaPayoff {
        &self.payoff
    }

    pub fn exercise(&self) -> ExerciseKind {
        self.exercise
    }

    pub fn maturity(&self) -> Date {
        self.maturity
    }

    pub fn set_pricing_engine(&self, engine: Rc<dyn VanillaEngine>) {
        *self.engine.borrow_mut() = Some(engine);
    }
}

impl Instrument for VanillaOption {
    fn core(&self) -> &InstrumentCore {
        &self.core
    }

    fn use_term_structure(&self) -> bool {
        true
    }

    fn use_swaption_volatility(&self) -> bool {
        false
    }

    fn use_forward_volatility(&self) -> bool {
        false
    }

    fn perform_term_structure_calculations(&self) -> PricingResult<()> {
        if self.maturity <= self.core.settlement_date() {
            self.core.set_expired(true);
            return Ok(());
        }
        let engine = self
            .engine
            .borrow()
            .clone()
            .ok_or_else(|| PricingError::illegal_argument("no pricing engine set"))?;
        let npv = engine.npv(&self.payoff, self.exercise, self.maturity)?;
        self.core.set_npv(npv);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payoff_values() {
        let call = VanillaPayoff::new(OptionType::Call, 100.0);
        assert_eq!(call.value(110.0), 10.0);
        assert_eq!(call.value(90.0), 0.0);
        let put = VanillaPayoff::new(OptionType::Put, 100.0);
        assert_eq!(put.value(90.0), 10.0);
        assert_eq!(put.value(110.0), 0.0);
    }
}
