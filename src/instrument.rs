//! Instrument base contract: lazy recomputation driven by dirty flags
//! that market-data observers set.
//!
//! An instrument wires itself to up to three market structures (discount
//! curve, swaption volatility, forward volatility) through small observer
//! proxies. A query for the NPV triggers only the recalculations whose
//! inputs actually changed, in the fixed order term structure → swaption
//! vol → forward vol → final.

use crate::common::{Null, Real};
use crate::error::{IllegalArgument, PricingError, PricingResult};
use crate::handle::Handle;
use crate::observer::Observer;
use crate::termstructure::TermStructure;
use crate::time::Date;
use crate::volatility::{OptionletVolatilityStructure, SwaptionVolatilityStructure};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Observer proxy that marks one market-data slot dirty.
pub struct DirtyFlag(Cell<bool>);

impl DirtyFlag {
    fn new() -> Rc<Self> {
        Rc::new(Self(Cell::new(false)))
    }

    fn raise(&self) {
        self.0.set(true);
    }

    fn is_raised(&self) -> bool {
        self.0.get()
    }

    fn clear(&self) {
        self.0.set(false);
    }
}

impl Observer for DirtyFlag {
    fn update(&self) {
        self.raise();
    }
}

/// Whether an instrument's quoted price may be set from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceMode {
    /// Market-priced: `set_price` stores a quote, `price()` requires it.
    Priced,
    /// Over the counter: `set_price` is rejected and `price()` is the NPV.
    OverTheCounter,
}

/// Shared state of every instrument: identification, market-data slots,
/// dirty flags and cached results.
pub struct InstrumentCore {
    isin: String,
    description: String,
    price_mode: PriceMode,
    settlement_date: Cell<Date>,
    npv: Cell<Real>,
    expired: Cell<bool>,
    market_price: Cell<Real>,
    term_structure: RefCell<Option<Handle<dyn TermStructure>>>,
    swaption_vol: RefCell<Option<Rc<dyn SwaptionVolatilityStructure>>>,
    forward_vol: RefCell<Option<Rc<dyn OptionletVolatilityStructure>>>,
    term_structure_flag: Rc<DirtyFlag>,
    swaption_vol_flag: Rc<DirtyFlag>,
    forward_vol_flag: Rc<DirtyFlag>,
}

impl InstrumentCore {
    pub fn new(isin: impl Into<String>, description: impl Into<String>, mode: PriceMode) -> Self {
        Self {
            isin: isin.into(),
            description: description.into(),
            price_mode: mode,
            settlement_date: Cell::new(Date::null()),
            npv: Cell::new(0.0),
            expired: Cell::new(false),
            market_price: Cell::new(Real::null()),
            term_structure: RefCell::new(None),
            swaption_vol: RefCell::new(None),
            forward_vol: RefCell::new(None),
            term_structure_flag: DirtyFlag::new(),
            swaption_vol_flag: DirtyFlag::new(),
            forward_vol_flag: DirtyFlag::new(),
        }
    }

    pub fn isin(&self) -> &str {
        &self.isin
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn settlement_date(&self) -> Date {
        self.settlement_date.get()
    }

    pub fn term_structure(&self) -> Option<Handle<dyn TermStructure>> {
        self.term_structure.borrow().clone()
    }

    pub fn swaption_volatility(&self) -> Option<Rc<dyn SwaptionVolatilityStructure>> {
        self.swaption_vol.borrow().clone()
    }

    pub fn forward_volatility(&self) -> Option<Rc<dyn OptionletVolatilityStructure>> {
        self.forward_vol.borrow().clone()
    }

    /// Stores a freshly computed NPV; hooks call this.
    pub fn set_npv(&self, npv: Real) {
        self.npv.set(npv);
    }

    /// Marks the instrument expired; its NPV is then 0.
    pub fn set_expired(&self, expired: bool) {
        self.expired.set(expired);
    }
}

pub trait Instrument {
    fn core(&self) -> &InstrumentCore;

    /// Does this instrument price off a term structure?
    fn use_term_structure(&self) -> bool;

    fn use_swaption_volatility(&self) -> bool;

    fn use_forward_volatility(&self) -> bool;

    fn perform_term_structure_calculations(&self) -> PricingResult<()> {
        Ok(())
    }

    fn perform_swaption_vol_calculations(&self) -> PricingResult<()> {
        Ok(())
    }

    fn perform_forward_vol_calculations(&self) -> PricingResult<()> {
        Ok(())
    }

    fn needs_final_calculations(&self) -> bool {
        false
    }

    fn perform_final_calculations(&self) -> PricingResult<()> {
        Ok(())
    }

    /// Wires the discount curve in, replacing a previous one, and flags
    /// the pending recalculation.
    fn set_term_structure(&self, structure: Handle<dyn TermStructure>) {
        if !self.use_term_structure() {
            return;
        }
        let core = self.core();
        let flag: Rc<dyn Observer> = core.term_structure_flag.clone();
        if let Some(old) = core.term_structure.borrow().as_ref() {
            old.observable().unregister(&flag);
        }
        structure.observable().register(&flag);
        core.settlement_date.set(structure.reference_date());
        *core.term_structure.borrow_mut() = Some(structure);
        core.term_structure_flag.raise();
    }

    fn set_swaption_volatility(&self, vol: Rc<dyn SwaptionVolatilityStructure>) {
        if !self.use_swaption_volatility() {
            return;
        }
        let core = self.core();
        let flag: Rc<dyn Observer> = core.swaption_vol_flag.clone();
        if let Some(old) = core.swaption_vol.borrow().as_ref() {
            old.observable().unregister(&flag);
        }
        vol.observable().register(&flag);
        *core.swaption_vol.borrow_mut() = Some(vol);
        core.swaption_vol_flag.raise();
    }

    fn set_forward_volatility(&self, vol: Rc<dyn OptionletVolatilityStructure>) {
        if !self.use_forward_volatility() {
            return;
        }
        let core = self.core();
        let flag: Rc<dyn Observer> = core.forward_vol_flag.clone();
        if let Some(old) = core.forward_vol.borrow().as_ref() {
            old.observable().unregister(&flag);
        }
        vol.observable().register(&flag);
        *core.forward_vol.borrow_mut() = Some(vol);
        core.forward_vol_flag.raise();
    }

    /// Runs the pending recalculations and clears the flags.
    fn calculate(&self) -> PricingResult<()> {
        let core = self.core();
        if core.expired.get() {
            core.npv.set(0.0);
            return Ok(());
        }
        if core.term_structure_flag.is_raised() {
            self.perform_term_structure_calculations()?;
        }
        if core.swaption_vol_flag.is_raised() {
            self.perform_swaption_vol_calculations()?;
        }
        if core.forward_vol_flag.is_raised() {
            self.perform_forward_vol_calculations()?;
        }
        if self.needs_final_calculations() {
            self.perform_final_calculations()?;
        }
        core.term_structure_flag.clear();
        core.swaption_vol_flag.clear();
        core.forward_vol_flag.clear();
        Ok(())
    }

    /// Net present value; expired instruments are worth 0, and failures
    /// propagate instead of returning a silent NaN.
    fn npv(&self) -> PricingResult<Real> {
        self.calculate()?;
        if self.core().expired.get() {
            return Ok(0.0);
        }
        Ok(self.core().npv.get())
    }

    fn set_price(&self, price: Real) -> PricingResult<()> {
        match self.core().price_mode {
            PriceMode::Priced => {
                self.core().market_price.set(price);
                Ok(())
            }
            PriceMode::OverTheCounter => Err(PricingError::IllegalArgument(
                IllegalArgument::PriceNotSettable,
            )),
        }
    }

    fn price(&self) -> PricingResult<Real> {
        match self.core().price_mode {
            PriceMode::Priced => {
                let p = self.core().market_price.get();
                if p.is_null() {
                    return Err(PricingError::IllegalArgument(IllegalArgument::PriceNotSet));
                }
                Ok(p)
            }
            PriceMode::OverTheCounter => self.npv(),
        }
    }
}

/// Instrument handles compare by ISIN.
pub fn same_instrument(a: &Handle<dyn Instrument>, b: &Handle<dyn Instrument>) -> bool {
    a.core().isin() == b.core().isin()
}
