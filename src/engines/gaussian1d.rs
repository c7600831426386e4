use crate::common::{Rate, Real, Time};
use crate::error::PricingResult;
use crate::instruments::{CapFloor, CapFloorKind, SwapKind, Swaption};
use crate::math::integration::GaussHermite;
use crate::models::gaussian1d::Gaussian1dModel;
use crate::require;
use std::rc::Rc;

/// NPV of a European swaption under a Gaussian 1-D model, by
/// Gauss-Hermite integration of the deflated exercise value over the
/// state at expiry.
pub fn swaption_npv(
    model: &dyn Gaussian1dModel,
    expiry: Time,
    payment_times: &[Time],
    accruals: &[Real],
    strike: Rate,
    kind: SwapKind,
    integration_points: usize,
) -> PricingResult<Real> {
    require!(expiry > 0.0, "swaption already expired");
    let gh = GaussHermite::new(integration_points)?;
    let sd = model.state_stddev(expiry);
    let n0 = model.numeraire(0.0, 0.0)?;
    let omega = match kind {
        SwapKind::Payer => 1.0,
        SwapKind::Receiver => -1.0,
    };

    let mut error: Option<crate::error::PricingError> = None;
    let expectation = gh.gaussian_expectation(|z| {
        if error.is_some() {
            return 0.0;
        }
        let y = sd * z;
        let deflated = (|| -> PricingResult<Real> {
            let annuity = model.swap_annuity(expiry, payment_times, accruals, y)?;
            let swap_rate = model.swap_rate(expiry, payment_times, accruals, y)?;
            let exercise = (omega * (swap_rate - strike)).max(0.0) * annuity;
            Ok(exercise / model.numeraire(expiry, y)?)
        })();
        match deflated {
            Ok(v) => v,
            Err(e) => {
                error = Some(e);
                0.0
            }
        }
    });
    if let Some(e) = error {
        return Err(e);
    }
    Ok(n0 * expectation)
}

/// NPV of a cap/floor strip under a Gaussian 1-D model.
pub fn capfloor_npv(
    model: &dyn Gaussian1dModel,
    fixing_times: &[Time],
    payment_times: &[Time],
    accruals: &[Real],
    strike: Rate,
    kind: CapFloorKind,
    integration_points: usize,
) -> PricingResult<Real> {
    require!(
        fixing_times.len() == payment_times.len() && fixing_times.len() == accruals.len(),
        "period description mismatch"
    );
    let gh = GaussHermite::new(integration_points)?;
    let n0 = model.numeraire(0.0, 0.0)?;
    let omega = match kind {
        CapFloorKind::Cap => 1.0,
        CapFloorKind::Floor => -1.0,
    };

    let mut npv = 0.0;
    for i in 0..fixing_times.len() {
        let fixing = fixing_times[i];
        if fixing <= 0.0 {
            continue;
        }
        let tau = accruals[i];
        let payment = payment_times[i];
        let sd = model.state_stddev(fixing);

        let mut error: Option<crate::error::PricingError> = None;
        let expectation = gh.gaussian_expectation(|z| {
            if error.is_some() {
                return 0.0;
            }
            let y = sd * z;
            let deflated = (|| -> PricingResult<Real> {
                let bond = model.zerobond(fixing, payment, y)?;
                let forward = model.forward_rate(fixing, payment, tau, y)?;
                let payoff = tau * (omega * (forward - strike)).max(0.0) * bond;
                Ok(payoff / model.numeraire(fixing, y)?)
            })();
            match deflated {
                Ok(v) => v,
                Err(e) => {
                    error = Some(e);
                    0.0
                }
            }
        });
        if let Some(e) = error {
            return Err(e);
        }
        npv += n0 * expectation;
    }
    Ok(npv)
}

/// Swaption engine bound to a model; converts the instrument's dates to
/// model times through the model's own curve.
pub struct Gaussian1dSwaptionEngine<M: Gaussian1dModel> {
    model: Rc<M>,
    pub integration_points: usize,
}

impl<M: Gaussian1dModel> Gaussian1dSwaptionEngine<M> {
    pub fn new(model: Rc<M>) -> Self {
        Self {
            model,
            integration_points: 64,
        }
    }

    pub fn npv(&self, swaption: &Swaption) -> PricingResult<Real> {
        let curve = self.model.termstructure();
        let expiry = curve.time_from_reference(swaption.expiry);
        let payment_times: Vec<Time> = swaption
            .payment_dates
            .iter()
            .map(|&d| curve.time_from_reference(d))
            .collect();
        swaption_npv(
            &*self.model,
            expiry,
            &payment_times,
            &swaption.accruals,
            swaption.strike,
            swaption.kind,
            self.integration_points,
        )
    }
}

/// Cap/floor engine bound to a model.
pub struct Gaussian1dCapFloorEngine<M: Gaussian1dModel> {
    model: Rc<M>,
    pub integration_points: usize,
}

impl<M: Gaussian1dModel> Gaussian1dCapFloorEngine<M> {
    pub fn new(model: Rc<M>) -> Self {
        Self {
            model,
            integration_points: 64,
        }
    }

    pub fn npv(&self, capfloor: &CapFloor) -> PricingResult<Real> {
        let curve = self.model.termstructure();
        let fixings: Vec<Time> = capfloor
            .fixing_dates
            .iter()
            .map(|&d| curve.time_from_reference(d))
            .collect();
        let payments: Vec<Time> = capfloor
            .payment_dates
            .iter()
            .map(|&d| curve.time_from_reference(d))
            .collect();
        capfloor_npv(
            &*self.model,
            &fixings,
            &payments,
            &capfloor.accruals,
            capfloor.strike,
            capfloor.kind,
            self.integration_points,
        )
    }
}
