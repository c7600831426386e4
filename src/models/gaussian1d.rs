use crate::common::{Rate, Real, Time};
use crate::handle::Handle;
use crate::termstructure::TermStructure;
use crate::{error::PricingResult, require};

/// A model whose yield curve is a deterministic function of one Gaussian
/// Markov state: everything an engine needs is the numeraire and the zero
/// bonds as functions of (time, state).
pub trait Gaussian1dModel {
    fn termstructure(&self) -> Handle<dyn TermStructure>;

    /// Maturity of the numeraire asset.
    fn numeraire_time(&self) -> Time;

    /// Standard deviation of the raw state at `t`.
    fn state_stddev(&self, t: Time) -> Real;

    /// N(t, y); N(0, 0) deflates all model prices.
    fn numeraire(&self, t: Time, y: Real) -> PricingResult<Real>;

    /// P(t, maturity, y).
    fn zerobond(&self, t: Time, maturity: Time, y: Real) -> PricingResult<Real>;

    /// Simply compounded forward rate fixed at `fixing` for the period to
    /// `payment`.
    fn forward_rate(
        &self,
        fixing: Time,
        payment: Time,
        accrual: Real,
        y: Real,
    ) -> PricingResult<Rate> {
        require!(accrual > 0.0, "accrual must be positive");
        let df = self.zerobond(fixing, payment, y)?;
        Ok((1.0 / df - 1.0) / accrual)
    }

    /// Annuity Σ τⱼ·P(t, tⱼ, y) of a fixed leg.
    fn swap_annuity(
        &self,
        t: Time,
        payment_times: &[Time],
        accruals: &[Real],
        y: Real,
    ) -> PricingResult<Real> {
        require!(
            payment_times.len() == accruals.len(),
            "payment/accrual count mismatch"
        );
        let mut annuity = 0.0;
        for (&tp, &tau) in payment_times.iter().zip(accruals) {
            annuity += tau * self.zerobond(t, tp, y)?;
        }
        Ok(annuity)
    }

    /// Forward swap rate of a swap starting at `t`.
    fn swap_rate(
        &self,
        t: Time,
        payment_times: &[Time],
        accruals: &[Real],
        y: Real,
    ) -> PricingResult<Rate> {
        let terminal = *payment_times
            .last()
            .ok_or_else(|| crate::error::PricingError::illegal_argument("empty swap schedule"))?;
        let annuity = self.swap_annuity(t, payment_times, accruals, y)?;
        let float_leg = 1.0 - self.zerobond(t, terminal, y)?;
        Ok(float_leg / annuity)
    }
}
