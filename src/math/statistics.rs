//! Weighted running statistics.
//!
//! Accumulates raw moments so that mean, variance, skewness and kurtosis
//! come out in one pass; the Monte-Carlo engines use the error estimate
//! as their stopping signal.

use crate::{error::PricingResult, require};

#[derive(Debug, Clone, Default)]
pub struct Statistics {
    samples: usize,
    sum_weights: f64,
    sum: f64,
    sum2: f64,
    sum3: f64,
    sum4: f64,
    min: f64,
    max: f64,
    // downside accumulators (values below zero)
    downside_weights: f64,
    downside_sum2: f64,
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            ..Self::default()
        }
    }

    pub fn add(&mut self, value: f64) {
        self.add_weighted(value, 1.0);
    }

    pub fn add_weighted(&mut self, value: f64, weight: f64) {
        debug_assert!(weight >= 0.0, "negative weight");
        self.samples += 1;
        self.sum_weights += weight;
        let wv = weight * value;
        self.sum += wv;
        self.sum2 += wv * value;
        self.sum3 += wv * value * value;
        self.sum4 += wv * value * value * value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        if value < 0.0 {
            self.downside_weights += weight;
            self.downside_sum2 += weight * value * value;
        }
    }

    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        for v in values {
            self.add(v);
        }
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn weight_sum(&self) -> f64 {
        self.sum_weights
    }

    pub fn mean(&self) -> PricingResult<f64> {
        require!(self.sum_weights > 0.0, "empty statistics: no weight collected");
        Ok(self.sum / self.sum_weights)
    }

    /// Unbiased weighted variance.
    pub fn variance(&self) -> PricingResult<f64> {
        require!(
            self.samples > 1,
            "variance needs at least two samples, got {}",
            self.samples
        );
        let n = self.samples as f64;
        let mean = self.mean()?;
        let raw = self.sum2 / self.sum_weights - mean * mean;
        Ok((raw * n / (n - 1.0)).max(0.0))
    }

    pub fn std_deviation(&self) -> PricingResult<f64> {
        Ok(self.variance()?.sqrt())
    }

    /// Statistical error on the mean estimate.
    pub fn error_estimate(&self) -> PricingResult<f64> {
        Ok((self.variance()? / self.samples as f64).sqrt())
    }

    pub fn skewness(&self) -> PricingResult<f64> {
        require!(
            self.samples > 2,
            "skewness needs at least three samples, got {}",
            self.samples
        );
        let n = self.samples as f64;
        let mean = self.mean()?;
        let var = self.variance()?;
        if var == 0.0 {
            return Ok(0.0);
        }
        let third =
            self.sum3 / self.sum_weights - 3.0 * mean * self.sum2 / self.sum_weights
                + 2.0 * mean * mean * mean;
        Ok(third * n * n / ((n - 1.0) * (n - 2.0)) / var.powf(1.5))
    }

    /// Excess kurtosis.
    pub fn kurtosis(&self) -> PricingResult<f64> {
        require!(
            self.samples > 3,
            "kurtosis needs at least four samples, got {}",
            self.samples
        );
        let n = self.samples as f64;
        let mean = self.mean()?;
        let var = self.variance()?;
        if var == 0.0 {
            return Ok(0.0);
        }
        let m2 = self.sum2 / self.sum_weights;
        let m3 = self.sum3 / self.sum_weights;
        let m4 = self.sum4 / self.sum_weights;
        let fourth = m4 - 4.0 * mean * m3 + 6.0 * mean * mean * m2 - 3.0 * mean.powi(4);
        let c1 = n * n * (n + 1.0) / ((n - 1.0) * (n - 2.0) * (n - 3.0));
        let c2 = 3.0 * (n - 1.0) * (n - 1.0) / ((n - 2.0) * (n - 3.0));
        Ok(c1 * fourth / (var * var) - c2)
    }

    pub fn min(&self) -> PricingResult<f64> {
        require!(self.samples > 0, "empty statistics");
        Ok(self.min)
    }

    pub fn max(&self) -> PricingResult<f64> {
        require!(self.samples > 0, "empty statistics");
        Ok(self.max)
    }

    /// Second moment of the negative outcomes, a crude downside-risk
    /// measure.
    pub fn downside_variance(&self) -> PricingResult<f64> {
        require!(self.samples > 1, "downside variance needs samples");
        if self.downside_weights == 0.0 {
            return Ok(0.0);
        }
        Ok(self.downside_sum2 / self.sum_weights)
    }
}
