use crate::{error::PricingResult, require};

/// How to continue an interpolation outside its abscissa range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extrapolation {
    /// Hold the boundary ordinate.
    Flat,
    /// Continue the boundary segment's slope.
    Linear,
}

/// Piecewise-linear interpolation over sorted abscissae.
#[derive(Debug, Clone)]
pub struct LinearInterpolation {
    x: Vec<f64>,
    y: Vec<f64>,
    extrapolation: Extrapolation,
}

impl LinearInterpolation {
    pub fn new(x: Vec<f64>, y: Vec<f64>, extrapolation: Extrapolation) -> PricingResult<Self> {
        require!(x.len() >= 2, "interpolation needs at least two points");
        require!(
            x.len() == y.len(),
            "abscissa/ordinate length mismatch: {} vs {}",
            x.len(),
            y.len()
        );
        require!(
            x.windows(2).all(|w| w[0] < w[1]),
            "interpolation abscissae must be strictly increasing"
        );
        Ok(Self { x, y, extrapolation })
    }

    pub fn x_values(&self) -> &[f64] {
        &self.x
    }

    pub fn y_values(&self) -> &[f64] {
        &self.y
    }

    /// Index of the segment containing `x` (clamped to the boundary
    /// segments).
    fn locate(&self, x: f64) -> usize {
        let n = self.x.len();
        self.x[..n - 1].partition_point(|&xi| xi <= x).max(1) - 1
    }

    pub fn value(&self, x: f64) -> f64 {
        let n = self.x.len();
        if x <= self.x[0] {
            return match self.extrapolation {
                Extrapolation::Flat => self.y[0],
                Extrapolation::Linear => self.segment_value(0, x),
            };
        }
        if x >= self.x[n - 1] {
            return match self.extrapolation {
                Extrapolation::Flat => self.y[n - 1],
                Extrapolation::Linear => self.segment_value(n - 2, x),
            };
        }
        self.segment_value(self.locate(x), x)
    }

    /// Slope of the segment containing `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        let n = self.x.len();
        let i = if x <= self.x[0] {
            0
        } else if x >= self.x[n - 1] {
            n - 2
        } else {
            self.locate(x)
        };
        match (self.extrapolation, x <= self.x[0] || x >= self.x[n - 1]) {
            (Extrapolation::Flat, true) => 0.0,
            _ => (self.y[i + 1] - self.y[i]) / (self.x[i + 1] - self.x[i]),
        }
    }

    fn segment_value(&self, i: usize, x: f64) -> f64 {
        let w = (x - self.x[i]) / (self.x[i + 1] - self.x[i]);
        self.y[i] + w * (self.y[i + 1] - self.y[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp(extrapolation: Extrapolation) -> LinearInterpolation {
        LinearInterpolation::new(
            vec![0.0, 1.0, 2.0],
            vec![10.0, 20.0, 40.0],
            extrapolation,
        )
        .unwrap()
    }

    #[test]
    fn interior_values() {
        let f = interp(Extrapolation::Flat);
        assert_eq!(f.value(0.5), 15.0);
        assert_eq!(f.value(1.5), 30.0);
        assert_eq!(f.value(1.0), 20.0);
    }

    #[test]
    fn flat_and_linear_extrapolation() {
        let flat = interp(Extrapolation::Flat);
        assert_eq!(flat.value(-1.0), 10.0);
        assert_eq!(flat.value(3.0), 40.0);
        let linear = interp(Extrapolation::Linear);
        assert_eq!(linear.value(-1.0), 0.0);
        assert_eq!(linear.value(3.0), 60.0);
    }

    #[test]
    fn unsorted_input_is_rejected() {
        assert!(LinearInterpolation::new(
            vec![0.0, 0.0, 1.0],
            vec![1.0, 2.0, 3.0],
            Extrapolation::Flat
        )
        .is_err());
    }
}
