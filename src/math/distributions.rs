//! Normal distribution maps.
//!
//! The inverse cumulative maps are the core uniform-to-Gaussian bridges
//! used by the sequence generators; accuracy of the Acklam map with Halley
//! refinement is below 1e-9 over [1e-7, 1 - 1e-7].

use statrs::function::erf::erfc;
use std::f64::consts::{PI, SQRT_2};

const SQRT_2PI: f64 = 2.506628274631000502;

/// Standard normal density.
pub fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / SQRT_2PI
}

/// Standard normal cumulative distribution function.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Inverse of the standard normal CDF, Acklam's rational approximation
/// with one Halley refinement step.
///
/// Returns negative/positive infinity at 0 and 1.
pub fn inverse_normal_cdf(u: f64) -> f64 {
    if u <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if u >= 1.0 {
        return f64::INFINITY;
    }

    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const U_LOW: f64 = 0.02425;

    let x = if u < U_LOW {
        let q = (-2.0 * u.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if u <= 1.0 - U_LOW {
        let q = u - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - u).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    // Halley refinement.
    let e = normal_cdf(x) - u;
    let w = e * SQRT_2PI * (0.5 * x * x).exp();
    x - w / (1.0 + 0.5 * x * w)
}

/// Beasley-Springer/Moro inverse cumulative normal.
///
/// Less accurate than [`inverse_normal_cdf`] but reproduces sequences
/// generated with the historical map bit for bit.
pub fn moro_inverse_normal_cdf(u: f64) -> f64 {
    const A: [f64; 4] = [
        2.50662823884,
        -18.61500062529,
        41.39119773534,
        -25.44106049637,
    ];
    const B: [f64; 4] = [
        -8.47351093090,
        23.08336743743,
        -21.06224101826,
        3.13082909833,
    ];
    const C: [f64; 9] = [
        0.3374754822726147,
        0.9761690190917186,
        0.1607979714918209,
        0.0276438810333863,
        0.0038405729373609,
        0.0003951896511919,
        0.0000321767881768,
        0.0000002888167364,
        0.0000003960315187,
    ];

    let q = u - 0.5;
    if q.abs() <= 0.42 {
        let r = q * q;
        q * (((A[3] * r + A[2]) * r + A[1]) * r + A[0])
            / ((((B[3] * r + B[2]) * r + B[1]) * r + B[0]) * r + 1.0)
    } else {
        let r = if q > 0.0 { 1.0 - u } else { u };
        let s = (-r.ln()).ln();
        let mut t = C[8];
        for c in C[..8].iter().rev() {
            t = t * s + c;
        }
        if q > 0.0 { t } else { -t }
    }
}

/// Black-Scholes d-function pair for a lognormal with standard deviation
/// `stddev` of log-returns.
pub fn d_plus_minus(forward: f64, strike: f64, stddev: f64) -> (f64, f64) {
    let d1 = ((forward / strike).ln() + 0.5 * stddev * stddev) / stddev;
    (d1, d1 - stddev)
}

/// φ(x; μ, σ): density of a general normal.
pub fn gaussian_pdf(x: f64, mean: f64, stddev: f64) -> f64 {
    let z = (x - mean) / stddev;
    (-0.5 * z * z).exp() / (stddev * (2.0 * PI).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdf_symmetry() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-15);
        for &x in &[0.1, 0.5, 1.0, 2.0, 4.0] {
            assert!((normal_cdf(x) + normal_cdf(-x) - 1.0).abs() < 1e-14);
        }
    }

    #[test]
    fn inverse_is_right_inverse_within_1e8() {
        let mut u = 1e-7;
        while u < 1.0 - 1e-7 {
            let x = inverse_normal_cdf(u);
            assert!(
                (normal_cdf(x) - u).abs() < 1e-8,
                "round trip off at u = {u}"
            );
            u += 1e-3;
        }
        // And deep into the tails.
        for &u in &[1e-7, 1e-6, 1e-4, 1.0 - 1e-4, 1.0 - 1e-6, 1.0 - 1e-7] {
            let x = inverse_normal_cdf(u);
            assert!((normal_cdf(x) - u).abs() < 1e-8);
        }
    }

    #[test]
    fn moro_matches_acklam_to_its_accuracy() {
        let mut u = 0.001;
        while u < 0.999 {
            let diff = (moro_inverse_normal_cdf(u) - inverse_normal_cdf(u)).abs();
            assert!(diff < 1e-8, "maps diverge at u = {u}: {diff}");
            u += 0.001;
        }
    }

    #[test]
    fn known_quantiles() {
        assert!((inverse_normal_cdf(0.975) - 1.959963984540054).abs() < 1e-9);
        assert!((inverse_normal_cdf(0.5)).abs() < 1e-12);
    }
}
