//! Dense-matrix helpers on top of `nalgebra`.

use crate::error::{IllegalArgument, PricingError, PricingResult};
use nalgebra::DMatrix;

/// Lower-triangular Cholesky factor of a symmetric positive-definite
/// matrix.
///
/// Correlation matrices that fail the factorization (asymmetric, or not
/// positive definite) are a caller error, not a numerical accident.
pub fn cholesky_factor(matrix: &DMatrix<f64>) -> PricingResult<DMatrix<f64>> {
    if !matrix.is_square() {
        return Err(not_spd(format!(
            "{}x{} matrix is not square",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    let n = matrix.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            if (matrix[(i, j)] - matrix[(j, i)]).abs() > 1e-12 {
                return Err(not_spd(format!(
                    "asymmetry at ({i}, {j}): {} vs {}",
                    matrix[(i, j)],
                    matrix[(j, i)]
                )));
            }
        }
    }
    nalgebra::linalg::Cholesky::new(matrix.clone())
        .map(|c| c.l())
        .ok_or_else(|| not_spd("factorization failed".into()))
}

fn not_spd(reason: String) -> PricingError {
    PricingError::IllegalArgument(IllegalArgument::NotPositiveDefinite(reason))
}

/// Builds a correlation matrix from the flat row-major coefficients.
pub fn correlation_from_rows(n: usize, coefficients: &[f64]) -> PricingResult<DMatrix<f64>> {
    if coefficients.len() != n * n {
        return Err(PricingError::IllegalArgument(
            IllegalArgument::DimensionMismatch {
                expected: n * n,
                actual: coefficients.len(),
            },
        ));
    }
    Ok(DMatrix::from_row_slice(n, n, coefficients))
}
