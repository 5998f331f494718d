//! Cognitive complexity: percentage of variance accounted for by the first
//! factor (PVAFF) of the construct correlation matrix.

use tracing::{debug, warn};

use crate::correlation::construct_correlation;
use crate::error::IndexError;
use crate::grid::{require_dims, GridAccessor};

const SVD_MAX_ITERATIONS: usize = 10_000;

/// Share of the construct correlation structure carried by the dominant
/// singular value: `σ₁² / Σσᵢ²`.
///
/// Lies in `[1/n, 1]` for `n` constructs and reaches 1 when all constructs are
/// perfectly linearly dependent. Returns NaN (with a warning) when the
/// correlation matrix has undefined entries.
pub fn pvaff<G: GridAccessor + ?Sized>(grid: &G) -> Result<f64, IndexError> {
    require_dims(grid, "pvaff", 1, 2)?;
    let cor = construct_correlation(grid)?;
    if cor.has_undefined() {
        warn!(
            rows = ?cor.undefined_rows(),
            "pvaff undefined: correlation matrix contains NaN"
        );
        return Ok(f64::NAN);
    }

    let Some(svd) = cor
        .values()
        .clone()
        .try_svd(false, false, f64::EPSILON, SVD_MAX_ITERATIONS)
    else {
        warn!("pvaff undefined: singular value decomposition did not converge");
        return Ok(f64::NAN);
    };

    let sv = svd.singular_values;
    let largest = sv.iter().copied().fold(0.0, f64::max);
    let total: f64 = sv.iter().map(|s| s * s).sum();
    if total <= 0.0 {
        return Ok(f64::NAN);
    }
    let value = largest * largest / total;
    debug!(value, constructs = cor.dim(), "pvaff computed");
    Ok(value)
}
