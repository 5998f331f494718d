//! Intensity: how tightly constructs and elements hang together, measured by
//! average squared correlation.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::correlation::{construct_correlation, element_correlation, ElementCoefficient};
use crate::error::IndexError;
use crate::grid::{require_dims, GridAccessor};
use crate::stats::{nan_mean, nan_sum};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntensityOptions {
    /// Coefficient for the element correlations.
    pub coefficient: ElementCoefficient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityResult {
    pub per_construct: Vec<f64>,
    pub per_element: Vec<f64>,
    pub construct_mean: f64,
    pub element_mean: f64,
    /// Mean over both per-entity vectors together.
    pub total: f64,
}

/// `Σ r²` over each row of a zero-diagonal matrix, divided by `n - 1`.
/// NaN entries are skipped, so an all-NaN row sums to 0.
fn row_scores(zeroed: &DMatrix<f64>) -> Vec<f64> {
    let n = zeroed.nrows();
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| {
            let off_diagonal = (0..n).filter(|&j| j != i).map(|j| zeroed[(i, j)].powi(2));
            nan_sum(off_diagonal).unwrap_or(0.0) / denom
        })
        .collect()
}

pub fn intensity<G: GridAccessor + ?Sized>(
    grid: &G,
    opts: &IntensityOptions,
) -> Result<IntensityResult, IndexError> {
    require_dims(grid, "intensity", 2, 2)?;
    let cr = construct_correlation(grid)?.with_zero_diagonal();
    let er = element_correlation(grid, opts.coefficient)?.with_zero_diagonal();

    let per_construct = row_scores(&cr);
    let per_element = row_scores(&er);
    let construct_mean = nan_mean(&per_construct);
    let element_mean = nan_mean(&per_element);
    let all: Vec<f64> = per_construct
        .iter()
        .chain(per_element.iter())
        .copied()
        .collect();
    let total = nan_mean(&all);

    debug!(construct_mean, element_mean, total, "intensity computed");
    Ok(IntensityResult {
        per_construct,
        per_element,
        construct_mean,
        element_mean,
        total,
    })
}
