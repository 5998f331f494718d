//! Bias and variability of a grid's ratings.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::correlation::centered_matrix;
use crate::error::IndexError;
use crate::grid::{require_dims, GridAccessor, Scale};
use crate::stats::maybe_round;

/// Options shared by [`bias`] and [`variability`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicOptions {
    /// Scale minimum; the grid's own bound when `None`.
    pub min: Option<f64>,
    /// Scale maximum; the grid's own bound when `None`.
    pub max: Option<f64>,
    /// Decimal places of the result; `None` leaves it unrounded.
    pub digits: Option<u32>,
}

impl Default for BasicOptions {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            digits: Some(2),
        }
    }
}

impl BasicOptions {
    /// Fill missing bounds from the grid.
    pub fn resolve_scale<G: GridAccessor + ?Sized>(&self, grid: &G) -> Result<Scale, IndexError> {
        let own = grid.scale();
        Scale::new(self.min.unwrap_or(own.min), self.max.unwrap_or(own.max))
    }
}

/// Root mean squared deviation of construct means from the scale midpoint,
/// relative to the half range.
pub fn bias<G: GridAccessor + ?Sized>(grid: &G, opts: &BasicOptions) -> Result<f64, IndexError> {
    require_dims(grid, "bias", 2, 2)?;
    let scale = opts.resolve_scale(grid)?;
    let p = scale.midpoint();
    let q = scale.half_range();

    let ratings = grid.rating_matrix();
    let n = ratings.nrows();
    let ss: f64 = (0..n)
        .map(|i| {
            let d = ratings.row(i).mean() - p;
            d * d
        })
        .sum();
    let value = (ss / n as f64).sqrt() / q;
    debug!(value, "bias computed");
    Ok(maybe_round(value, opts.digits))
}

/// Average within-construct spread: `sqrt(trace(D·Dᵀ) / (n·(m-1)))`
/// relative to the half range, with `D` the row-centred ratings.
pub fn variability<G: GridAccessor + ?Sized>(
    grid: &G,
    opts: &BasicOptions,
) -> Result<f64, IndexError> {
    require_dims(grid, "variability", 2, 2)?;
    let scale = opts.resolve_scale(grid)?;
    let q = scale.half_range();

    let d = centered_matrix(grid)?;
    let w = &d * d.transpose();
    let v_tot = w.trace();
    let n = d.nrows() as f64;
    let m = d.ncols() as f64;
    let value = (v_tot / (n * (m - 1.0))).sqrt() / q;
    debug!(value, v_tot, "variability computed");
    Ok(maybe_round(value, opts.digits))
}
