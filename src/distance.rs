//! Minkowski distances between grid rows or columns.
//!
//! Distances are normalised by `(n_elements - 1)^(1/p)`, with `n_elements`
//! the element count of the full grid, whether or not an element is dropped.
//! The triangle conflict measure depends on exactly this divisor.

use nalgebra::DMatrix;

use crate::error::IndexError;
use crate::grid::{require_dims, GridAccessor};

/// Square, symmetric distance matrix with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    values: DMatrix<f64>,
}

impl DistanceMatrix {
    pub fn dim(&self) -> usize {
        self.values.nrows()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }
}

pub fn minkowski(a: &[f64], b: &[f64], power: f64) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs().powf(power))
        .sum::<f64>()
        .powf(1.0 / power)
}

fn check_power(power: f64) -> Result<(), IndexError> {
    if !power.is_finite() || power < 1.0 {
        return Err(IndexError::invalid(format!(
            "Minkowski power must be a finite value >= 1, got {power}"
        )));
    }
    Ok(())
}

fn kept_elements<G: GridAccessor + ?Sized>(
    grid: &G,
    excluded_element: Option<usize>,
) -> Result<Vec<usize>, IndexError> {
    let ne = grid.element_count();
    if let Some(e) = excluded_element {
        if e >= ne {
            return Err(IndexError::invalid(format!(
                "element index {e} out of range (grid has {ne} elements)"
            )));
        }
    }
    Ok((0..ne).filter(|&e| Some(e) != excluded_element).collect())
}

fn normaliser(n_elements: usize, power: f64) -> f64 {
    let base = n_elements.saturating_sub(1).max(1) as f64;
    base.powf(1.0 / power)
}

fn pairwise(vectors: &[Vec<f64>], power: f64, divisor: f64) -> DistanceMatrix {
    let n = vectors.len();
    let mut values = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = minkowski(&vectors[i], &vectors[j], power) / divisor;
            values[(i, j)] = d;
            values[(j, i)] = d;
        }
    }
    DistanceMatrix { values }
}

/// Distances between element columns, computed across constructs.
pub fn element_distances<G: GridAccessor + ?Sized>(
    grid: &G,
    excluded_element: Option<usize>,
    power: f64,
) -> Result<DistanceMatrix, IndexError> {
    require_dims(grid, "element distances", 1, 2)?;
    check_power(power)?;
    let keep = kept_elements(grid, excluded_element)?;
    let ratings = grid.rating_matrix();
    let columns: Vec<Vec<f64>> = keep
        .iter()
        .map(|&e| ratings.column(e).iter().copied().collect())
        .collect();
    Ok(pairwise(
        &columns,
        power,
        normaliser(grid.element_count(), power),
    ))
}

/// Distances between construct rows, computed across the remaining elements.
pub fn construct_distances<G: GridAccessor + ?Sized>(
    grid: &G,
    excluded_element: Option<usize>,
    power: f64,
) -> Result<DistanceMatrix, IndexError> {
    require_dims(grid, "construct distances", 1, 2)?;
    check_power(power)?;
    let keep = kept_elements(grid, excluded_element)?;
    let ratings = grid.rating_matrix();
    let rows: Vec<Vec<f64>> = (0..ratings.nrows())
        .map(|c| keep.iter().map(|&e| ratings[(c, e)]).collect())
        .collect();
    Ok(pairwise(&rows, power, normaliser(grid.element_count(), power)))
}
