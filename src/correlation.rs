//! Construct and element correlation matrices.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::IndexError;
use crate::grid::{require_dims, GridAccessor};
use crate::stats::pearson;

/// Coefficient used to correlate element columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementCoefficient {
    #[default]
    Pearson,
    /// Cohen's rc: Pearson over the double-entry grid, so reflecting a
    /// construct does not change the element correlations.
    CohenRc,
}

/// Square, symmetric correlation matrix. Rows with zero variance have NaN
/// entries (including their diagonal cell).
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    values: DMatrix<f64>,
}

impl CorrelationMatrix {
    pub fn dim(&self) -> usize {
        self.values.nrows()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn has_undefined(&self) -> bool {
        self.values.iter().any(|v| v.is_nan())
    }

    /// Rows whose correlation with themselves is undefined (zero variance).
    pub fn undefined_rows(&self) -> Vec<usize> {
        (0..self.dim())
            .filter(|&i| self.values[(i, i)].is_nan())
            .collect()
    }

    /// Copy with self-correlations set to zero.
    pub fn with_zero_diagonal(&self) -> DMatrix<f64> {
        let mut out = self.values.clone();
        out.fill_diagonal(0.0);
        out
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.dim())
            .map(|i| self.values.row(i).iter().copied().collect())
            .collect()
    }
}

/// Pearson correlation between every pair of rows of `m`.
fn row_correlations(m: &DMatrix<f64>) -> DMatrix<f64> {
    let n = m.nrows();
    let rows: Vec<Vec<f64>> = (0..n).map(|i| m.row(i).iter().copied().collect()).collect();
    let mut out = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        let self_defined = !pearson(&rows[i], &rows[i]).is_nan();
        out[(i, i)] = if self_defined { 1.0 } else { f64::NAN };
        for j in (i + 1)..n {
            let r = pearson(&rows[i], &rows[j]);
            out[(i, j)] = r;
            out[(j, i)] = r;
        }
    }
    out
}

fn finish(kind: &'static str, values: DMatrix<f64>) -> CorrelationMatrix {
    let matrix = CorrelationMatrix { values };
    let undefined = matrix.undefined_rows();
    if !undefined.is_empty() {
        warn!(
            kind,
            rows = ?undefined,
            "undefined correlation: zero-variance rows produce NaN entries"
        );
    }
    matrix
}

/// Correlations between construct rows, computed across elements.
pub fn construct_correlation<G: GridAccessor + ?Sized>(
    grid: &G,
) -> Result<CorrelationMatrix, IndexError> {
    require_dims(grid, "construct correlation", 1, 2)?;
    Ok(finish("construct", row_correlations(grid.rating_matrix())))
}

/// Correlations between element columns, computed across constructs.
pub fn element_correlation<G: GridAccessor + ?Sized>(
    grid: &G,
    coefficient: ElementCoefficient,
) -> Result<CorrelationMatrix, IndexError> {
    require_dims(grid, "element correlation", 2, 1)?;
    let ratings = grid.rating_matrix();
    let values = match coefficient {
        ElementCoefficient::Pearson => row_correlations(&ratings.transpose()),
        ElementCoefficient::CohenRc => {
            let scale = grid.scale();
            let nc = ratings.nrows();
            let doubled = DMatrix::from_fn(2 * nc, ratings.ncols(), |i, j| {
                if i < nc {
                    ratings[(i, j)]
                } else {
                    scale.min + scale.max - ratings[(i - nc, j)]
                }
            });
            row_correlations(&doubled.transpose())
        }
    };
    Ok(finish("element", values))
}

/// Ratings with each construct row's mean subtracted.
pub fn centered_matrix<G: GridAccessor + ?Sized>(grid: &G) -> Result<DMatrix<f64>, IndexError> {
    require_dims(grid, "centered matrix", 1, 1)?;
    let mut out = grid.rating_matrix().clone();
    for i in 0..out.nrows() {
        let mean = out.row(i).mean();
        for v in out.row_mut(i).iter_mut() {
            *v -= mean;
        }
    }
    Ok(out)
}

/// Correlation of one construct row with another, optionally reading the
/// second row from the opposite pole.
pub(crate) fn construct_pair_correlation<G: GridAccessor + ?Sized>(
    grid: &G,
    first: &[f64],
    second: usize,
    mirror_second: bool,
) -> f64 {
    let scale = grid.scale();
    let row: Vec<f64> = grid
        .rating_matrix()
        .row(second)
        .iter()
        .map(|&r| if mirror_second { scale.mirror(r) } else { r })
        .collect();
    pearson(first, &row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Construct, Element, Grid, Scale};

    fn grid(rows: &[Vec<f64>]) -> Grid {
        let nc = rows.len();
        let ne = rows[0].len();
        Grid::from_rows(
            Scale::new(1.0, 5.0).unwrap(),
            (0..nc).map(|i| Construct::new(format!("l{i}"), format!("r{i}"))).collect(),
            (0..ne).map(|j| Element::new(format!("e{j}"))).collect(),
            rows,
        )
        .unwrap()
    }

    #[test]
    fn construct_correlation_is_symmetric_with_unit_diagonal() {
        let g = grid(&[
            vec![1.0, 2.0, 3.0, 4.0],
            vec![4.0, 3.0, 2.0, 1.0],
            vec![1.0, 3.0, 2.0, 5.0],
        ]);
        let r = construct_correlation(&g).unwrap();
        assert_eq!(r.dim(), 3);
        for i in 0..3 {
            assert_eq!(r.get(i, i), 1.0);
            for j in 0..3 {
                assert!((r.get(i, j) - r.get(j, i)).abs() < 1e-12);
            }
        }
        assert!((r.get(0, 1) + 1.0).abs() < 1e-12);
        assert!(!r.has_undefined());
    }

    #[test]
    fn zero_variance_row_yields_nan_not_error() {
        let g = grid(&[vec![1.0, 2.0, 3.0], vec![3.0, 3.0, 3.0]]);
        let r = construct_correlation(&g).unwrap();
        assert!(r.get(0, 1).is_nan());
        assert!(r.get(1, 1).is_nan());
        assert_eq!(r.undefined_rows(), vec![1]);
        assert_eq!(r.with_zero_diagonal()[(0, 0)], 0.0);
    }

    #[test]
    fn cohen_rc_is_invariant_to_construct_reflection() {
        let rows = vec![
            vec![1.0, 2.0, 5.0, 4.0],
            vec![2.0, 2.0, 4.0, 5.0],
            vec![5.0, 1.0, 3.0, 2.0],
        ];
        let mut reflected = rows.clone();
        reflected[1] = rows[1].iter().map(|r| 6.0 - r).collect();
        let a = element_correlation(&grid(&rows), ElementCoefficient::CohenRc).unwrap();
        let b = element_correlation(&grid(&reflected), ElementCoefficient::CohenRc).unwrap();
        for i in 0..4 {
            for j in 0..4 {
                assert!((a.get(i, j) - b.get(i, j)).abs() < 1e-12);
            }
        }
        let p = element_correlation(&grid(&rows), ElementCoefficient::Pearson).unwrap();
        let q = element_correlation(&grid(&reflected), ElementCoefficient::Pearson).unwrap();
        assert!((p.get(0, 1) - q.get(0, 1)).abs() > 1e-6);
    }

    #[test]
    fn centered_rows_have_zero_mean() {
        let g = grid(&[vec![1.0, 2.0, 3.0], vec![5.0, 5.0, 2.0]]);
        let c = centered_matrix(&g).unwrap();
        for i in 0..2 {
            assert!(c.row(i).sum().abs() < 1e-12);
        }
        assert_eq!(c[(0, 0)], -1.0);
    }

    #[test]
    fn element_correlation_needs_two_constructs() {
        let g = grid(&[vec![1.0, 2.0, 3.0]]);
        assert!(matches!(
            element_correlation(&g, ElementCoefficient::Pearson),
            Err(IndexError::InsufficientData { .. })
        ));
    }
}
