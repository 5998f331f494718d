//! Triangle-inequality conflict (Bell, 2004).
//!
//! For an element `e` and constructs `j < k`, the ratings of `e` on `j` and
//! `k` and the distance between `j` and `k` over the other elements form
//! three sides of a triangle. When one side is longer than the other two
//! together the triple is in conflict, and the excess is its discrepancy.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::percent;
use crate::distance::construct_distances;
use crate::error::IndexError;
use crate::grid::{require_dims, GridAccessor};
use crate::stats::{nan_mean, nan_std_dev};

/// Which elements or constructs get a detailed breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DetailSelection {
    #[default]
    None,
    Indices(Vec<usize>),
    /// Everything whose share of all conflicts is at least this percentage.
    Threshold(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleOptions {
    /// Minkowski power of the construct distances (2 = Euclidean).
    pub power: f64,
    pub element_detail: DetailSelection,
    pub construct_detail: DetailSelection,
}

impl Default for TriangleOptions {
    fn default() -> Self {
        Self {
            power: 2.0,
            element_detail: DetailSelection::None,
            construct_detail: DetailSelection::None,
        }
    }
}

/// One violated triangle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriangleConflict {
    pub element: usize,
    pub construct_j: usize,
    pub construct_k: usize,
    /// Rating of the element on construct j.
    pub d_ij: f64,
    /// Rating of the element on construct k.
    pub d_ik: f64,
    /// Distance between constructs j and k without the element.
    pub d_jk: f64,
    pub discrepancy: f64,
}

impl TriangleConflict {
    fn involves(&self, construct: usize) -> bool {
        self.construct_j == construct || self.construct_k == construct
    }

    fn partner(&self, construct: usize) -> usize {
        if self.construct_j == construct {
            self.construct_k
        } else {
            self.construct_j
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribution {
    pub index: usize,
    pub count: usize,
    pub percent: f64,
}

/// Part of a selected entity's conflicts that involves a given counterpart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterpartShare {
    pub index: usize,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementConflictDetail {
    pub element: usize,
    pub conflicts: usize,
    /// Per construct; each conflict counts for both of its constructs, so
    /// percentages are halved to sum to 100.
    pub constructs: Vec<CounterpartShare>,
    pub discrepancy_mean: f64,
    pub discrepancy_sd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstructConflictDetail {
    pub construct: usize,
    pub conflicts: usize,
    pub elements: Vec<CounterpartShare>,
    /// The other construct of each conflict.
    pub constructs: Vec<CounterpartShare>,
    pub discrepancy_mean: f64,
    pub discrepancy_sd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriangleConflictResult {
    pub power: f64,
    /// `n_elements · n_constructs · (n_constructs − 1) / 2`.
    pub potential: usize,
    pub actual: usize,
    pub overall_percent: f64,
    /// Ordered by element, then construct pair.
    pub conflicts: Vec<TriangleConflict>,
    /// Count and share of all conflicts per element.
    pub per_element: Vec<Attribution>,
    /// Count of conflicts each construct takes part in; shares are halved.
    pub per_construct: Vec<Attribution>,
    pub element_details: Vec<ElementConflictDetail>,
    pub construct_details: Vec<ConstructConflictDetail>,
    #[serde(skip)]
    n_constructs: usize,
}

impl TriangleConflictResult {
    /// Discrepancy for `(element, j, k)` in either construct order; NaN when
    /// the triangle inequality holds.
    pub fn discrepancy(&self, element: usize, j: usize, k: usize) -> f64 {
        if j == k || j >= self.n_constructs || k >= self.n_constructs {
            return f64::NAN;
        }
        let (a, b) = if j < k { (j, k) } else { (k, j) };
        self.conflicts
            .iter()
            .find(|c| c.element == element && c.construct_j == a && c.construct_k == b)
            .map(|c| c.discrepancy)
            .unwrap_or(f64::NAN)
    }
}

/// Excess of the longest side over the sum of the other two, if positive.
pub fn triangle_excess(d_ij: f64, d_ik: f64, d_jk: f64) -> Option<f64> {
    let sides = [d_ij, d_ik, d_jk];
    let total: f64 = sides.iter().sum();
    sides
        .iter()
        .map(|&side| side - (total - side))
        .find(|&excess| excess > 0.0)
}

fn element_conflicts<G: GridAccessor + ?Sized>(
    grid: &G,
    element: usize,
    power: f64,
) -> Result<Vec<TriangleConflict>, IndexError> {
    let dc = construct_distances(grid, Some(element), power)?;
    let ratings = grid.rating_matrix();
    let nc = ratings.nrows();
    let mut out = Vec::new();
    for j in 0..nc {
        for k in (j + 1)..nc {
            let d_jk = dc.get(j, k);
            let d_ij = ratings[(j, element)];
            let d_ik = ratings[(k, element)];
            if let Some(discrepancy) = triangle_excess(d_ij, d_ik, d_jk) {
                out.push(TriangleConflict {
                    element,
                    construct_j: j,
                    construct_k: k,
                    d_ij,
                    d_ik,
                    d_jk,
                    discrepancy,
                });
            }
        }
    }
    Ok(out)
}

fn resolve_selection(
    selection: &DetailSelection,
    attribution: &[Attribution],
    what: &str,
) -> Result<Vec<usize>, IndexError> {
    match selection {
        DetailSelection::None => Ok(Vec::new()),
        DetailSelection::Indices(indices) => {
            if let Some(&bad) = indices.iter().find(|&&i| i >= attribution.len()) {
                return Err(IndexError::invalid(format!(
                    "{what} index {bad} out of range (grid has {})",
                    attribution.len()
                )));
            }
            let mut out = indices.clone();
            out.sort_unstable();
            out.dedup();
            Ok(out)
        }
        DetailSelection::Threshold(t) => {
            if !t.is_finite() {
                return Err(IndexError::invalid(format!(
                    "{what} detail threshold must be finite"
                )));
            }
            Ok(attribution
                .iter()
                .filter(|a| a.percent >= *t)
                .map(|a| a.index)
                .collect())
        }
    }
}

fn discrepancy_stats<'a>(conflicts: impl Iterator<Item = &'a TriangleConflict>) -> (f64, f64) {
    let values: Vec<f64> = conflicts.map(|c| c.discrepancy).collect();
    (nan_mean(&values), nan_std_dev(&values))
}

fn element_detail(
    element: usize,
    conflicts: &[TriangleConflict],
    n_constructs: usize,
) -> ElementConflictDetail {
    let own: Vec<&TriangleConflict> = conflicts.iter().filter(|c| c.element == element).collect();
    let n = own.len();
    let constructs = (0..n_constructs)
        .map(|c| {
            let count = own.iter().filter(|t| t.involves(c)).count();
            CounterpartShare {
                index: c,
                count,
                percent: percent(count, n) / 2.0,
            }
        })
        .collect();
    let (discrepancy_mean, discrepancy_sd) = discrepancy_stats(own.iter().copied());
    ElementConflictDetail {
        element,
        conflicts: n,
        constructs,
        discrepancy_mean,
        discrepancy_sd,
    }
}

fn construct_detail(
    construct: usize,
    conflicts: &[TriangleConflict],
    n_elements: usize,
    n_constructs: usize,
) -> ConstructConflictDetail {
    let own: Vec<&TriangleConflict> = conflicts.iter().filter(|c| c.involves(construct)).collect();
    let n = own.len();
    let elements = (0..n_elements)
        .map(|e| {
            let count = own.iter().filter(|t| t.element == e).count();
            CounterpartShare {
                index: e,
                count,
                percent: percent(count, n),
            }
        })
        .collect();
    let constructs = (0..n_constructs)
        .filter(|&k| k != construct)
        .map(|k| {
            let count = own.iter().filter(|t| t.partner(construct) == k).count();
            CounterpartShare {
                index: k,
                count,
                percent: percent(count, n),
            }
        })
        .collect();
    let (discrepancy_mean, discrepancy_sd) = discrepancy_stats(own.iter().copied());
    ConstructConflictDetail {
        construct,
        conflicts: n,
        elements,
        constructs,
        discrepancy_mean,
        discrepancy_sd,
    }
}

/// Triangle-inequality conflict over every element and construct pair.
pub fn conflict_triangle<G: GridAccessor + Sync + ?Sized>(
    grid: &G,
    opts: &TriangleOptions,
) -> Result<TriangleConflictResult, IndexError> {
    require_dims(grid, "conflict (triangle)", 2, 2)?;
    let ne = grid.element_count();
    let nc = grid.construct_count();

    let per_element_conflicts: Vec<Vec<TriangleConflict>> = (0..ne)
        .into_par_iter()
        .map(|e| element_conflicts(grid, e, opts.power))
        .collect::<Result<_, _>>()?;
    let conflicts: Vec<TriangleConflict> = per_element_conflicts.into_iter().flatten().collect();

    let potential = ne * nc * (nc - 1) / 2;
    let actual = conflicts.len();

    let per_element: Vec<Attribution> = (0..ne)
        .map(|e| {
            let count = conflicts.iter().filter(|c| c.element == e).count();
            Attribution {
                index: e,
                count,
                percent: percent(count, actual),
            }
        })
        .collect();
    let per_construct: Vec<Attribution> = (0..nc)
        .map(|c| {
            let count = conflicts.iter().filter(|t| t.involves(c)).count();
            Attribution {
                index: c,
                count,
                percent: percent(count, actual) / 2.0,
            }
        })
        .collect();

    let element_details = resolve_selection(&opts.element_detail, &per_element, "element")?
        .into_iter()
        .map(|e| element_detail(e, &conflicts, nc))
        .collect();
    let construct_details =
        resolve_selection(&opts.construct_detail, &per_construct, "construct")?
            .into_iter()
            .map(|c| construct_detail(c, &conflicts, ne, nc))
            .collect();

    let overall_percent = percent(actual, potential);
    debug!(potential, actual, overall_percent, "triangle conflict computed");

    Ok(TriangleConflictResult {
        power: opts.power,
        potential,
        actual,
        overall_percent,
        conflicts,
        per_element,
        per_construct,
        element_details,
        construct_details,
        n_constructs: nc,
    })
}
