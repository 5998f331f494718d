//! Balance of construct correlation triads.

use std::cmp::Ordering;

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::correlation::construct_correlation;
use crate::error::IndexError;
use crate::grid::{require_dims, GridAccessor};
use crate::stats::{fisher_z, triads};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriadBalance {
    Balanced,
    Imbalanced,
    /// At least one correlation in the triad is undefined.
    Undefined,
}

/// A triad with the Fisher z values of its pairs `(a,b)`, `(a,c)`, `(b,c)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriadZ {
    pub constructs: [usize; 3],
    pub z: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSummary {
    /// Number of triads, always `C(n, 3)`.
    pub total: usize,
    pub balanced: usize,
    /// Every triad that is not balanced, so `balanced + imbalanced == total`.
    pub imbalanced: usize,
    /// Imbalanced triads that touch an undefined correlation.
    pub undefined: usize,
    /// Proportions over all triads.
    pub prop_balanced: f64,
    pub prop_imbalanced: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeOptions {
    /// Tolerance band absorbing near-zero correlation noise.
    pub crit: f64,
}

impl Default for MagnitudeOptions {
    fn default() -> Self {
        Self { crit: 0.03 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MagnitudeBalanceResult {
    pub summary: BalanceSummary,
    pub crit: f64,
    pub imbalanced_triads: Vec<TriadZ>,
}

/// Balanced iff the product of the three z values is positive.
pub fn classify_sign(z: [f64; 3]) -> TriadBalance {
    let product = z[0] * z[1] * z[2];
    if product.is_nan() {
        TriadBalance::Undefined
    } else if product > 0.0 {
        TriadBalance::Balanced
    } else {
        TriadBalance::Imbalanced
    }
}

/// Orders z by absolute value into `(max, mdn, min)`. When `max·mdn > 0` the
/// triad is balanced iff `max·mdn − min ≤ crit`, otherwise iff
/// `min − max·mdn ≤ crit`.
pub fn classify_magnitude(z: [f64; 3], crit: f64) -> TriadBalance {
    if z.iter().any(|v| v.is_nan()) {
        return TriadBalance::Undefined;
    }
    let mut ordered = z;
    ordered.sort_by(|a, b| b.abs().partial_cmp(&a.abs()).unwrap_or(Ordering::Equal));
    let [z_max, z_mdn, z_min] = ordered;
    let product = z_max * z_mdn;
    let excess = if product > 0.0 {
        product - z_min
    } else {
        z_min - product
    };
    if excess.is_nan() {
        TriadBalance::Undefined
    } else if excess <= crit {
        TriadBalance::Balanced
    } else {
        TriadBalance::Imbalanced
    }
}

fn fisher_z_matrix<G: GridAccessor + ?Sized>(
    grid: &G,
    index: &'static str,
) -> Result<DMatrix<f64>, IndexError> {
    require_dims(grid, index, 3, 2)?;
    let cor = construct_correlation(grid)?;
    if cor.has_undefined() {
        warn!(index, "triads touching undefined correlations count as imbalanced");
    }
    Ok(cor.values().map(fisher_z))
}

fn triad_z(z: &DMatrix<f64>, [a, b, c]: [usize; 3]) -> [f64; 3] {
    [z[(a, b)], z[(a, c)], z[(b, c)]]
}

fn summarize(labels: &[TriadBalance]) -> BalanceSummary {
    let total = labels.len();
    let balanced = labels
        .iter()
        .filter(|b| **b == TriadBalance::Balanced)
        .count();
    let undefined = labels
        .iter()
        .filter(|b| **b == TriadBalance::Undefined)
        .count();
    // a triad that is not positively balanced counts against balance
    let imbalanced = total - balanced;
    let (prop_balanced, prop_imbalanced) = if total == 0 {
        (f64::NAN, f64::NAN)
    } else {
        (
            balanced as f64 / total as f64,
            imbalanced as f64 / total as f64,
        )
    };
    BalanceSummary {
        total,
        balanced,
        imbalanced,
        undefined,
        prop_balanced,
        prop_imbalanced,
    }
}

/// Conflict as the proportion of sign-imbalanced correlation triads.
pub fn conflict_balance_sign<G: GridAccessor + ?Sized>(
    grid: &G,
) -> Result<BalanceSummary, IndexError> {
    let z = fisher_z_matrix(grid, "conflict (sign balance)")?;
    let labels: Vec<TriadBalance> = triads(z.nrows())
        .into_par_iter()
        .map(|t| classify_sign(triad_z(&z, t)))
        .collect();
    let summary = summarize(&labels);
    debug!(
        total = summary.total,
        imbalanced = summary.imbalanced,
        "sign balance computed"
    );
    Ok(summary)
}

/// Conflict as the proportion of magnitude-imbalanced correlation triads,
/// listing the imbalanced ones.
pub fn conflict_balance_magnitude<G: GridAccessor + ?Sized>(
    grid: &G,
    opts: &MagnitudeOptions,
) -> Result<MagnitudeBalanceResult, IndexError> {
    if !opts.crit.is_finite() || opts.crit < 0.0 {
        return Err(IndexError::invalid(format!(
            "crit must be a finite value >= 0, got {}",
            opts.crit
        )));
    }
    let z = fisher_z_matrix(grid, "conflict (magnitude balance)")?;
    let classified: Vec<(TriadZ, TriadBalance)> = triads(z.nrows())
        .into_par_iter()
        .map(|t| {
            let values = triad_z(&z, t);
            (
                TriadZ {
                    constructs: t,
                    z: values,
                },
                classify_magnitude(values, opts.crit),
            )
        })
        .collect();

    let labels: Vec<TriadBalance> = classified.iter().map(|(_, b)| *b).collect();
    let summary = summarize(&labels);
    let imbalanced_triads = classified
        .into_iter()
        .filter(|(_, b)| *b != TriadBalance::Balanced)
        .map(|(t, _)| t)
        .collect();
    debug!(
        total = summary.total,
        imbalanced = summary.imbalanced,
        crit = opts.crit,
        "magnitude balance computed"
    );
    Ok(MagnitudeBalanceResult {
        summary,
        crit: opts.crit,
        imbalanced_triads,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_rule_follows_product_sign() {
        assert_eq!(classify_sign([0.5, 0.4, 0.3]), TriadBalance::Balanced);
        assert_eq!(classify_sign([-0.5, -0.4, 0.3]), TriadBalance::Balanced);
        assert_eq!(classify_sign([-0.5, 0.4, 0.3]), TriadBalance::Imbalanced);
        assert_eq!(classify_sign([-0.5, -0.4, -0.3]), TriadBalance::Imbalanced);
        assert_eq!(classify_sign([0.0, 0.4, 0.3]), TriadBalance::Imbalanced);
        assert_eq!(classify_sign([f64::NAN, 0.4, 0.3]), TriadBalance::Undefined);
    }

    #[test]
    fn magnitude_rule_worked_example() {
        // ordered (0.5, 0.3, -0.1): 0.15 - (-0.1) = 0.25 > 0.03
        assert_eq!(
            classify_magnitude([0.5, 0.3, -0.1], 0.03),
            TriadBalance::Imbalanced
        );
        assert_eq!(classify_sign([0.5, 0.3, -0.1]), TriadBalance::Imbalanced);
        // order of the input does not matter
        assert_eq!(
            classify_magnitude([-0.1, 0.5, 0.3], 0.0),
            TriadBalance::Imbalanced
        );
    }

    #[test]
    fn magnitude_rule_uses_tolerance_band() {
        // 0.5 * 0.4 = 0.2; 0.2 - 0.18 = 0.02
        assert_eq!(classify_magnitude([0.5, 0.4, 0.18], 0.03), TriadBalance::Balanced);
        assert_eq!(classify_magnitude([0.5, 0.4, 0.18], 0.0), TriadBalance::Imbalanced);
        // negative product: -0.2; min - product = 0.18 + 0.2 = 0.38
        assert_eq!(
            classify_magnitude([0.5, -0.4, 0.18], 0.03),
            TriadBalance::Imbalanced
        );
        // negative product and min pulling the same way: -0.25 - (-0.2) = -0.05
        assert_eq!(
            classify_magnitude([0.5, -0.4, -0.25], 0.03),
            TriadBalance::Balanced
        );
    }

    #[test]
    fn summary_counts_add_up() {
        let s = summarize(&[
            TriadBalance::Balanced,
            TriadBalance::Imbalanced,
            TriadBalance::Balanced,
            TriadBalance::Undefined,
        ]);
        assert_eq!(s.total, 4);
        assert_eq!(s.balanced + s.imbalanced, s.total);
        assert_eq!(s.imbalanced, 2);
        assert_eq!(s.undefined, 1);
        assert!((s.prop_balanced - 0.5).abs() < 1e-12);
        assert!((s.prop_balanced + s.prop_imbalanced - 1.0).abs() < 1e-12);
    }
}
