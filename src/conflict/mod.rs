//! Conflict measures.
//!
//! Three independent algorithms:
//! - [`conflict_balance_sign`]: correlation triads balanced by the sign of the
//!   product of their Fisher z values
//! - [`conflict_balance_magnitude`]: the same triads judged on magnitude, with
//!   a tolerance band around near-zero correlations
//! - [`conflict_triangle`]: triangle-inequality violations between rating
//!   distances and construct distances (Bell, 2004)
//!
//! Triads and elements are evaluated with rayon; collection keeps enumeration
//! order, so results never depend on how the work was split.

pub mod triad;
pub mod triangle;

pub use triad::{
    classify_magnitude, classify_sign, conflict_balance_magnitude, conflict_balance_sign,
    BalanceSummary, MagnitudeBalanceResult, MagnitudeOptions, TriadBalance, TriadZ,
};
pub use triangle::{
    conflict_triangle, triangle_excess, Attribution, ConstructConflictDetail, CounterpartShare,
    DetailSelection, ElementConflictDetail, TriangleConflict, TriangleConflictResult,
    TriangleOptions,
};

/// `part / whole * 100`, or 0 when there is nothing to divide.
pub(crate) fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
