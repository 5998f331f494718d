#![forbid(unsafe_code)]

//! # repgrid-measures
//!
//! Structural indices for repertory grids: a matrix of ratings of elements
//! (people, objects, situations) on bipolar constructs.
//!
//! Every index is a pure function over a read-only [`GridAccessor`]:
//! - [`bias`] and [`variability`]: how ratings sit around the scale midpoint
//! - [`pvaff`]: share of variance on the first principal component
//! - [`intensity`]: average squared correlation of constructs and elements
//! - [`conflict_balance_sign`], [`conflict_balance_magnitude`] and
//!   [`conflict_triangle`]: three views on conflict between constructs
//! - [`dilemmas`]: implicative dilemmas between a self and an ideal self
//!
//! Undefined correlations (constant rows) propagate as NaN and are logged
//! through `tracing`; they never abort a computation.

pub mod basic;
pub mod complexity;
pub mod config;
pub mod conflict;
pub mod correlation;
pub mod dilemma;
pub mod distance;
pub mod error;
pub mod grid;
pub mod intensity;
pub mod report;
pub mod stats;

pub use basic::{bias, variability, BasicOptions};
pub use complexity::pvaff;
pub use config::{load_config_from_path, IndexConfig};
pub use conflict::{
    conflict_balance_magnitude, conflict_balance_sign, conflict_triangle, BalanceSummary,
    DetailSelection, MagnitudeBalanceResult, MagnitudeOptions, TriangleConflictResult,
    TriangleOptions,
};
pub use correlation::{
    construct_correlation, element_correlation, CorrelationMatrix, ElementCoefficient,
};
pub use dilemma::{dilemmas, CorrelationBasis, DifferenceMode, DilemmaOptions, DilemmaResult};
pub use distance::{construct_distances, element_distances, DistanceMatrix};
pub use error::{ConfigError, IndexError};
pub use grid::{Construct, Element, Grid, GridAccessor, GridSpec, Scale};
pub use intensity::{intensity, IntensityOptions, IntensityResult};
pub use report::{
    build_envelope, grid_fingerprint, render_envelope_text, render_report_text, IndexReport,
    RenderOptions, ReportEnvelope,
};
