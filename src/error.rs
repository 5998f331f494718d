//! Error types shared by every index.

use thiserror::Error;

/// Errors raised before or while computing an index.
///
/// Numerical edge cases (zero-variance rows, empty drill-down selections) are
/// not errors: they surface as NaN values or empty collections in the result.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IndexError {
    /// The input is not a well-formed grid.
    #[error("invalid grid input: {reason}")]
    InvalidInput { reason: String },

    /// The grid is too small for the requested index.
    #[error("{index} needs at least {required} {what}, grid has {found}")]
    InsufficientData {
        index: &'static str,
        what: &'static str,
        required: usize,
        found: usize,
    },

    /// Unknown classification mode selector for the dilemma detector.
    #[error("unsupported difference mode {mode} (expected 0 or 1)")]
    UnsupportedMode { mode: i64 },
}

impl IndexError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn too_few_constructs(index: &'static str, required: usize, found: usize) -> Self {
        Self::InsufficientData {
            index,
            what: "constructs",
            required,
            found,
        }
    }

    pub(crate) fn too_few_elements(index: &'static str, required: usize, found: usize) -> Self {
        Self::InsufficientData {
            index,
            what: "elements",
            required,
            found,
        }
    }
}

/// Errors from loading or validating an [`IndexConfig`](crate::config::IndexConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Index(#[from] IndexError),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
