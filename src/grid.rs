//! Repertory grid container and the read-only accessor contract the indices use.
//!
//! Indices never touch [`Grid`] fields directly: they go through
//! [`GridAccessor`], so any other grid store can be plugged in by
//! implementing the trait.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Rating scale bounds, shared by every cell of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    pub min: f64,
    pub max: f64,
}

impl Scale {
    pub fn new(min: f64, max: f64) -> Result<Self, IndexError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(IndexError::invalid("scale bounds must be finite"));
        }
        if min >= max {
            return Err(IndexError::invalid(format!(
                "scale min ({min}) must be below max ({max})"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Distance from the midpoint to either bound.
    pub fn half_range(&self) -> f64 {
        self.max - self.midpoint()
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, rating: f64) -> bool {
        rating >= self.min && rating <= self.max
    }

    /// Rating seen from the opposite pole: `max - rating + 1`.
    ///
    /// Applying it twice returns the original rating.
    pub fn mirror(&self, rating: f64) -> f64 {
        self.max - rating + 1.0
    }
}

/// A bipolar construct, one grid row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Construct {
    pub left: String,
    pub right: String,
}

impl Construct {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Same construct with its poles swapped.
    pub fn inverted(&self) -> Self {
        Self {
            left: self.right.clone(),
            right: self.left.clone(),
        }
    }
}

/// A rated element, one grid column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Read-only view of a grid.
pub trait GridAccessor {
    /// Ratings, constructs as rows and elements as columns.
    fn rating_matrix(&self) -> &DMatrix<f64>;

    fn scale(&self) -> Scale;

    fn construct_count(&self) -> usize {
        self.rating_matrix().nrows()
    }

    fn element_count(&self) -> usize {
        self.rating_matrix().ncols()
    }

    /// `(left pole, right pole)` per construct, truncated to `trim` characters.
    fn construct_labels(&self, trim: Option<usize>) -> Vec<(String, String)>;

    /// Element names, truncated to `trim` characters.
    fn element_labels(&self, trim: Option<usize>) -> Vec<String>;

    /// Copy of the grid without the given element columns.
    fn subgrid(&self, excluded_elements: &[usize]) -> Result<Grid, IndexError>;
}

/// Serialized grid layout (JSON input).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub scale: Scale,
    pub elements: Vec<String>,
    pub constructs: Vec<Construct>,
    /// One row per construct, one value per element.
    pub ratings: Vec<Vec<f64>>,
}

/// In-memory grid with validated ratings.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    ratings: DMatrix<f64>,
    scale: Scale,
    constructs: Vec<Construct>,
    elements: Vec<Element>,
}

impl Grid {
    pub fn new(
        ratings: DMatrix<f64>,
        scale: Scale,
        constructs: Vec<Construct>,
        elements: Vec<Element>,
    ) -> Result<Self, IndexError> {
        let scale = Scale::new(scale.min, scale.max)?;
        if ratings.nrows() == 0 || ratings.ncols() == 0 {
            return Err(IndexError::invalid(
                "grid must contain at least one construct and one element",
            ));
        }
        if constructs.len() != ratings.nrows() {
            return Err(IndexError::invalid(format!(
                "{} construct labels for {} rating rows",
                constructs.len(),
                ratings.nrows()
            )));
        }
        if elements.len() != ratings.ncols() {
            return Err(IndexError::invalid(format!(
                "{} element labels for {} rating columns",
                elements.len(),
                ratings.ncols()
            )));
        }
        check_ratings(&ratings, scale)?;
        Ok(Self {
            ratings,
            scale,
            constructs,
            elements,
        })
    }

    /// Build from row vectors (one per construct).
    pub fn from_rows(
        scale: Scale,
        constructs: Vec<Construct>,
        elements: Vec<Element>,
        rows: &[Vec<f64>],
    ) -> Result<Self, IndexError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map(Vec::len).unwrap_or(0);
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_cols) {
            return Err(IndexError::invalid(format!(
                "rating row {idx} has {} values, expected {n_cols}",
                row.len()
            )));
        }
        let ratings = DMatrix::from_fn(n_rows, n_cols, |i, j| rows[i][j]);
        Self::new(ratings, scale, constructs, elements)
    }

    pub fn from_spec(spec: GridSpec) -> Result<Self, IndexError> {
        let elements = spec.elements.into_iter().map(Element::new).collect();
        Self::from_rows(spec.scale, spec.constructs, elements, &spec.ratings)
    }

    /// Parse a JSON [`GridSpec`]. Malformed JSON is an invalid grid, not an I/O failure.
    pub fn from_json_str(raw: &str) -> Result<Self, IndexError> {
        let spec: GridSpec = serde_json::from_str(raw)
            .map_err(|e| IndexError::invalid(format!("not a grid document: {e}")))?;
        Self::from_spec(spec)
    }

    pub fn to_spec(&self) -> GridSpec {
        GridSpec {
            scale: self.scale,
            elements: self.elements.iter().map(|e| e.name.clone()).collect(),
            constructs: self.constructs.clone(),
            ratings: (0..self.ratings.nrows())
                .map(|i| self.ratings.row(i).iter().copied().collect())
                .collect(),
        }
    }

    pub fn constructs(&self) -> &[Construct] {
        &self.constructs
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn rating(&self, construct: usize, element: usize) -> f64 {
        self.ratings[(construct, element)]
    }
}

impl GridAccessor for Grid {
    fn rating_matrix(&self) -> &DMatrix<f64> {
        &self.ratings
    }

    fn scale(&self) -> Scale {
        self.scale
    }

    fn construct_labels(&self, trim: Option<usize>) -> Vec<(String, String)> {
        self.constructs
            .iter()
            .map(|c| (trim_label(&c.left, trim), trim_label(&c.right, trim)))
            .collect()
    }

    fn element_labels(&self, trim: Option<usize>) -> Vec<String> {
        self.elements
            .iter()
            .map(|e| trim_label(&e.name, trim))
            .collect()
    }

    fn subgrid(&self, excluded_elements: &[usize]) -> Result<Grid, IndexError> {
        let n = self.elements.len();
        if let Some(&bad) = excluded_elements.iter().find(|&&e| e >= n) {
            return Err(IndexError::invalid(format!(
                "element index {bad} out of range (grid has {n} elements)"
            )));
        }
        let keep: Vec<usize> = (0..n).filter(|e| !excluded_elements.contains(e)).collect();
        if keep.is_empty() {
            return Err(IndexError::invalid("subgrid would contain no elements"));
        }
        let ratings = DMatrix::from_fn(self.ratings.nrows(), keep.len(), |i, j| {
            self.ratings[(i, keep[j])]
        });
        Ok(Grid {
            ratings,
            scale: self.scale,
            constructs: self.constructs.clone(),
            elements: keep.iter().map(|&e| self.elements[e].clone()).collect(),
        })
    }
}

pub fn trim_label(label: &str, trim: Option<usize>) -> String {
    match trim {
        Some(n) => label.chars().take(n).collect(),
        None => label.to_string(),
    }
}

fn check_ratings(ratings: &DMatrix<f64>, scale: Scale) -> Result<(), IndexError> {
    for i in 0..ratings.nrows() {
        for j in 0..ratings.ncols() {
            let r = ratings[(i, j)];
            if !r.is_finite() {
                return Err(IndexError::invalid(format!(
                    "rating at construct {i}, element {j} is not finite"
                )));
            }
            if !scale.contains(r) {
                return Err(IndexError::invalid(format!(
                    "rating {r} at construct {i}, element {j} outside scale [{}, {}]",
                    scale.min, scale.max
                )));
            }
        }
    }
    Ok(())
}

/// Re-check an arbitrary accessor before computing on it.
pub(crate) fn check_grid<G: GridAccessor + ?Sized>(grid: &G) -> Result<(), IndexError> {
    let scale = grid.scale();
    Scale::new(scale.min, scale.max)?;
    let ratings = grid.rating_matrix();
    if ratings.nrows() == 0 || ratings.ncols() == 0 {
        return Err(IndexError::invalid("grid has no ratings"));
    }
    check_ratings(ratings, scale)
}

/// Validate the grid and require minimum dimensions for `index`.
pub(crate) fn require_dims<G: GridAccessor + ?Sized>(
    grid: &G,
    index: &'static str,
    min_constructs: usize,
    min_elements: usize,
) -> Result<(), IndexError> {
    check_grid(grid)?;
    let nc = grid.construct_count();
    if nc < min_constructs {
        return Err(IndexError::too_few_constructs(index, min_constructs, nc));
    }
    let ne = grid.element_count();
    if ne < min_elements {
        return Err(IndexError::too_few_elements(index, min_elements, ne));
    }
    Ok(())
}
