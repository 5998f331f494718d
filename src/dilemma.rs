//! Implicative dilemmas.
//!
//! Every construct is classified as congruent (self already close to ideal),
//! discrepant (self far from ideal) or neither. A pair made of one congruent
//! and one discrepant construct is an implicative dilemma when the two are
//! correlated strongly enough that moving towards the ideal on the discrepant
//! construct would drag the congruent one away from it.
//!
//! Before correlating a pair, both constructs are oriented so that the self
//! ratings fall on the same side of the scale midpoint; the construct whose
//! self rating sits below the midpoint is read from its opposite pole.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::correlation::{construct_correlation, construct_pair_correlation, CorrelationMatrix};
use crate::error::IndexError;
use crate::grid::{require_dims, GridAccessor, Scale};
use crate::stats::choose;

/// How self/ideal ratings are turned into a construct classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceMode {
    /// Selector 0: which side of the midpoint self and ideal fall on.
    Midpoint,
    /// Selector 1: absolute self/ideal difference against two thresholds.
    Difference,
}

impl DifferenceMode {
    pub fn selector(self) -> i64 {
        match self {
            DifferenceMode::Midpoint => 0,
            DifferenceMode::Difference => 1,
        }
    }
}

impl TryFrom<i64> for DifferenceMode {
    type Error = IndexError;

    fn try_from(mode: i64) -> Result<Self, Self::Error> {
        match mode {
            0 => Ok(DifferenceMode::Midpoint),
            1 => Ok(DifferenceMode::Difference),
            other => Err(IndexError::UnsupportedMode { mode: other }),
        }
    }
}

/// Which correlations decide whether a pair is a dilemma.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationBasis {
    /// Correlations over all elements.
    #[default]
    Including,
    /// Correlations without the self and ideal elements.
    Excluding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructClass {
    Congruent,
    Discrepant,
    Neither,
}

/// How a construct pair is read before correlating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Self ratings already on the same side of the midpoint.
    Direct,
    /// First construct read from its opposite pole.
    InvertFirst,
    /// Second construct read from its opposite pole.
    InvertSecond,
}

impl Orientation {
    fn inverts_first(self) -> bool {
        self == Orientation::InvertFirst
    }

    fn inverts_second(self) -> bool {
        self == Orientation::InvertSecond
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DilemmaOptions {
    /// Self element; the first element when `None`.
    pub self_element: Option<usize>,
    /// Ideal-self element; the last element when `None`.
    pub ideal_element: Option<usize>,
    pub mode: DifferenceMode,
    /// Largest self/ideal difference still congruent; `floor(range · 0.25)` when `None`.
    pub diff_congruent: Option<f64>,
    /// Smallest self/ideal difference counted as discrepant; `ceil(range · 0.6)` when `None`.
    pub diff_discrepant: Option<f64>,
    /// Minimum correlation for a pair to count as a dilemma.
    pub r_min: f64,
    pub basis: CorrelationBasis,
}

impl Default for DilemmaOptions {
    fn default() -> Self {
        Self {
            self_element: None,
            ideal_element: None,
            mode: DifferenceMode::Difference,
            diff_congruent: None,
            diff_discrepant: None,
            r_min: 0.35,
            basis: CorrelationBasis::Including,
        }
    }
}

/// Difference thresholds, explicit or derived from the scale range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub congruent: f64,
    pub discrepant: f64,
}

impl Thresholds {
    pub fn from_scale(scale: Scale) -> Self {
        let range = scale.range();
        Self {
            congruent: (range * 0.25).floor(),
            discrepant: (range * 0.6).ceil(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstructAssessment {
    pub index: usize,
    pub left: String,
    pub right: String,
    pub self_rating: f64,
    pub ideal_rating: f64,
    pub difference: f64,
    pub class: ConstructClass,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DilemmaCandidate {
    pub first: usize,
    pub second: usize,
    pub first_class: ConstructClass,
    pub second_class: ConstructClass,
    pub orientation: Orientation,
    /// Correlation over all elements, after orientation.
    pub r_including: f64,
    /// Correlation without self and ideal; `None` when not available.
    pub r_excluding: Option<f64>,
    pub qualifies: bool,
}

/// A construct as shown in a dilemma, after any pole inversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrientedConstruct {
    pub index: usize,
    pub left: String,
    pub right: String,
    pub inverted: bool,
    pub self_rating: f64,
    pub ideal_rating: f64,
}

impl OrientedConstruct {
    fn new(assessment: &ConstructAssessment, inverted: bool, scale: Scale) -> Self {
        let plain = Self {
            index: assessment.index,
            left: assessment.left.clone(),
            right: assessment.right.clone(),
            inverted: false,
            self_rating: assessment.self_rating,
            ideal_rating: assessment.ideal_rating,
        };
        if inverted {
            plain.invert(scale)
        } else {
            plain
        }
    }

    /// Swap the poles and mirror the ratings. Inverting twice restores the original.
    pub fn invert(&self, scale: Scale) -> Self {
        Self {
            index: self.index,
            left: self.right.clone(),
            right: self.left.clone(),
            inverted: !self.inverted,
            self_rating: scale.mirror(self.self_rating),
            ideal_rating: scale.mirror(self.ideal_rating),
        }
    }
}

/// A detected dilemma: the congruent construct on the left, the discrepant
/// one on the right.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DilemmaPair {
    pub congruent: OrientedConstruct,
    pub discrepant: OrientedConstruct,
    pub r_including: f64,
    pub r_excluding: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DilemmaResult {
    pub self_element: usize,
    pub ideal_element: usize,
    pub midpoint: f64,
    pub mode: DifferenceMode,
    pub thresholds: Thresholds,
    pub r_min: f64,
    pub basis: CorrelationBasis,
    pub constructs: Vec<ConstructAssessment>,
    pub candidates: Vec<DilemmaCandidate>,
    pub dilemmas: Vec<DilemmaPair>,
    pub congruent_count: usize,
    pub discrepant_count: usize,
    /// Dilemmas as a percentage of all construct pairs.
    pub pid_percent: f64,
}

/// Classify a construct from its self and ideal ratings.
pub fn classify(
    self_rating: f64,
    ideal_rating: f64,
    midpoint: f64,
    mode: DifferenceMode,
    thresholds: Thresholds,
) -> ConstructClass {
    match mode {
        DifferenceMode::Difference => {
            let diff = (self_rating - ideal_rating).abs();
            let off_midpoint = self_rating != midpoint && ideal_rating != midpoint;
            if diff <= thresholds.congruent && off_midpoint {
                ConstructClass::Congruent
            } else if diff >= thresholds.discrepant {
                ConstructClass::Discrepant
            } else {
                ConstructClass::Neither
            }
        }
        DifferenceMode::Midpoint => {
            match (
                self_rating.partial_cmp(&midpoint),
                ideal_rating.partial_cmp(&midpoint),
            ) {
                (Some(Ordering::Greater), Some(Ordering::Greater))
                | (Some(Ordering::Less), Some(Ordering::Less)) => ConstructClass::Congruent,
                (Some(Ordering::Greater), Some(Ordering::Less))
                | (Some(Ordering::Less), Some(Ordering::Greater)) => ConstructClass::Discrepant,
                _ => ConstructClass::Neither,
            }
        }
    }
}

/// Decision table over the sides of the midpoint on which the two self
/// ratings fall. `None` when either sits exactly on the midpoint.
pub fn orientation(self_first: f64, self_second: f64, midpoint: f64) -> Option<Orientation> {
    match (
        self_first.partial_cmp(&midpoint)?,
        self_second.partial_cmp(&midpoint)?,
    ) {
        (Ordering::Equal, _) | (_, Ordering::Equal) => None,
        (Ordering::Greater, Ordering::Greater) | (Ordering::Less, Ordering::Less) => {
            Some(Orientation::Direct)
        }
        (Ordering::Greater, Ordering::Less) => Some(Orientation::InvertSecond),
        (Ordering::Less, Ordering::Greater) => Some(Orientation::InvertFirst),
    }
}

fn is_dilemma_pair(a: ConstructClass, b: ConstructClass) -> bool {
    matches!(
        (a, b),
        (ConstructClass::Congruent, ConstructClass::Discrepant)
            | (ConstructClass::Discrepant, ConstructClass::Congruent)
    )
}

fn resolve_elements<G: GridAccessor + ?Sized>(
    grid: &G,
    opts: &DilemmaOptions,
) -> Result<(usize, usize), IndexError> {
    let ne = grid.element_count();
    let self_element = opts.self_element.unwrap_or(0);
    let ideal_element = opts.ideal_element.unwrap_or(ne - 1);
    for (what, idx) in [("self", self_element), ("ideal", ideal_element)] {
        if idx >= ne {
            return Err(IndexError::invalid(format!(
                "{what} element {idx} out of range (grid has {ne} elements)"
            )));
        }
    }
    if self_element == ideal_element {
        return Err(IndexError::invalid(
            "self and ideal must be different elements",
        ));
    }
    Ok((self_element, ideal_element))
}

fn resolve_thresholds(scale: Scale, opts: &DilemmaOptions) -> Result<Thresholds, IndexError> {
    let derived = Thresholds::from_scale(scale);
    let thresholds = Thresholds {
        congruent: opts.diff_congruent.unwrap_or(derived.congruent),
        discrepant: opts.diff_discrepant.unwrap_or(derived.discrepant),
    };
    if [thresholds.congruent, thresholds.discrepant]
        .iter()
        .any(|t| t.is_nan() || *t < 0.0)
    {
        return Err(IndexError::invalid(
            "difference thresholds must be non-negative",
        ));
    }
    Ok(thresholds)
}

fn excluding_correlation<G: GridAccessor + ?Sized>(
    grid: &G,
    self_element: usize,
    ideal_element: usize,
) -> Result<Option<CorrelationMatrix>, IndexError> {
    if grid.element_count() < 4 {
        warn!("correlations excluding self and ideal need at least two other elements");
        return Ok(None);
    }
    let sub = grid.subgrid(&[self_element, ideal_element])?;
    Ok(Some(construct_correlation(&sub)?))
}

/// Detect implicative dilemmas between a self and an ideal-self element.
pub fn dilemmas<G: GridAccessor + ?Sized>(
    grid: &G,
    opts: &DilemmaOptions,
) -> Result<DilemmaResult, IndexError> {
    require_dims(grid, "dilemma", 2, 2)?;
    if !(-1.0..=1.0).contains(&opts.r_min) {
        return Err(IndexError::invalid(format!(
            "r_min must lie in [-1, 1], got {}",
            opts.r_min
        )));
    }
    let (self_element, ideal_element) = resolve_elements(grid, opts)?;
    let scale = grid.scale();
    let midpoint = scale.midpoint();
    let thresholds = resolve_thresholds(scale, opts)?;

    let ratings = grid.rating_matrix();
    let labels = grid.construct_labels(None);
    let constructs: Vec<ConstructAssessment> = labels
        .into_iter()
        .enumerate()
        .map(|(c, (left, right))| {
            let self_rating = ratings[(c, self_element)];
            let ideal_rating = ratings[(c, ideal_element)];
            ConstructAssessment {
                index: c,
                left,
                right,
                self_rating,
                ideal_rating,
                difference: (self_rating - ideal_rating).abs(),
                class: classify(self_rating, ideal_rating, midpoint, opts.mode, thresholds),
            }
        })
        .collect();

    let including = construct_correlation(grid)?;
    let excluding = excluding_correlation(grid, self_element, ideal_element)?;
    if opts.basis == CorrelationBasis::Excluding && excluding.is_none() {
        return Err(IndexError::too_few_elements(
            "dilemma (excluding self/ideal)",
            4,
            grid.element_count(),
        ));
    }

    let nc = constructs.len();
    let mut candidates = Vec::new();
    for first in 0..nc {
        for second in (first + 1)..nc {
            let a = &constructs[first];
            let b = &constructs[second];
            let Some(orient) = orientation(a.self_rating, b.self_rating, midpoint) else {
                continue;
            };

            let (r_including, r_excluding) = match orient {
                Orientation::Direct => (
                    including.get(first, second),
                    excluding.as_ref().map(|m| m.get(first, second)),
                ),
                Orientation::InvertFirst | Orientation::InvertSecond => {
                    let (fixed, mirrored) = if orient.inverts_first() {
                        (second, first)
                    } else {
                        (first, second)
                    };
                    let fixed_row: Vec<f64> = ratings.row(fixed).iter().copied().collect();
                    let r = construct_pair_correlation(grid, &fixed_row, mirrored, true);
                    // Not defined for inverted pairs.
                    (r, None)
                }
            };

            let criterion = match opts.basis {
                CorrelationBasis::Including => Some(r_including),
                CorrelationBasis::Excluding => r_excluding,
            };
            let qualifies = criterion.is_some_and(|r| r >= opts.r_min)
                && is_dilemma_pair(a.class, b.class);

            candidates.push(DilemmaCandidate {
                first,
                second,
                first_class: a.class,
                second_class: b.class,
                orientation: orient,
                r_including,
                r_excluding,
                qualifies,
            });
        }
    }

    let dilemmas: Vec<DilemmaPair> = candidates
        .iter()
        .filter(|c| c.qualifies)
        .map(|c| {
            let first = OrientedConstruct::new(
                &constructs[c.first],
                c.orientation.inverts_first(),
                scale,
            );
            let second = OrientedConstruct::new(
                &constructs[c.second],
                c.orientation.inverts_second(),
                scale,
            );
            let (congruent, discrepant) = if c.first_class == ConstructClass::Congruent {
                (first, second)
            } else {
                (second, first)
            };
            DilemmaPair {
                congruent,
                discrepant,
                r_including: c.r_including,
                r_excluding: c.r_excluding,
            }
        })
        .collect();

    let congruent_count = constructs
        .iter()
        .filter(|c| c.class == ConstructClass::Congruent)
        .count();
    let discrepant_count = constructs
        .iter()
        .filter(|c| c.class == ConstructClass::Discrepant)
        .count();
    let pairs = choose(nc, 2);
    let pid_percent = if pairs == 0 {
        0.0
    } else {
        dilemmas.len() as f64 / pairs as f64 * 100.0
    };

    debug!(
        congruent = congruent_count,
        discrepant = discrepant_count,
        candidates = candidates.len(),
        dilemmas = dilemmas.len(),
        "dilemma detection finished"
    );

    Ok(DilemmaResult {
        self_element,
        ideal_element,
        midpoint,
        mode: opts.mode,
        thresholds,
        r_min: opts.r_min,
        basis: opts.basis,
        constructs,
        candidates,
        dilemmas,
        congruent_count,
        discrepant_count,
        pid_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seven_point() -> Scale {
        Scale::new(1.0, 7.0).unwrap()
    }

    #[test]
    fn default_thresholds_follow_scale_range() {
        let t = Thresholds::from_scale(seven_point());
        assert_eq!(t.congruent, 1.0);
        assert_eq!(t.discrepant, 4.0);
        let t5 = Thresholds::from_scale(Scale::new(1.0, 5.0).unwrap());
        assert_eq!(t5.congruent, 1.0);
        assert_eq!(t5.discrepant, 3.0);
    }

    #[test]
    fn difference_mode_classification() {
        let t = Thresholds::from_scale(seven_point());
        let m = 4.0;
        assert_eq!(
            classify(2.0, 6.0, m, DifferenceMode::Difference, t),
            ConstructClass::Discrepant
        );
        assert_eq!(
            classify(3.0, 2.0, m, DifferenceMode::Difference, t),
            ConstructClass::Congruent
        );
        // ideal on the midpoint can never be congruent
        assert_eq!(
            classify(3.0, 4.0, m, DifferenceMode::Difference, t),
            ConstructClass::Neither
        );
        assert_eq!(
            classify(2.0, 4.0, m, DifferenceMode::Difference, t),
            ConstructClass::Neither
        );
    }

    #[test]
    fn midpoint_mode_classification() {
        let t = Thresholds::from_scale(seven_point());
        let m = 4.0;
        assert_eq!(
            classify(5.0, 7.0, m, DifferenceMode::Midpoint, t),
            ConstructClass::Congruent
        );
        assert_eq!(
            classify(1.0, 3.0, m, DifferenceMode::Midpoint, t),
            ConstructClass::Congruent
        );
        assert_eq!(
            classify(3.0, 5.0, m, DifferenceMode::Midpoint, t),
            ConstructClass::Discrepant
        );
        assert_eq!(
            classify(4.0, 7.0, m, DifferenceMode::Midpoint, t),
            ConstructClass::Neither
        );
    }

    #[test]
    fn orientation_decision_table() {
        assert_eq!(orientation(5.0, 6.0, 4.0), Some(Orientation::Direct));
        assert_eq!(orientation(2.0, 1.0, 4.0), Some(Orientation::Direct));
        assert_eq!(orientation(6.0, 2.0, 4.0), Some(Orientation::InvertSecond));
        assert_eq!(orientation(2.0, 6.0, 4.0), Some(Orientation::InvertFirst));
        assert_eq!(orientation(4.0, 6.0, 4.0), None);
        assert_eq!(orientation(2.0, 4.0, 4.0), None);
    }

    #[test]
    fn mode_selector_round_trips_and_rejects_unknown() {
        for mode in [DifferenceMode::Midpoint, DifferenceMode::Difference] {
            assert_eq!(DifferenceMode::try_from(mode.selector()).unwrap(), mode);
        }
        assert_eq!(
            DifferenceMode::try_from(2),
            Err(IndexError::UnsupportedMode { mode: 2 })
        );
    }

    #[test]
    fn oriented_construct_inversion_is_an_involution() {
        let a = ConstructAssessment {
            index: 0,
            left: "warm".into(),
            right: "cold".into(),
            self_rating: 2.0,
            ideal_rating: 6.0,
            difference: 4.0,
            class: ConstructClass::Discrepant,
        };
        let oc = OrientedConstruct::new(&a, true, seven_point());
        assert!(oc.inverted);
        assert_eq!(oc.left, "cold");
        assert_eq!(oc.self_rating, 6.0);
        assert_eq!(oc.ideal_rating, 2.0);
        let back = oc.invert(seven_point());
        assert_eq!(back, OrientedConstruct::new(&a, false, seven_point()));
    }
}
