//! Index configuration file and its conversion into per-index options.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::basic::BasicOptions;
use crate::conflict::{DetailSelection, MagnitudeOptions, TriangleOptions};
use crate::correlation::ElementCoefficient;
use crate::dilemma::{CorrelationBasis, DifferenceMode, DilemmaOptions};
use crate::error::ConfigError;
use crate::intensity::IntensityOptions;

pub const DEFAULT_DIGITS: u32 = 2;
const MAX_DIGITS: u32 = 12;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BasicSection {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConflictSection {
    pub crit: Option<f64>,
    pub power: Option<f64>,
    pub element_detail: Option<DetailSelection>,
    pub construct_detail: Option<DetailSelection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntensitySection {
    pub coefficient: Option<ElementCoefficient>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DilemmaSection {
    #[serde(rename = "self")]
    pub self_element: Option<usize>,
    #[serde(rename = "ideal")]
    pub ideal_element: Option<usize>,
    /// 0 = midpoint, 1 = difference.
    pub mode: Option<i64>,
    pub diff_congruent: Option<f64>,
    pub diff_discrepant: Option<f64>,
    pub r_min: Option<f64>,
    /// Judge pairs on correlations without the self and ideal elements.
    pub exclude: Option<bool>,
}

/// Settings for every index, as read from a JSON config file.
///
/// Every field is optional; absent values fall back to the per-index
/// defaults. Command-line flags are applied on top before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    pub digits: Option<u32>,
    pub trim: Option<usize>,
    pub basic: BasicSection,
    pub conflict: ConflictSection,
    pub intensity: IntensitySection,
    pub dilemma: DilemmaSection,
}

impl IndexConfig {
    pub fn digits(&self) -> u32 {
        self.digits.unwrap_or(DEFAULT_DIGITS)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(d) = self.digits {
            if d > MAX_DIGITS {
                return Err(ConfigError::invalid(
                    "digits",
                    format!("must be <= {MAX_DIGITS}, got {d}"),
                ));
            }
        }
        if let Some(0) = self.trim {
            return Err(ConfigError::invalid("trim", "must be >= 1"));
        }
        if let (Some(min), Some(max)) = (self.basic.min, self.basic.max) {
            if min >= max {
                return Err(ConfigError::invalid(
                    "basic.min",
                    format!("must be below basic.max ({min} vs {max})"),
                ));
            }
        }
        if let Some(crit) = self.conflict.crit {
            if !crit.is_finite() || crit < 0.0 {
                return Err(ConfigError::invalid("conflict.crit", "must be >= 0"));
            }
        }
        if let Some(power) = self.conflict.power {
            if !power.is_finite() || power < 1.0 {
                return Err(ConfigError::invalid("conflict.power", "must be >= 1"));
            }
        }
        let d = &self.dilemma;
        if let Some(mode) = d.mode {
            DifferenceMode::try_from(mode)?;
        }
        if let Some(r) = d.r_min {
            if !(-1.0..=1.0).contains(&r) {
                return Err(ConfigError::invalid("dilemma.r_min", "must be in [-1,1]"));
            }
        }
        for (field, value) in [
            ("dilemma.diff_congruent", d.diff_congruent),
            ("dilemma.diff_discrepant", d.diff_discrepant),
        ] {
            if let Some(v) = value {
                if v.is_nan() || v < 0.0 {
                    return Err(ConfigError::invalid(field, "must be >= 0"));
                }
            }
        }
        if let (Some(s), Some(i)) = (d.self_element, d.ideal_element) {
            if s == i {
                return Err(ConfigError::invalid(
                    "dilemma.ideal",
                    "must differ from dilemma.self",
                ));
            }
        }
        Ok(())
    }

    pub fn basic_options(&self) -> BasicOptions {
        BasicOptions {
            min: self.basic.min,
            max: self.basic.max,
            digits: Some(self.digits()),
        }
    }

    pub fn magnitude_options(&self) -> MagnitudeOptions {
        let mut opts = MagnitudeOptions::default();
        if let Some(crit) = self.conflict.crit {
            opts.crit = crit;
        }
        opts
    }

    pub fn triangle_options(&self) -> TriangleOptions {
        let mut opts = TriangleOptions::default();
        if let Some(power) = self.conflict.power {
            opts.power = power;
        }
        if let Some(sel) = &self.conflict.element_detail {
            opts.element_detail = sel.clone();
        }
        if let Some(sel) = &self.conflict.construct_detail {
            opts.construct_detail = sel.clone();
        }
        opts
    }

    pub fn intensity_options(&self) -> IntensityOptions {
        IntensityOptions {
            coefficient: self.intensity.coefficient.unwrap_or_default(),
        }
    }

    pub fn dilemma_options(&self) -> Result<DilemmaOptions, ConfigError> {
        let d = &self.dilemma;
        let mut opts = DilemmaOptions {
            self_element: d.self_element,
            ideal_element: d.ideal_element,
            diff_congruent: d.diff_congruent,
            diff_discrepant: d.diff_discrepant,
            ..DilemmaOptions::default()
        };
        if let Some(mode) = d.mode {
            opts.mode = DifferenceMode::try_from(mode)?;
        }
        if let Some(r) = d.r_min {
            opts.r_min = r;
        }
        if d.exclude == Some(true) {
            opts.basis = CorrelationBasis::Excluding;
        }
        Ok(opts)
    }
}

pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<IndexConfig, ConfigError> {
    let raw = std::fs::read_to_string(path.as_ref())?;
    let config: IndexConfig = serde_json::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexError;

    #[test]
    fn empty_config_yields_defaults() {
        let cfg: IndexConfig = serde_json::from_str("{}").unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.digits(), DEFAULT_DIGITS);
        assert_eq!(cfg.magnitude_options(), MagnitudeOptions::default());
        assert_eq!(cfg.triangle_options(), TriangleOptions::default());
        assert_eq!(cfg.dilemma_options().unwrap(), DilemmaOptions::default());
    }

    #[test]
    fn sections_map_onto_options() {
        let cfg: IndexConfig = serde_json::from_str(
            r#"{
                "digits": 3,
                "conflict": {"crit": 0.05, "power": 1, "element_detail": {"kind": "threshold", "value": 20}},
                "intensity": {"coefficient": "cohen_rc"},
                "dilemma": {"self": 1, "ideal": 0, "mode": 0, "r_min": 0.5, "exclude": true}
            }"#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.basic_options().digits, Some(3));
        assert_eq!(cfg.magnitude_options().crit, 0.05);
        let tri = cfg.triangle_options();
        assert_eq!(tri.power, 1.0);
        assert_eq!(tri.element_detail, DetailSelection::Threshold(20.0));
        assert_eq!(
            cfg.intensity_options().coefficient,
            ElementCoefficient::CohenRc
        );
        let dil = cfg.dilemma_options().unwrap();
        assert_eq!(dil.self_element, Some(1));
        assert_eq!(dil.mode, DifferenceMode::Midpoint);
        assert_eq!(dil.basis, CorrelationBasis::Excluding);
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let bad = [
            r#"{"digits": 13}"#,
            r#"{"conflict": {"crit": -0.1}}"#,
            r#"{"conflict": {"power": 0.5}}"#,
            r#"{"dilemma": {"r_min": 1.5}}"#,
            r#"{"dilemma": {"diff_congruent": -1}}"#,
            r#"{"dilemma": {"self": 2, "ideal": 2}}"#,
            r#"{"basic": {"min": 7, "max": 1}}"#,
        ];
        for raw in bad {
            let cfg: IndexConfig = serde_json::from_str(raw).unwrap();
            assert!(
                matches!(cfg.validate(), Err(ConfigError::Invalid { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn unknown_mode_is_an_index_error() {
        let cfg: IndexConfig = serde_json::from_str(r#"{"dilemma": {"mode": 3}}"#).unwrap();
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Index(IndexError::UnsupportedMode { mode: 3 }))
        ));
    }

    #[test]
    fn unknown_fields_fail_to_parse() {
        assert!(serde_json::from_str::<IndexConfig>(r#"{"digit": 2}"#).is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"trim": 10}"#).unwrap();
        let cfg = load_config_from_path(&path).unwrap();
        assert_eq!(cfg.trim, Some(10));
        assert!(matches!(
            load_config_from_path(dir.path().join("missing.json")),
            Err(ConfigError::Read(_))
        ));
    }
}
