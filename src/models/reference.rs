use super::{normalize_crop_name, ConditionKind, Parameter, VarietyType};
use crate::error::{CropwiseError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Width given to a GDD band whose upper bound is missing from the source sheet.
pub const DEFAULT_GDD_BAND_WIDTH: f64 = 50.0;

/// A complete set of decision tree reference data, as authored in YAML.
///
/// ```yaml
/// crops:
///   - name: Maize
///     base_temp_celsius: 10
///     cap_temp_celsius: 30
///     stages:
///       - name: Germination
///         order: 1
///         gdd:
///           - { variety: Early, min: 0, max: 100 }
///     rules:
///       - stage: 1
///         parameter: Precipitation
///         condition: low
///         units: mm
///         range: "<5"
///         message: "..."
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceData {
    pub crops: Vec<CropEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropEntry {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_base_temp")]
    pub base_temp_celsius: f64,
    #[serde(default = "default_cap_temp")]
    pub cap_temp_celsius: f64,
    pub stages: Vec<StageEntry>,
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

fn default_base_temp() -> f64 {
    10.0
}

fn default_cap_temp() -> f64 {
    30.0
}

impl CropEntry {
    pub fn key(&self) -> String {
        normalize_crop_name(&self.name)
    }

    pub fn display_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.name.trim().to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEntry {
    pub name: String,
    pub order: i32,
    #[serde(default)]
    pub gdd: Vec<BandEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandEntry {
    pub variety: VarietyType,
    pub min: f64,
    #[serde(default)]
    pub max: Option<f64>,
}

impl BandEntry {
    pub fn upper(&self) -> f64 {
        self.max.unwrap_or(self.min + DEFAULT_GDD_BAND_WIDTH)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
    /// Order of the growth stage this rule belongs to
    pub stage: i32,
    pub parameter: Parameter,
    pub condition: ConditionKind,
    #[serde(default)]
    pub units: String,
    pub range: String,
    #[serde(default)]
    pub range_max: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub crops: usize,
    pub growth_stages: usize,
    pub gdd_bands: usize,
    pub rules: usize,
}

impl ReferenceData {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let data: ReferenceData = serde_yaml::from_str(content)?;
        data.validate()?;
        Ok(data)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Check the invariants the rule store relies on.
    pub fn validate(&self) -> Result<()> {
        let mut crop_names = HashSet::new();

        for crop in &self.crops {
            let key = crop.key();
            if key.is_empty() {
                return Err(CropwiseError::InvalidData("crop with empty name".into()));
            }
            if !crop_names.insert(key.clone()) {
                return Err(CropwiseError::InvalidData(format!(
                    "duplicate crop '{}'",
                    key
                )));
            }

            let mut orders = HashSet::new();
            for stage in &crop.stages {
                if !orders.insert(stage.order) {
                    return Err(CropwiseError::InvalidData(format!(
                        "duplicate growth stage order {} for {}",
                        stage.order, key
                    )));
                }
                for band in &stage.gdd {
                    if band.upper() < band.min {
                        return Err(CropwiseError::InvalidData(format!(
                            "GDD band for {} stage {} ({}) has max below min",
                            key, stage.order, band.variety
                        )));
                    }
                }
            }

            for rule in &crop.rules {
                if !orders.contains(&rule.stage) {
                    return Err(CropwiseError::InvalidData(format!(
                        "rule for {} references unknown growth stage {}",
                        key, rule.stage
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn summary(&self) -> ImportSummary {
        let mut summary = ImportSummary {
            crops: self.crops.len(),
            ..Default::default()
        };
        for crop in &self.crops {
            summary.growth_stages += crop.stages.len();
            summary.gdd_bands += crop.stages.iter().map(|s| s.gdd.len()).sum::<usize>();
            summary.rules += crop.rules.len();
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
crops:
  - name: Maize
    stages:
      - name: Germination
        order: 1
        gdd:
          - { variety: Early, min: 0, max: 300 }
          - { variety: Late, min: 0 }
      - name: Establishment
        order: 2
    rules:
      - stage: 1
        parameter: Relative Humidity
        condition: high
        units: "%"
        range: ">90"
        message: "Scout for fungal disease."
"#;

    #[test]
    fn parses_sample_dataset() {
        let data = ReferenceData::from_yaml_str(SAMPLE).unwrap();
        let maize = &data.crops[0];
        assert_eq!(maize.key(), "maize");
        assert_eq!(maize.display_name(), "Maize");
        assert_eq!(maize.base_temp_celsius, 10.0);
        assert_eq!(maize.cap_temp_celsius, 30.0);
        assert_eq!(maize.rules[0].parameter, Parameter::RelativeHumidity);
        assert_eq!(maize.rules[0].condition, ConditionKind::High);
        assert_eq!(
            data.summary(),
            ImportSummary {
                crops: 1,
                growth_stages: 2,
                gdd_bands: 2,
                rules: 1
            }
        );
    }

    #[test]
    fn band_without_max_gets_default_width() {
        let data = ReferenceData::from_yaml_str(SAMPLE).unwrap();
        let bands = &data.crops[0].stages[0].gdd;
        assert_eq!(bands[0].upper(), 300.0);
        assert_eq!(bands[1].upper(), 50.0);
    }

    #[test]
    fn rejects_duplicate_stage_order() {
        let yaml = r#"
crops:
  - name: maize
    stages:
      - { name: A, order: 1 }
      - { name: B, order: 1 }
"#;
        let err = ReferenceData::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, CropwiseError::InvalidData(_)));
    }

    #[test]
    fn rejects_duplicate_crop_names_case_insensitively() {
        let yaml = r#"
crops:
  - { name: Maize, stages: [] }
  - { name: maize, stages: [] }
"#;
        assert!(ReferenceData::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn rejects_rule_on_unknown_stage() {
        let yaml = r#"
crops:
  - name: maize
    stages:
      - { name: Germination, order: 1 }
    rules:
      - { stage: 4, parameter: Temperature, condition: low, range: "<10", message: "Cold." }
"#;
        let err = ReferenceData::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown growth stage 4"));
    }

    #[test]
    fn rejects_unknown_parameter_label() {
        let yaml = r#"
crops:
  - name: maize
    stages:
      - { name: Germination, order: 1 }
    rules:
      - { stage: 1, parameter: Wind, condition: low, range: "<10", message: "Calm." }
"#;
        assert!(matches!(
            ReferenceData::from_yaml_str(yaml),
            Err(CropwiseError::Yaml(_))
        ));
    }

    #[test]
    fn bundled_maize_dataset_is_valid() {
        let data = ReferenceData::from_yaml_str(include_str!("../../data/maize.yaml")).unwrap();
        let maize = &data.crops[0];
        assert_eq!(maize.key(), "maize");
        assert_eq!(maize.stages.len(), 6);
        assert!(maize
            .stages
            .iter()
            .all(|stage| stage.gdd.len() == VarietyType::ALL.len()));
    }
}
