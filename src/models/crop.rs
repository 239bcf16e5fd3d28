use serde::{Deserialize, Serialize};

/// Maturity class of a cultivar. Shifts the GDD-to-stage mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarietyType {
    #[default]
    Early,
    Mid,
    Late,
}

impl VarietyType {
    pub const ALL: [VarietyType; 3] = [VarietyType::Early, VarietyType::Mid, VarietyType::Late];

    pub fn as_str(&self) -> &'static str {
        match self {
            VarietyType::Early => "Early",
            VarietyType::Mid => "Mid",
            VarietyType::Late => "Late",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "early" => Some(VarietyType::Early),
            "mid" | "medium" => Some(VarietyType::Mid),
            "late" => Some(VarietyType::Late),
            _ => None,
        }
    }
}

impl std::fmt::Display for VarietyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub id: i64,
    /// Lowercase lookup key, e.g. `maize`
    pub name: String,
    pub display_name: String,
    pub base_temp_celsius: f64,
    pub cap_temp_celsius: f64,
}

/// Crops are keyed by lowercase name.
pub fn normalize_crop_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthStage {
    pub id: i64,
    pub crop_id: i64,
    pub name: String,
    /// 1 = earliest. Unique within a crop.
    pub order: i32,
}

/// Inclusive range of accumulated heat units covered by one stage for one variety.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GddBand {
    pub crop_id: i64,
    pub variety: VarietyType,
    pub stage: GrowthStage,
    pub gdd_min: f64,
    pub gdd_max: f64,
}

impl GddBand {
    pub fn contains(&self, accumulated_gdd: f64) -> bool {
        accumulated_gdd >= self.gdd_min && accumulated_gdd <= self.gdd_max
    }
}
