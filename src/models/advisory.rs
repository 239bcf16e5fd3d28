use super::{ConditionKind, DecisionRule, GrowthStage, Parameter, VarietyType};
use serde::{Deserialize, Serialize};

/// A triggered rule, rendered for the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub parameter: Parameter,
    pub condition: ConditionKind,
    pub message: String,
}

impl From<&DecisionRule> for Advisory {
    fn from(rule: &DecisionRule) -> Self {
        Self {
            parameter: rule.parameter,
            condition: rule.condition,
            message: rule.message.clone(),
        }
    }
}

/// Response body for an advisory request.
#[derive(Debug, Clone, Serialize)]
pub struct AdvisoryReport {
    pub crop: String,
    pub growth_stage_order: i32,
    pub variety_type: VarietyType,
    pub recommendations: Vec<Advisory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AdvisoryReport {
    pub fn new(
        crop: &str,
        growth_stage_order: i32,
        variety_type: VarietyType,
        recommendations: Vec<Advisory>,
    ) -> Self {
        let (summary, message) = if recommendations.is_empty() {
            (
                None,
                Some(
                    "No matching decision tree rules found for the provided weather conditions."
                        .to_string(),
                ),
            )
        } else {
            (
                Some(format!(
                    "Found {} recommendation(s) based on weather conditions.",
                    recommendations.len()
                )),
                None,
            )
        };

        Self {
            crop: crop.to_string(),
            growth_stage_order,
            variety_type,
            recommendations,
            summary,
            message,
        }
    }
}

/// Response body for a growth stage lookup.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub crop: String,
    pub variety_type: VarietyType,
    pub accumulated_gdd: f64,
    pub growth_stage: String,
    pub growth_stage_order: i32,
}

impl StageReport {
    pub fn new(
        crop: &str,
        variety_type: VarietyType,
        accumulated_gdd: f64,
        stage: &GrowthStage,
    ) -> Self {
        Self {
            crop: crop.to_string(),
            variety_type,
            accumulated_gdd,
            growth_stage: stage.name.clone(),
            growth_stage_order: stage.order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_carries_no_match_message() {
        let report = AdvisoryReport::new("maize", 3, VarietyType::Early, Vec::new());
        assert!(report.summary.is_none());
        assert!(report.message.unwrap().contains("No matching"));
    }

    #[test]
    fn report_summary_counts_recommendations() {
        let advisories = vec![Advisory {
            parameter: Parameter::Precipitation,
            condition: ConditionKind::Low,
            message: "Irrigate if possible.".into(),
        }];
        let report = AdvisoryReport::new("maize", 3, VarietyType::Mid, advisories);
        assert_eq!(
            report.summary.as_deref(),
            Some("Found 1 recommendation(s) based on weather conditions.")
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["recommendations"][0]["parameter"], "Precipitation");
        assert_eq!(json["recommendations"][0]["condition"], "low");
        assert_eq!(json["variety_type"], "Mid");
        assert!(json.get("message").is_none());
    }
}
