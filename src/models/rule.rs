use serde::{Deserialize, Serialize};

/// Weather parameter a decision rule is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parameter {
    Precipitation,
    #[serde(rename = "Relative Humidity")]
    RelativeHumidity,
    Temperature,
    #[serde(rename = "P/PET")]
    PPet,
}

impl Parameter {
    pub const ALL: [Parameter; 4] = [
        Parameter::Precipitation,
        Parameter::RelativeHumidity,
        Parameter::Temperature,
        Parameter::PPet,
    ];

    /// Label as stored in the rule tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Precipitation => "Precipitation",
            Parameter::RelativeHumidity => "Relative Humidity",
            Parameter::Temperature => "Temperature",
            Parameter::PPet => "P/PET",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "precipitation" | "rainfall" => Some(Parameter::Precipitation),
            "relative humidity" | "relativehumidity" | "humidity" | "rh" => {
                Some(Parameter::RelativeHumidity)
            }
            "temperature" | "temp" => Some(Parameter::Temperature),
            "p/pet" | "ppet" | "p_pet" => Some(Parameter::PPet),
            _ => None,
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which side of a threshold a rule detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Low,
    Optimal,
    High,
}

impl ConditionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionKind::Low => "low",
            ConditionKind::Optimal => "optimal",
            ConditionKind::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(ConditionKind::Low),
            "optimal" => Some(ConditionKind::Optimal),
            "high" => Some(ConditionKind::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of a crop's decision tree for a single growth stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRule {
    pub id: i64,
    pub crop_id: i64,
    pub growth_stage_id: i64,
    pub parameter: Parameter,
    pub condition: ConditionKind,
    pub units: String,
    /// Range expression: `"10-20"`, `"<5"`, `">30"`, `"25+"`.
    pub range_min: String,
    /// Second bound string from the source sheet. Kept as data only.
    pub range_max: Option<String>,
    pub message: String,
}

/// Presentation order of rules: parameter label, then condition label.
pub fn sort_rules(rules: &mut [DecisionRule]) {
    rules.sort_by(|a, b| {
        a.parameter
            .as_str()
            .cmp(b.parameter.as_str())
            .then_with(|| a.condition.as_str().cmp(b.condition.as_str()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_from_str_accepts_stored_labels() {
        for parameter in Parameter::ALL {
            assert_eq!(
                Parameter::from_str(parameter.as_str()),
                Some(parameter),
                "Round-trip failed for {:?}",
                parameter
            );
        }
    }

    #[test]
    fn parameter_from_str_aliases() {
        assert_eq!(Parameter::from_str("humidity"), Some(Parameter::RelativeHumidity));
        assert_eq!(Parameter::from_str("p_pet"), Some(Parameter::PPet));
        assert_eq!(Parameter::from_str("wind"), None);
    }

    #[test]
    fn parameter_serializes_as_label() {
        let json = serde_json::to_string(&Parameter::PPet).unwrap();
        assert_eq!(json, "\"P/PET\"");
        let json = serde_json::to_string(&Parameter::RelativeHumidity).unwrap();
        assert_eq!(json, "\"Relative Humidity\"");
    }

    #[test]
    fn condition_kind_from_str() {
        assert_eq!(ConditionKind::from_str("LOW"), Some(ConditionKind::Low));
        assert_eq!(ConditionKind::from_str("optimal"), Some(ConditionKind::Optimal));
        assert_eq!(ConditionKind::from_str("high "), Some(ConditionKind::High));
        assert_eq!(ConditionKind::from_str("critical"), None);
    }

    fn rule(id: i64, parameter: Parameter, condition: ConditionKind) -> DecisionRule {
        DecisionRule {
            id,
            crop_id: 1,
            growth_stage_id: 1,
            parameter,
            condition,
            units: String::new(),
            range_min: "1-2".into(),
            range_max: None,
            message: String::new(),
        }
    }

    #[test]
    fn sort_rules_orders_by_labels() {
        let mut rules = vec![
            rule(1, Parameter::Temperature, ConditionKind::Low),
            rule(2, Parameter::PPet, ConditionKind::High),
            rule(3, Parameter::Precipitation, ConditionKind::Optimal),
            rule(4, Parameter::Precipitation, ConditionKind::High),
            rule(5, Parameter::RelativeHumidity, ConditionKind::Low),
        ];
        sort_rules(&mut rules);
        let ids: Vec<i64> = rules.iter().map(|r| r.id).collect();
        // "P/PET" < "Precipitation" < "Relative Humidity" < "Temperature"
        assert_eq!(ids, vec![2, 4, 3, 5, 1]);
    }
}
