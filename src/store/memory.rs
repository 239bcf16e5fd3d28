use super::RuleStore;
use crate::error::Result;
use crate::models::{
    normalize_crop_name, sort_rules, Crop, DecisionRule, GddBand, GrowthStage, ReferenceData,
    VarietyType,
};
use async_trait::async_trait;
use std::collections::HashMap;

/// Rule store held entirely in memory. Backs the `file` store backend and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRuleStore {
    crops: Vec<Crop>,
    stages: Vec<GrowthStage>,
    rules: Vec<DecisionRule>,
    bands: Vec<GddBand>,
    next_id: i64,
}

impl InMemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_reference_data(data: &ReferenceData) -> Self {
        let mut store = Self::new();

        for entry in &data.crops {
            let crop_id = store.add_crop(
                &entry.name,
                &entry.display_name(),
                entry.base_temp_celsius,
                entry.cap_temp_celsius,
            );

            let mut stage_ids = HashMap::new();
            for stage in &entry.stages {
                let stage_id = store.add_stage(crop_id, &stage.name, stage.order);
                stage_ids.insert(stage.order, stage_id);
                for band in &stage.gdd {
                    store.add_gdd_band(crop_id, stage_id, band.variety, band.min, band.upper());
                }
            }

            for rule in &entry.rules {
                let Some(&stage_id) = stage_ids.get(&rule.stage) else {
                    tracing::warn!(
                        crop = %entry.name,
                        stage = rule.stage,
                        "Rule references unknown growth stage, skipping"
                    );
                    continue;
                };
                store.push_rule(DecisionRule {
                    id: 0,
                    crop_id,
                    growth_stage_id: stage_id,
                    parameter: rule.parameter,
                    condition: rule.condition,
                    units: rule.units.clone(),
                    range_min: rule.range.clone(),
                    range_max: rule.range_max.clone(),
                    message: rule.message.clone(),
                });
            }
        }

        store
    }

    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn add_crop(
        &mut self,
        name: &str,
        display_name: &str,
        base_temp_celsius: f64,
        cap_temp_celsius: f64,
    ) -> i64 {
        let id = self.next_id();
        self.crops.push(Crop {
            id,
            name: normalize_crop_name(name),
            display_name: display_name.to_string(),
            base_temp_celsius,
            cap_temp_celsius,
        });
        id
    }

    pub fn add_stage(&mut self, crop_id: i64, name: &str, order: i32) -> i64 {
        let id = self.next_id();
        self.stages.push(GrowthStage {
            id,
            crop_id,
            name: name.to_string(),
            order,
        });
        id
    }

    /// Store a rule, assigning it a fresh id.
    pub fn push_rule(&mut self, mut rule: DecisionRule) -> i64 {
        let id = self.next_id();
        rule.id = id;
        self.rules.push(rule);
        id
    }

    pub fn add_gdd_band(
        &mut self,
        crop_id: i64,
        stage_id: i64,
        variety: VarietyType,
        gdd_min: f64,
        gdd_max: f64,
    ) {
        let Some(stage) = self.stages.iter().find(|s| s.id == stage_id).cloned() else {
            tracing::warn!(stage_id, "GDD band for unknown growth stage, skipping");
            return;
        };
        self.bands.push(GddBand {
            crop_id,
            variety,
            stage,
            gdd_min,
            gdd_max,
        });
    }

    fn stages_for(&self, crop_id: i64) -> Vec<GrowthStage> {
        let mut stages: Vec<GrowthStage> = self
            .stages
            .iter()
            .filter(|s| s.crop_id == crop_id)
            .cloned()
            .collect();
        stages.sort_by_key(|s| s.order);
        stages
    }
}

#[async_trait]
impl RuleStore for InMemoryRuleStore {
    async fn find_crop(&self, name: &str) -> Result<Option<Crop>> {
        Ok(self.crops.iter().find(|c| c.name == name).cloned())
    }

    async fn find_growth_stage(&self, crop_id: i64, order: i32) -> Result<Option<GrowthStage>> {
        Ok(self
            .stages
            .iter()
            .find(|s| s.crop_id == crop_id && s.order == order)
            .cloned())
    }

    async fn list_rules(&self, crop_id: i64, stage_id: i64) -> Result<Vec<DecisionRule>> {
        let mut rules: Vec<DecisionRule> = self
            .rules
            .iter()
            .filter(|r| r.crop_id == crop_id && r.growth_stage_id == stage_id)
            .cloned()
            .collect();
        sort_rules(&mut rules);
        Ok(rules)
    }

    async fn list_gdd_bands(&self, crop_id: i64, variety: VarietyType) -> Result<Vec<GddBand>> {
        Ok(self
            .bands
            .iter()
            .filter(|b| b.crop_id == crop_id && b.variety == variety)
            .cloned()
            .collect())
    }

    async fn list_stages_by_order_desc(&self, crop_id: i64) -> Result<Vec<GrowthStage>> {
        let mut stages = self.stages_for(crop_id);
        stages.reverse();
        Ok(stages)
    }

    async fn list_stages(&self, crop_id: i64) -> Result<Vec<GrowthStage>> {
        Ok(self.stages_for(crop_id))
    }

    async fn list_crops(&self) -> Result<Vec<Crop>> {
        let mut crops = self.crops.clone();
        crops.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(crops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConditionKind, Parameter};

    fn sample() -> InMemoryRuleStore {
        let yaml = r#"
crops:
  - name: Sorghum
    stages:
      - { name: Emergence, order: 1 }
  - name: Maize
    stages:
      - name: Vegetative
        order: 3
        gdd:
          - { variety: Early, min: 301, max: 700 }
      - name: Germination
        order: 1
        gdd:
          - { variety: Early, min: 0, max: 300 }
    rules:
      - { stage: 3, parameter: Temperature, condition: low, units: "°C", range: "<10", message: "Cold." }
      - { stage: 3, parameter: Precipitation, condition: low, units: mm, range: "<5", message: "Dry." }
"#;
        InMemoryRuleStore::from_reference_data(&ReferenceData::from_yaml_str(yaml).unwrap())
    }

    #[tokio::test]
    async fn finds_crop_by_lowercase_key() {
        let store = sample();
        let maize = store.find_crop("maize").await.unwrap().unwrap();
        assert_eq!(maize.display_name, "Maize");
        assert!(store.find_crop("Maize").await.unwrap().is_none());
        assert!(store.find_crop("wheat").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lists_stages_in_both_orders() {
        let store = sample();
        let maize = store.find_crop("maize").await.unwrap().unwrap();

        let asc: Vec<i32> = store
            .list_stages(maize.id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.order)
            .collect();
        assert_eq!(asc, vec![1, 3]);

        let desc: Vec<i32> = store
            .list_stages_by_order_desc(maize.id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.order)
            .collect();
        assert_eq!(desc, vec![3, 1]);
    }

    #[tokio::test]
    async fn rules_are_ordered_by_parameter() {
        let store = sample();
        let maize = store.find_crop("maize").await.unwrap().unwrap();
        let stage = store.find_growth_stage(maize.id, 3).await.unwrap().unwrap();
        let rules = store.list_rules(maize.id, stage.id).await.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].parameter, Parameter::Precipitation);
        assert_eq!(rules[1].parameter, Parameter::Temperature);
        assert_eq!(rules[1].condition, ConditionKind::Low);
    }

    #[tokio::test]
    async fn gdd_bands_carry_their_stage() {
        let store = sample();
        let maize = store.find_crop("maize").await.unwrap().unwrap();
        let bands = store
            .list_gdd_bands(maize.id, VarietyType::Early)
            .await
            .unwrap();
        assert_eq!(bands.len(), 2);
        assert!(bands.iter().any(|b| b.stage.name == "Vegetative" && b.gdd_min == 301.0));
        assert!(store
            .list_gdd_bands(maize.id, VarietyType::Late)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn crops_are_listed_by_display_name() {
        let store = sample();
        let names: Vec<String> = store
            .list_crops()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["maize", "sorghum"]);
    }
}
