use super::{growth_stage, matcher};
use crate::error::{CropwiseError, Result};
use crate::models::{
    normalize_crop_name, Advisory, Crop, GrowthStage, VarietyType, WeatherReading,
};
use crate::store::RuleStore;

/// Evaluates decision tree rules for a crop against weather readings.
///
/// Holds its rule store explicitly; every call fetches a fresh snapshot of
/// reference rows and keeps no state between calls.
pub struct Advisor<S> {
    store: S,
}

impl<S: RuleStore> Advisor<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Advisories triggered by `reading` for a crop at a given growth stage.
    ///
    /// Rules on parameters missing from `reading` are skipped. An empty result
    /// means no threshold was crossed.
    pub async fn evaluate(
        &self,
        crop_name: &str,
        growth_stage_order: i32,
        variety: VarietyType,
        reading: &WeatherReading,
    ) -> Result<Vec<Advisory>> {
        let crop = self.require_crop(crop_name).await?;

        let stage = self
            .store
            .find_growth_stage(crop.id, growth_stage_order)
            .await?
            .ok_or_else(|| {
                CropwiseError::NotFound(format!(
                    "Growth stage {} not found for {}",
                    growth_stage_order, crop_name
                ))
            })?;

        let rules = self.store.list_rules(crop.id, stage.id).await?;

        tracing::debug!(
            crop = %crop.name,
            stage = %stage.name,
            variety = %variety,
            rules = rules.len(),
            "Evaluating decision tree"
        );

        let advisories: Vec<Advisory> = rules
            .iter()
            .filter(|rule| match reading.value_for(rule.parameter) {
                Some(value) => {
                    let matched = matcher::matches(rule, value);
                    tracing::trace!(
                        parameter = %rule.parameter,
                        condition = %rule.condition,
                        range = %rule.range_min,
                        value,
                        matched,
                        "Rule checked"
                    );
                    matched
                }
                None => false,
            })
            .map(Advisory::from)
            .collect();

        Ok(advisories)
    }

    /// Growth stage for an accumulated GDD total. `None` if the crop is unknown.
    pub async fn growth_stage(
        &self,
        crop_name: &str,
        variety: VarietyType,
        accumulated_gdd: f64,
    ) -> Result<Option<GrowthStage>> {
        let Some(crop) = self
            .store
            .find_crop(&normalize_crop_name(crop_name))
            .await?
        else {
            return Ok(None);
        };

        self.resolve(crop.id, variety, accumulated_gdd).await
    }

    pub async fn resolve(
        &self,
        crop_id: i64,
        variety: VarietyType,
        accumulated_gdd: f64,
    ) -> Result<Option<GrowthStage>> {
        growth_stage::resolve(&self.store, crop_id, variety, accumulated_gdd).await
    }

    pub async fn crops(&self) -> Result<Vec<Crop>> {
        self.store.list_crops().await
    }

    /// Growth stages of a crop, earliest first.
    pub async fn growth_stages(&self, crop_name: &str) -> Result<Vec<GrowthStage>> {
        let crop = self.require_crop(crop_name).await?;
        self.store.list_stages(crop.id).await
    }

    async fn require_crop(&self, crop_name: &str) -> Result<Crop> {
        self.store
            .find_crop(&normalize_crop_name(crop_name))
            .await?
            .ok_or_else(|| CropwiseError::NotFound(format!("Crop not found: {}", crop_name)))
    }
}
