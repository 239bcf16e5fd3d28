use crate::error::Result;
use crate::models::{GddBand, GrowthStage, VarietyType};
use crate::store::RuleStore;

/// Most advanced stage whose band covers `accumulated_gdd`, if any.
pub fn select_stage(bands: &[GddBand], accumulated_gdd: f64) -> Option<&GrowthStage> {
    bands
        .iter()
        .filter(|band| band.contains(accumulated_gdd))
        .map(|band| &band.stage)
        .max_by_key(|stage| stage.order)
}

/// Growth stage of a crop for an accumulated heat-unit total.
///
/// When no configured band covers the total (past every threshold, or no
/// bands for this variety) the crop is assumed fully mature and its last
/// stage is returned. `None` means the crop has no stages at all.
pub async fn resolve<S: RuleStore>(
    store: &S,
    crop_id: i64,
    variety: VarietyType,
    accumulated_gdd: f64,
) -> Result<Option<GrowthStage>> {
    let bands = store.list_gdd_bands(crop_id, variety).await?;

    if let Some(stage) = select_stage(&bands, accumulated_gdd) {
        tracing::debug!(
            crop_id,
            variety = %variety,
            accumulated_gdd,
            stage = %stage.name,
            "GDD band matched"
        );
        return Ok(Some(stage.clone()));
    }

    let fallback = store
        .list_stages_by_order_desc(crop_id)
        .await?
        .into_iter()
        .next();

    if let Some(ref stage) = fallback {
        tracing::debug!(
            crop_id,
            variety = %variety,
            accumulated_gdd,
            stage = %stage.name,
            "No GDD band matched, using final stage"
        );
    }

    Ok(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRuleStore;

    fn stage(id: i64, order: i32) -> GrowthStage {
        GrowthStage {
            id,
            crop_id: 1,
            name: format!("Stage {}", order),
            order,
        }
    }

    fn band(stage: GrowthStage, gdd_min: f64, gdd_max: f64) -> GddBand {
        GddBand {
            crop_id: 1,
            variety: VarietyType::Early,
            stage,
            gdd_min,
            gdd_max,
        }
    }

    #[test]
    fn select_stage_uses_inclusive_bounds() {
        let bands = vec![band(stage(1, 1), 0.0, 300.0), band(stage(2, 2), 301.0, 700.0)];
        assert_eq!(select_stage(&bands, 0.0).unwrap().order, 1);
        assert_eq!(select_stage(&bands, 300.0).unwrap().order, 1);
        assert_eq!(select_stage(&bands, 301.0).unwrap().order, 2);
        assert_eq!(select_stage(&bands, 700.0).unwrap().order, 2);
        assert!(select_stage(&bands, 300.5).is_none());
        assert!(select_stage(&bands, 1000.0).is_none());
    }

    #[test]
    fn select_stage_prefers_most_advanced_overlap() {
        let bands = vec![
            band(stage(3, 3), 400.0, 450.0),
            band(stage(1, 1), 0.0, 500.0),
            band(stage(2, 2), 350.0, 500.0),
        ];
        assert_eq!(select_stage(&bands, 420.0).unwrap().order, 3);
        assert_eq!(select_stage(&bands, 460.0).unwrap().order, 2);
        assert_eq!(select_stage(&bands, 100.0).unwrap().order, 1);
    }

    fn maize() -> (InMemoryRuleStore, i64) {
        let mut store = InMemoryRuleStore::new();
        let crop_id = store.add_crop("maize", "Maize", 10.0, 30.0);
        let germination = store.add_stage(crop_id, "Germination", 1);
        let establishment = store.add_stage(crop_id, "Establishment", 2);
        store.add_stage(crop_id, "Physiological Maturity", 6);
        store.add_gdd_band(crop_id, germination, VarietyType::Early, 0.0, 300.0);
        store.add_gdd_band(crop_id, establishment, VarietyType::Early, 301.0, 700.0);
        (store, crop_id)
    }

    #[tokio::test]
    async fn resolve_matches_configured_bands() {
        let (store, crop_id) = maize();
        let s = resolve(&store, crop_id, VarietyType::Early, 300.0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(s.name, "Germination");
        let s = resolve(&store, crop_id, VarietyType::Early, 301.0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(s.name, "Establishment");
    }

    #[tokio::test]
    async fn resolve_falls_back_to_final_stage() {
        let (store, crop_id) = maize();
        let s = resolve(&store, crop_id, VarietyType::Early, 1000.0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(s.order, 6);

        // No bands configured for Late at all
        let s = resolve(&store, crop_id, VarietyType::Late, 10.0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(s.order, 6);
    }

    #[tokio::test]
    async fn resolve_unknown_crop_is_none() {
        let (store, _) = maize();
        assert!(resolve(&store, 999, VarietyType::Early, 100.0)
            .await
            .unwrap()
            .is_none());
    }
}
