use crate::db::Database;
use crate::error::Result;
use crate::models::{
    ConditionKind, Crop, DecisionRule, GddBand, GrowthStage, Parameter, VarietyType,
};
use crate::store::RuleStore;
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use tracing::warn;

// Crop and growth stage queries

impl Database {
    pub fn find_crop_by_name(&self, name: &str) -> Result<Option<Crop>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM crops WHERE name = ?1",
                [name],
                row_to_crop,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn get_crops(&self) -> Result<Vec<Crop>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM crops ORDER BY display_name")?;
            let crops = stmt
                .query_map([], row_to_crop)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(crops)
        })
    }

    pub fn find_stage_by_order(&self, crop_id: i64, order: i32) -> Result<Option<GrowthStage>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM growth_stages WHERE crop_id = ?1 AND stage_order = ?2",
                params![crop_id, order],
                row_to_stage,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn get_stages(&self, crop_id: i64, descending: bool) -> Result<Vec<GrowthStage>> {
        let sql = if descending {
            "SELECT * FROM growth_stages WHERE crop_id = ?1 ORDER BY stage_order DESC"
        } else {
            "SELECT * FROM growth_stages WHERE crop_id = ?1 ORDER BY stage_order"
        };
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let stages = stmt
                .query_map([crop_id], row_to_stage)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(stages)
        })
    }
}

fn row_to_crop(row: &Row) -> rusqlite::Result<Crop> {
    Ok(Crop {
        id: row.get("id")?,
        name: row.get("name")?,
        display_name: row.get("display_name")?,
        base_temp_celsius: row.get("base_temp_celsius")?,
        cap_temp_celsius: row.get("cap_temp_celsius")?,
    })
}

fn row_to_stage(row: &Row) -> rusqlite::Result<GrowthStage> {
    Ok(GrowthStage {
        id: row.get("id")?,
        crop_id: row.get("crop_id")?,
        name: row.get("stage_name")?,
        order: row.get("stage_order")?,
    })
}

// Decision rule queries

impl Database {
    pub fn get_rules(&self, crop_id: i64, stage_id: i64) -> Result<Vec<DecisionRule>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, crop_id, growth_stage_id, parameter, condition_type, units,
                       range_min, range_max, message_english
                FROM decision_tree_rules
                WHERE crop_id = ?1 AND growth_stage_id = ?2
                ORDER BY parameter, condition_type
                "#,
            )?;
            let rows = stmt
                .query_map(params![crop_id, stage_id], row_to_rule)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows.into_iter().flatten().collect())
        })
    }
}

/// Rows with an unrecognised parameter or condition label are skipped.
fn row_to_rule(row: &Row) -> rusqlite::Result<Option<DecisionRule>> {
    let id: i64 = row.get("id")?;
    let parameter_str: String = row.get("parameter")?;
    let condition_str: String = row.get("condition_type")?;

    let Some(parameter) = Parameter::from_str(&parameter_str) else {
        warn!(rule_id = id, parameter = %parameter_str, "Unknown parameter in rule, skipping");
        return Ok(None);
    };
    let Some(condition) = ConditionKind::from_str(&condition_str) else {
        warn!(rule_id = id, condition = %condition_str, "Unknown condition in rule, skipping");
        return Ok(None);
    };

    Ok(Some(DecisionRule {
        id,
        crop_id: row.get("crop_id")?,
        growth_stage_id: row.get("growth_stage_id")?,
        parameter,
        condition,
        units: row.get("units")?,
        range_min: row.get("range_min")?,
        range_max: row.get("range_max")?,
        message: row.get("message_english")?,
    }))
}

// GDD band queries

impl Database {
    pub fn get_gdd_bands(&self, crop_id: i64, variety: VarietyType) -> Result<Vec<GddBand>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT gc.crop_id, gc.gdd_min, gc.gdd_max,
                       gs.id AS stage_id, gs.stage_name, gs.stage_order
                FROM gdd_configs gc
                JOIN growth_stages gs ON gs.id = gc.growth_stage_id
                WHERE gc.crop_id = ?1 AND gc.variety_type = ?2
                ORDER BY gs.stage_order
                "#,
            )?;
            let bands = stmt
                .query_map(params![crop_id, variety.as_str()], |row| {
                    let crop_id: i64 = row.get("crop_id")?;
                    Ok(GddBand {
                        crop_id,
                        variety,
                        stage: GrowthStage {
                            id: row.get("stage_id")?,
                            crop_id,
                            name: row.get("stage_name")?,
                            order: row.get("stage_order")?,
                        },
                        gdd_min: row.get("gdd_min")?,
                        gdd_max: row.get("gdd_max")?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(bands)
        })
    }
}

#[async_trait]
impl RuleStore for Database {
    async fn find_crop(&self, name: &str) -> Result<Option<Crop>> {
        self.find_crop_by_name(name)
    }

    async fn find_growth_stage(&self, crop_id: i64, order: i32) -> Result<Option<GrowthStage>> {
        self.find_stage_by_order(crop_id, order)
    }

    async fn list_rules(&self, crop_id: i64, stage_id: i64) -> Result<Vec<DecisionRule>> {
        self.get_rules(crop_id, stage_id)
    }

    async fn list_gdd_bands(&self, crop_id: i64, variety: VarietyType) -> Result<Vec<GddBand>> {
        self.get_gdd_bands(crop_id, variety)
    }

    async fn list_stages_by_order_desc(&self, crop_id: i64) -> Result<Vec<GrowthStage>> {
        self.get_stages(crop_id, true)
    }

    async fn list_stages(&self, crop_id: i64) -> Result<Vec<GrowthStage>> {
        self.get_stages(crop_id, false)
    }

    async fn list_crops(&self) -> Result<Vec<Crop>> {
        self.get_crops()
    }
}
