use crate::config::PostgresConfig;
use crate::error::{CropwiseError, Result};
use crate::models::{
    ConditionKind, Crop, DecisionRule, GddBand, GrowthStage, Parameter, VarietyType,
};
use crate::store::RuleStore;
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

/// Read-only rule store over a PostgreSQL database populated by the sheet import.
///
/// Expects the `crops`, `growth_stages`, `decision_tree_rules` and
/// `gdd_configs` tables keyed by integer ids (`SERIAL`/`BIGSERIAL`). Every id
/// is read through a `::BIGINT` cast, so a schema keyed by UUID or text ids
/// fails on the first query.
pub struct PgRuleStore {
    pool: PgPool,
}

impl PgRuleStore {
    /// Connect to a database whose tables use integer primary keys. See the
    /// type docs for the expected schema.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.connection_string())
            .await
            .map_err(|e| CropwiseError::DataSourceUnavailable(format!("PostgreSQL: {}", e)))?;

        Ok(Self { pool })
    }

    pub async fn test_connection(&self) -> Result<bool> {
        let result = sqlx::query("SELECT 1").fetch_one(&self.pool).await;

        Ok(result.is_ok())
    }
}

const CROP_COLUMNS: &str = r#"
    id::BIGINT AS id, name, display_name,
    base_temp_celsius::FLOAT8 AS base_temp_celsius,
    cap_temp_celsius::FLOAT8 AS cap_temp_celsius
"#;

const STAGE_COLUMNS: &str = r#"
    id::BIGINT AS id, crop_id::BIGINT AS crop_id, stage_name, stage_order::INT4 AS stage_order
"#;

fn row_to_crop(row: &PgRow) -> Result<Crop> {
    Ok(Crop {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        display_name: row.try_get("display_name")?,
        base_temp_celsius: row.try_get("base_temp_celsius")?,
        cap_temp_celsius: row.try_get("cap_temp_celsius")?,
    })
}

fn row_to_stage(row: &PgRow) -> Result<GrowthStage> {
    Ok(GrowthStage {
        id: row.try_get("id")?,
        crop_id: row.try_get("crop_id")?,
        name: row.try_get("stage_name")?,
        order: row.try_get("stage_order")?,
    })
}

fn row_to_rule(row: &PgRow) -> Result<Option<DecisionRule>> {
    let id: i64 = row.try_get("id")?;
    let parameter_str: String = row.try_get("parameter")?;
    let condition_str: String = row.try_get("condition_type")?;

    let Some(parameter) = Parameter::from_str(&parameter_str) else {
        tracing::warn!(rule_id = id, parameter = %parameter_str, "Unknown parameter in rule, skipping");
        return Ok(None);
    };
    let Some(condition) = ConditionKind::from_str(&condition_str) else {
        tracing::warn!(rule_id = id, condition = %condition_str, "Unknown condition in rule, skipping");
        return Ok(None);
    };

    Ok(Some(DecisionRule {
        id,
        crop_id: row.try_get("crop_id")?,
        growth_stage_id: row.try_get("growth_stage_id")?,
        parameter,
        condition,
        units: row
            .try_get::<Option<String>, _>("units")?
            .unwrap_or_default(),
        range_min: row
            .try_get::<Option<String>, _>("range_min")?
            .unwrap_or_default(),
        range_max: row.try_get("range_max")?,
        message: row
            .try_get::<Option<String>, _>("message_english")?
            .unwrap_or_default(),
    }))
}

#[async_trait]
impl RuleStore for PgRuleStore {
    async fn find_crop(&self, name: &str) -> Result<Option<Crop>> {
        let sql = format!("SELECT {} FROM crops WHERE name = $1", CROP_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_crop).transpose()
    }

    async fn find_growth_stage(&self, crop_id: i64, order: i32) -> Result<Option<GrowthStage>> {
        let sql = format!(
            "SELECT {} FROM growth_stages WHERE crop_id = $1 AND stage_order = $2",
            STAGE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(crop_id)
            .bind(order)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_stage).transpose()
    }

    async fn list_rules(&self, crop_id: i64, stage_id: i64) -> Result<Vec<DecisionRule>> {
        let rows = sqlx::query(
            r#"
            SELECT id::BIGINT AS id, crop_id::BIGINT AS crop_id,
                   growth_stage_id::BIGINT AS growth_stage_id,
                   parameter, condition_type, units, range_min, range_max, message_english
            FROM decision_tree_rules
            WHERE crop_id = $1 AND growth_stage_id = $2
            ORDER BY parameter COLLATE "C", condition_type COLLATE "C"
            "#,
        )
        .bind(crop_id)
        .bind(stage_id)
        .fetch_all(&self.pool)
        .await?;

        let mut rules = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(rule) = row_to_rule(row)? {
                rules.push(rule);
            }
        }
        Ok(rules)
    }

    async fn list_gdd_bands(&self, crop_id: i64, variety: VarietyType) -> Result<Vec<GddBand>> {
        let rows = sqlx::query(
            r#"
            SELECT gs.id::BIGINT AS id, gs.crop_id::BIGINT AS crop_id, gs.stage_name,
                   gs.stage_order::INT4 AS stage_order,
                   gc.gdd_min::FLOAT8 AS gdd_min, gc.gdd_max::FLOAT8 AS gdd_max
            FROM gdd_configs gc
            JOIN growth_stages gs ON gs.id = gc.growth_stage_id
            WHERE gc.crop_id = $1 AND gc.variety_type = $2
            ORDER BY gs.stage_order
            "#,
        )
        .bind(crop_id)
        .bind(variety.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(GddBand {
                    crop_id,
                    variety,
                    stage: row_to_stage(row)?,
                    gdd_min: row.try_get("gdd_min")?,
                    gdd_max: row.try_get("gdd_max")?,
                })
            })
            .collect()
    }

    async fn list_stages_by_order_desc(&self, crop_id: i64) -> Result<Vec<GrowthStage>> {
        let sql = format!(
            "SELECT {} FROM growth_stages WHERE crop_id = $1 ORDER BY stage_order DESC",
            STAGE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(crop_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_stage).collect()
    }

    async fn list_stages(&self, crop_id: i64) -> Result<Vec<GrowthStage>> {
        let sql = format!(
            "SELECT {} FROM growth_stages WHERE crop_id = $1 ORDER BY stage_order",
            STAGE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(crop_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_stage).collect()
    }

    async fn list_crops(&self) -> Result<Vec<Crop>> {
        let sql = format!("SELECT {} FROM crops ORDER BY display_name", CROP_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(row_to_crop).collect()
    }
}
