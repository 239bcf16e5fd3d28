pub mod memory;

pub use memory::InMemoryRuleStore;

use crate::error::Result;
use crate::models::{Crop, DecisionRule, GddBand, GrowthStage, VarietyType};
use async_trait::async_trait;

/// Read-only access to decision tree reference data.
///
/// Implemented by the SQLite [`Database`](crate::db::Database), the Postgres
/// [`PgRuleStore`](crate::datasources::PgRuleStore) and [`InMemoryRuleStore`].
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Look up a crop by its lowercase key.
    async fn find_crop(&self, name: &str) -> Result<Option<Crop>>;

    async fn find_growth_stage(&self, crop_id: i64, order: i32) -> Result<Option<GrowthStage>>;

    /// Rules for one stage, ordered by parameter label then condition label.
    async fn list_rules(&self, crop_id: i64, stage_id: i64) -> Result<Vec<DecisionRule>>;

    async fn list_gdd_bands(&self, crop_id: i64, variety: VarietyType) -> Result<Vec<GddBand>>;

    /// Most advanced stage first.
    async fn list_stages_by_order_desc(&self, crop_id: i64) -> Result<Vec<GrowthStage>>;

    /// Earliest stage first.
    async fn list_stages(&self, crop_id: i64) -> Result<Vec<GrowthStage>>;

    /// All crops, ordered by display name.
    async fn list_crops(&self) -> Result<Vec<Crop>>;
}
