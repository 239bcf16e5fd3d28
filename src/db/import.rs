use crate::db::Database;
use crate::error::Result;
use crate::models::{ImportSummary, ReferenceData};
use rusqlite::params;
use std::collections::{HashMap, HashSet};

impl Database {
    /// Load a reference dataset in one transaction.
    ///
    /// Crops and stages are upserted on their natural keys. A crop's GDD bands
    /// and rules are replaced wholesale, and stages missing from the dataset
    /// are removed, so the store mirrors the latest sheet after a re-import.
    pub fn import_reference_data(&self, data: &ReferenceData) -> Result<ImportSummary> {
        data.validate()?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            for crop in &data.crops {
                let crop_id: i64 = tx.query_row(
                    r#"
                    INSERT INTO crops (name, display_name, base_temp_celsius, cap_temp_celsius)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(name) DO UPDATE SET
                        display_name = excluded.display_name,
                        base_temp_celsius = excluded.base_temp_celsius,
                        cap_temp_celsius = excluded.cap_temp_celsius
                    RETURNING id
                    "#,
                    params![
                        crop.key(),
                        crop.display_name(),
                        crop.base_temp_celsius,
                        crop.cap_temp_celsius,
                    ],
                    |row| row.get(0),
                )?;

                tx.execute(
                    "DELETE FROM decision_tree_rules WHERE crop_id = ?1",
                    [crop_id],
                )?;
                tx.execute("DELETE FROM gdd_configs WHERE crop_id = ?1", [crop_id])?;

                let keep: HashSet<i32> = crop.stages.iter().map(|s| s.order).collect();
                let existing: Vec<(i64, i32)> = {
                    let mut stmt =
                        tx.prepare("SELECT id, stage_order FROM growth_stages WHERE crop_id = ?1")?;
                    let rows = stmt.query_map([crop_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
                    rows.collect::<rusqlite::Result<_>>()?
                };
                for (stage_id, order) in existing {
                    if !keep.contains(&order) {
                        tracing::info!(crop = %crop.key(), order, "Removing growth stage");
                        tx.execute("DELETE FROM growth_stages WHERE id = ?1", [stage_id])?;
                    }
                }

                let mut stage_ids: HashMap<i32, i64> = HashMap::new();
                for stage in &crop.stages {
                    let stage_id: i64 = tx.query_row(
                        r#"
                        INSERT INTO growth_stages (crop_id, stage_name, stage_order)
                        VALUES (?1, ?2, ?3)
                        ON CONFLICT(crop_id, stage_order) DO UPDATE SET
                            stage_name = excluded.stage_name
                        RETURNING id
                        "#,
                        params![crop_id, stage.name, stage.order],
                        |row| row.get(0),
                    )?;
                    stage_ids.insert(stage.order, stage_id);

                    for band in &stage.gdd {
                        tx.execute(
                            r#"
                            INSERT INTO gdd_configs
                                (crop_id, variety_type, growth_stage_id, gdd_min, gdd_max)
                            VALUES (?1, ?2, ?3, ?4, ?5)
                            ON CONFLICT(crop_id, variety_type, growth_stage_id) DO UPDATE SET
                                gdd_min = excluded.gdd_min,
                                gdd_max = excluded.gdd_max
                            "#,
                            params![
                                crop_id,
                                band.variety.as_str(),
                                stage_id,
                                band.min,
                                band.upper(),
                            ],
                        )?;
                    }
                }

                for rule in &crop.rules {
                    // validate() guarantees the stage exists
                    let Some(stage_id) = stage_ids.get(&rule.stage) else {
                        continue;
                    };
                    tx.execute(
                        r#"
                        INSERT INTO decision_tree_rules
                            (crop_id, growth_stage_id, parameter, condition_type, units,
                             range_min, range_max, message_english)
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                        "#,
                        params![
                            crop_id,
                            stage_id,
                            rule.parameter.as_str(),
                            rule.condition.as_str(),
                            rule.units,
                            rule.range,
                            rule.range_max,
                            rule.message,
                        ],
                    )?;
                }

                tracing::info!(
                    crop = %crop.key(),
                    stages = crop.stages.len(),
                    rules = crop.rules.len(),
                    "Imported crop"
                );
            }

            tx.commit()?;
            Ok(data.summary())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &str = r#"
crops:
  - name: Maize
    stages:
      - name: Germination
        order: 1
        gdd:
          - { variety: Early, min: 0, max: 120 }
    rules:
      - { stage: 1, parameter: Temperature, condition: low, units: "°C", range: "<10", message: "Cold soil delays emergence." }
"#;

    fn count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?)
        })
        .unwrap()
    }

    #[test]
    fn import_populates_all_tables() {
        let db = Database::open_in_memory().unwrap();
        let data = ReferenceData::from_yaml_str(DATASET).unwrap();
        let summary = db.import_reference_data(&data).unwrap();

        assert_eq!(summary.crops, 1);
        assert_eq!(summary.rules, 1);
        assert!(db.has_reference_data().unwrap());
        assert_eq!(count(&db, "growth_stages"), 1);
        assert_eq!(count(&db, "gdd_configs"), 1);
        assert_eq!(count(&db, "decision_tree_rules"), 1);
    }

    #[test]
    fn reimport_does_not_duplicate() {
        let db = Database::open_in_memory().unwrap();
        let data = ReferenceData::from_yaml_str(DATASET).unwrap();
        db.import_reference_data(&data).unwrap();
        db.import_reference_data(&data).unwrap();

        assert_eq!(count(&db, "crops"), 1);
        assert_eq!(count(&db, "growth_stages"), 1);
        assert_eq!(count(&db, "gdd_configs"), 1);
        assert_eq!(count(&db, "decision_tree_rules"), 1);
    }

    #[test]
    fn reimport_updates_crop_constants() {
        let db = Database::open_in_memory().unwrap();
        let mut data = ReferenceData::from_yaml_str(DATASET).unwrap();
        db.import_reference_data(&data).unwrap();

        data.crops[0].base_temp_celsius = 8.0;
        db.import_reference_data(&data).unwrap();

        let crop = db.find_crop_by_name("maize").unwrap().unwrap();
        assert_eq!(crop.base_temp_celsius, 8.0);
    }

    #[tokio::test]
    async fn reimport_drops_stages_and_bands_missing_from_dataset() {
        use crate::logic::Advisor;
        use crate::models::VarietyType;

        let v1 = r#"
crops:
  - name: Maize
    stages:
      - name: Germination
        order: 1
        gdd:
          - { variety: Mid, min: 0, max: 300 }
      - { name: Vegetative, order: 2 }
      - { name: Flowering, order: 3 }
    rules:
      - { stage: 3, parameter: Temperature, condition: high, range: ">35", message: "Heat at silking." }
"#;
        let v2 = r#"
crops:
  - name: Maize
    stages:
      - { name: Germination, order: 1 }
      - { name: Vegetative, order: 2 }
"#;

        let db = Database::open_in_memory().unwrap();
        db.import_reference_data(&ReferenceData::from_yaml_str(v1).unwrap())
            .unwrap();
        db.import_reference_data(&ReferenceData::from_yaml_str(v2).unwrap())
            .unwrap();

        assert_eq!(count(&db, "growth_stages"), 2);
        assert_eq!(count(&db, "gdd_configs"), 0);
        assert_eq!(count(&db, "decision_tree_rules"), 0);

        let advisor = Advisor::new(db);
        let stage = advisor
            .growth_stage("maize", VarietyType::Mid, 100.0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stage.order, 2);

        let orders: Vec<i32> = advisor
            .growth_stages("maize")
            .await
            .unwrap()
            .iter()
            .map(|s| s.order)
            .collect();
        assert_eq!(orders, vec![1, 2]);
    }
}
