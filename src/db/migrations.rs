use crate::db::Database;
use crate::error::Result;

const MIGRATIONS: &[&str] = &[
    // Migration 1: Reference tables
    r#"
    CREATE TABLE IF NOT EXISTS crops (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        display_name TEXT NOT NULL,
        base_temp_celsius REAL NOT NULL,
        cap_temp_celsius REAL NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS growth_stages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        crop_id INTEGER NOT NULL REFERENCES crops(id) ON DELETE CASCADE,
        stage_name TEXT NOT NULL,
        stage_order INTEGER NOT NULL,
        UNIQUE(crop_id, stage_order)
    );

    CREATE TABLE IF NOT EXISTS decision_tree_rules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        crop_id INTEGER NOT NULL REFERENCES crops(id) ON DELETE CASCADE,
        growth_stage_id INTEGER NOT NULL REFERENCES growth_stages(id) ON DELETE CASCADE,
        parameter TEXT NOT NULL,
        condition_type TEXT NOT NULL,
        units TEXT NOT NULL DEFAULT '',
        range_min TEXT NOT NULL,
        range_max TEXT,
        message_english TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS gdd_configs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        crop_id INTEGER NOT NULL REFERENCES crops(id) ON DELETE CASCADE,
        variety_type TEXT NOT NULL,
        growth_stage_id INTEGER NOT NULL REFERENCES growth_stages(id) ON DELETE CASCADE,
        gdd_min REAL NOT NULL,
        gdd_max REAL NOT NULL,
        UNIQUE(crop_id, variety_type, growth_stage_id)
    );

    CREATE TABLE IF NOT EXISTS schema_migrations (
        version INTEGER PRIMARY KEY,
        applied_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    "#,
    // Migration 2: Lookup indexes
    r#"
    CREATE INDEX IF NOT EXISTS idx_rules_crop_stage
        ON decision_tree_rules(crop_id, growth_stage_id);
    CREATE INDEX IF NOT EXISTS idx_gdd_configs_crop_variety
        ON gdd_configs(crop_id, variety_type);
    "#,
];

pub fn run(db: &Database) -> Result<()> {
    db.with_conn_mut(|conn| {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                tracing::info!("Applying migration {}", version);
                let tx = conn.transaction()?;
                tx.execute_batch(migration)?;
                tx.execute(
                    "INSERT INTO schema_migrations (version) VALUES (?1)",
                    [version],
                )?;
                tx.commit()?;
            }
        }

        Ok(())
    })
}
