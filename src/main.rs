mod cli;

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use cli::{Cli, Commands};
use cropwise::config::{Config, StoreBackend};
use cropwise::datasources::{OpenWeatherMapClient, PgRuleStore};
use cropwise::db::Database;
use cropwise::logic::Advisor;
use cropwise::models::{AdvisoryReport, ReferenceData, StageReport, WeatherReading};
use cropwise::store::{InMemoryRuleStore, RuleStore};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logs go to stderr so stdout stays valid JSON
    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        tracing::debug!(error = ?e, "Command failed");
        let body = serde_json::json!({ "error": format!("{:#}", e) });
        match serde_json::to_string_pretty(&body) {
            Ok(out) => println!("{}", out),
            Err(_) => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        command,
        config: config_override,
        data_dir,
        ..
    } = cli;

    match command {
        Commands::Init => {
            let (_, path) = Config::setup_interactive()?;
            print_json(&serde_json::json!({ "config": path }))
        }
        Commands::Import { file } => {
            let config = load_config(config_override.as_ref())?;
            if config.store.backend != StoreBackend::Sqlite {
                tracing::warn!(
                    backend = config.store.backend.as_str(),
                    "Importing into SQLite, but the configured backend is not sqlite"
                );
            }

            let data = ReferenceData::from_yaml_file(&file)
                .with_context(|| format!("Failed to load reference dataset {}", file.display()))?;
            let db = open_sqlite(&config, data_dir.as_ref())?;
            let summary = db.import_reference_data(&data)?;
            tracing::info!(?summary, path = %db.path().display(), "Imported reference data");

            print_json(&serde_json::json!({
                "database": db.path(),
                "imported": summary,
            }))
        }
        Commands::Check => {
            let config = load_config(config_override.as_ref())?;
            let report = check(&config, data_dir.as_ref()).await;
            print_json(&report)
        }
        command => {
            let config = load_config(config_override.as_ref())?;
            let output = match config.store.backend {
                StoreBackend::Sqlite => {
                    let db = open_sqlite(&config, data_dir.as_ref())?;
                    if !db.has_reference_data()? {
                        tracing::warn!(
                            path = %db.path().display(),
                            "Rule store is empty. Run `cropwise import <file>` first."
                        );
                    }
                    execute(&Advisor::new(db), &config, command).await?
                }
                StoreBackend::Postgres => {
                    let store = connect_postgres(&config).await?;
                    execute(&Advisor::new(store), &config, command).await?
                }
                StoreBackend::File => {
                    let store = load_reference_file(&config)?;
                    execute(&Advisor::new(store), &config, command).await?
                }
            };
            print_json(&output)
        }
    }
}

async fn execute<S: RuleStore>(
    advisor: &Advisor<S>,
    config: &Config,
    command: Commands,
) -> anyhow::Result<serde_json::Value> {
    let value = match command {
        Commands::Advise {
            crop,
            stage,
            variety,
            precipitation,
            humidity,
            temperature,
            p_pet,
            forecast,
        } => {
            let variety = variety.unwrap_or(config.defaults.variety_type);
            let mut reading = WeatherReading {
                precipitation,
                humidity,
                temperature,
                p_pet,
            };

            if forecast {
                let owm = config
                    .weather_source()
                    .context("--forecast needs an enabled openweathermap section in config")?;
                let client = OpenWeatherMapClient::new(owm.clone());
                reading = reading.or(&client.fetch_reading().await?);
            }

            if reading.is_empty() {
                tracing::warn!("No weather readings supplied; every rule will be skipped");
            }

            let recommendations = advisor.evaluate(&crop, stage, variety, &reading).await?;
            serde_json::to_value(AdvisoryReport::new(&crop, stage, variety, recommendations))?
        }
        Commands::Stage { crop, variety, gdd } => {
            let variety = variety.unwrap_or(config.defaults.variety_type);
            let stage = advisor
                .growth_stage(&crop, variety, gdd)
                .await?
                .ok_or_else(|| anyhow!("Could not determine growth stage for {}", crop))?;
            serde_json::to_value(StageReport::new(&crop, variety, gdd, &stage))?
        }
        Commands::Crops => serde_json::to_value(advisor.crops().await?)?,
        Commands::Stages { crop } => serde_json::to_value(advisor.growth_stages(&crop).await?)?,
        Commands::Import { .. } | Commands::Init | Commands::Check => {
            bail!("command does not use the rule store")
        }
    };

    Ok(value)
}

fn load_config(config_override: Option<&PathBuf>) -> anyhow::Result<Config> {
    // An explicit --config must exist; otherwise fall back to defaults
    if config_override.is_some() || Config::exists(None) {
        return Ok(Config::load(config_override.cloned())?);
    }

    tracing::info!("No config file found, using defaults");
    Ok(Config::default())
}

fn open_sqlite(config: &Config, data_dir: Option<&PathBuf>) -> anyhow::Result<Database> {
    let path = config.sqlite_path(data_dir)?;
    Database::open(&path).with_context(|| format!("Failed to open {}", path.display()))
}

async fn connect_postgres(config: &Config) -> anyhow::Result<PgRuleStore> {
    let pg = config
        .store
        .postgres
        .as_ref()
        .context("store.backend is postgres but store.postgres is not configured")?;
    Ok(PgRuleStore::connect(pg).await?)
}

fn load_reference_file(config: &Config) -> anyhow::Result<InMemoryRuleStore> {
    let path = config
        .store
        .reference_file
        .as_ref()
        .context("store.backend is file but store.reference_file is not set")?;
    let data = ReferenceData::from_yaml_file(path)
        .with_context(|| format!("Failed to load reference dataset {}", path.display()))?;
    Ok(InMemoryRuleStore::from_reference_data(&data))
}

#[derive(Debug, Serialize)]
struct CheckReport {
    backend: &'static str,
    store: String,
    crops: Option<usize>,
    openweathermap: &'static str,
}

async fn check(config: &Config, data_dir: Option<&PathBuf>) -> CheckReport {
    let crops = match config.store.backend {
        StoreBackend::Sqlite => match open_sqlite(config, data_dir) {
            Ok(db) => count_crops(&db).await,
            Err(e) => Err(e),
        },
        StoreBackend::Postgres => match connect_postgres(config).await {
            Ok(store) => match store.test_connection().await {
                Ok(true) => count_crops(&store).await,
                Ok(false) => Err(anyhow!("connection test failed")),
                Err(e) => Err(e.into()),
            },
            Err(e) => Err(e),
        },
        StoreBackend::File => match load_reference_file(config) {
            Ok(store) => count_crops(&store).await,
            Err(e) => Err(e),
        },
    };

    let openweathermap = match config.weather_source() {
        Some(owm) => {
            let client = OpenWeatherMapClient::new(owm.clone());
            if client.test_connection().await.unwrap_or(false) {
                "OK"
            } else {
                "OFFLINE"
            }
        }
        None => "not configured",
    };

    let (store, crops) = match crops {
        Ok(n) => ("OK".to_string(), Some(n)),
        Err(e) => (format!("OFFLINE: {:#}", e), None),
    };

    CheckReport {
        backend: config.store.backend.as_str(),
        store,
        crops,
        openweathermap,
    }
}

async fn count_crops<S: RuleStore>(store: &S) -> anyhow::Result<usize> {
    Ok(store.list_crops().await?.len())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
