use crate::error::{CropwiseError, Result};
use crate::models::VarietyType;
use dialoguer::{Input, Password, Select};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub openweathermap: Option<OpenWeatherMapConfig>,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local SQLite database, filled by `cropwise import`
    #[default]
    Sqlite,
    /// PostgreSQL database populated by the sheet import
    Postgres,
    /// Reference dataset YAML loaded into memory on every run
    File,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Postgres => "postgres",
            StoreBackend::File => "file",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Overrides `<data dir>/cropwise.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<PathBuf>,
    /// Dataset for the `file` backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresConfig>,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct PostgresConfig {
    /// Full connection URL. Takes precedence over the individual fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: u16,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_host() -> String {
    "localhost".into()
}

fn default_port() -> u16 {
    5432
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    5
}

/// Accepts `5432` or `"5432"`, the latter being what `${VAR}` substitution produces
/// when the placeholder is quoted.
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(value) => value.trim().parse::<u16>().map_err(|_| {
            D::Error::custom(format!(
                "invalid port '{}' - ensure CROPWISE_DB_PORT environment variable is set",
                value
            ))
        }),
    }
}

impl PostgresConfig {
    pub fn connection_string(&self) -> String {
        if let Some(url) = self.url.as_ref().filter(|u| !u.is_empty()) {
            return url.clone();
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

impl std::fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("url", &self.url.as_ref().map(|_| "[REDACTED]"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct OpenWeatherMapConfig {
    pub api_key: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl std::fmt::Debug for OpenWeatherMapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherMapConfig")
            .field("api_key", &"[REDACTED]")
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .field("enabled", &self.enabled)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DefaultsConfig {
    /// Used when a request names no variety
    #[serde(default)]
    pub variety_type: VarietyType,
}

impl Config {
    pub fn load(config_override: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_override {
            Some(p) => p,
            None => Self::find_config_path()?,
        };

        if !config_path.exists() {
            return Err(CropwiseError::Config(format!(
                "Config file not found at {:?}. Run `cropwise init` to set up.",
                config_path
            )));
        }

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| CropwiseError::Config(format!("Failed to read config: {}", e)))?;

        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let content = Self::substitute_env_vars(content);

        serde_yaml::from_str(&content)
            .map_err(|e| CropwiseError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Search for config.yaml in standard locations.
    /// Returns the path of the first found config, or the XDG default path if none found.
    fn find_config_path() -> Result<PathBuf> {
        let local_config = PathBuf::from("config/config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let default_path = Self::default_config_path()?;
        Ok(default_path)
    }

    /// Returns true if a config file can be found in any standard location.
    pub fn exists(config_override: Option<&PathBuf>) -> bool {
        match config_override {
            Some(p) => p.exists(),
            None => Self::find_config_path()
                .map(|p| p.exists())
                .unwrap_or(false),
        }
    }

    /// Default path for writing new config files (~/.config/cropwise/config.yaml).
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CropwiseError::Config("Cannot determine config directory".into()))?
            .join("cropwise");
        Ok(config_dir.join("config.yaml"))
    }

    /// Run interactive setup prompts and write config to disk.
    /// Returns the loaded Config and the path it was written to.
    pub fn setup_interactive() -> Result<(Self, PathBuf)> {
        let input_err = |e: dialoguer::Error| CropwiseError::Config(format!("Input error: {}", e));

        println!();
        println!("Let's set up cropwise!");
        println!();

        // --- Rule store ---
        println!("Rule store");
        let backends = [StoreBackend::Sqlite, StoreBackend::Postgres, StoreBackend::File];
        let labels: Vec<&str> = backends.iter().map(|b| b.as_str()).collect();
        let choice = Select::new()
            .with_prompt("  Backend")
            .items(&labels)
            .default(0)
            .interact()
            .map_err(input_err)?;
        let backend = backends[choice];

        let mut store = StoreConfig {
            backend,
            ..Default::default()
        };

        match backend {
            StoreBackend::Sqlite => {}
            StoreBackend::File => {
                let path: String = Input::new()
                    .with_prompt("  Reference dataset (YAML)")
                    .default("data/maize.yaml".into())
                    .interact_text()
                    .map_err(input_err)?;
                store.reference_file = Some(PathBuf::from(path));
            }
            StoreBackend::Postgres => {
                let host: String = Input::new()
                    .with_prompt("  Host")
                    .default(default_host())
                    .interact_text()
                    .map_err(input_err)?;

                let port: u16 = Input::new()
                    .with_prompt("  Port")
                    .default(default_port())
                    .interact_text()
                    .map_err(input_err)?;

                let database: String = Input::new()
                    .with_prompt("  Database")
                    .default("decision_trees".into())
                    .interact_text()
                    .map_err(input_err)?;

                let user: String = Input::new()
                    .with_prompt("  User")
                    .default("postgres".into())
                    .interact_text()
                    .map_err(input_err)?;

                let password: String = Password::new()
                    .with_prompt("  Password")
                    .allow_empty_password(true)
                    .interact()
                    .map_err(input_err)?;

                store.postgres = Some(PostgresConfig {
                    url: None,
                    host,
                    port,
                    database,
                    user,
                    password,
                    max_connections: default_max_connections(),
                    connect_timeout_secs: default_connect_timeout(),
                });
            }
        }

        println!();

        // --- OpenWeatherMap (optional) ---
        println!("OpenWeatherMap (leave API key blank to skip)");
        let owm_api_key: String = Input::new()
            .with_prompt("  API key")
            .default(String::new())
            .allow_empty(true)
            .interact_text()
            .map_err(input_err)?;

        let openweathermap = if owm_api_key.is_empty() {
            None
        } else {
            let latitude: f64 = Input::new()
                .with_prompt("  Latitude")
                .default(-1.29)
                .interact_text()
                .map_err(input_err)?;

            let longitude: f64 = Input::new()
                .with_prompt("  Longitude")
                .default(36.82)
                .interact_text()
                .map_err(input_err)?;

            Some(OpenWeatherMapConfig {
                api_key: owm_api_key,
                latitude,
                longitude,
                enabled: true,
            })
        };

        println!();

        let variety_labels: Vec<&str> = VarietyType::ALL.iter().map(|v| v.as_str()).collect();
        let variety_choice = Select::new()
            .with_prompt("Default variety type")
            .items(&variety_labels)
            .default(0)
            .interact()
            .map_err(input_err)?;

        let config = Config {
            store,
            openweathermap,
            defaults: DefaultsConfig {
                variety_type: VarietyType::ALL[variety_choice],
            },
        };

        let config_path = Self::default_config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml::to_string(&config)
            .map_err(|e| CropwiseError::Config(format!("Failed to serialize config: {}", e)))?;

        let content = format!(
            "# cropwise configuration\n# Generated by `cropwise init`\n# Environment variable substitution (${{VAR}}) is supported.\n\n{}",
            yaml
        );
        std::fs::write(&config_path, content)?;

        println!("Configuration saved to {}", config_path.display());
        println!();

        Ok((config, config_path))
    }

    fn substitute_env_vars(content: &str) -> String {
        let Ok(re) = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}") else {
            return content.to_string();
        };

        let mut result = content.to_string();
        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(placeholder, &value);
            }
        }

        result
    }

    pub fn data_dir(data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        // CLI override takes priority
        if let Some(dir) = data_dir_override {
            std::fs::create_dir_all(dir)?;
            return Ok(dir.clone());
        }

        if let Ok(dir) = std::env::var("CROPWISE_DATA_DIR") {
            let p = PathBuf::from(dir);
            std::fs::create_dir_all(&p)?;
            return Ok(p);
        }

        let data_dir = dirs::data_dir()
            .ok_or_else(|| CropwiseError::Config("Cannot determine data directory".into()))?
            .join("cropwise");

        std::fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    /// SQLite file for the rule store: `store.sqlite_path` or `<data dir>/cropwise.db`.
    pub fn sqlite_path(&self, data_dir_override: Option<&PathBuf>) -> Result<PathBuf> {
        match &self.store.sqlite_path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                Ok(path.clone())
            }
            None => Ok(Self::data_dir(data_dir_override)?.join("cropwise.db")),
        }
    }

    /// OpenWeatherMap settings, if configured and enabled.
    pub fn weather_source(&self) -> Option<&OpenWeatherMapConfig> {
        self.openweathermap
            .as_ref()
            .filter(|c| c.enabled && !c.api_key.is_empty())
    }
}
