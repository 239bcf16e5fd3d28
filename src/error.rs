use thiserror::Error;

#[derive(Error, Debug)]
pub enum CropwiseError {
    #[error("Rule store error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("External rule store error: {0}")]
    ExternalDatabase(#[from] sqlx::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Reference data parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Data source unavailable: {0}")]
    DataSourceUnavailable(String),

    #[error("Invalid reference data: {0}")]
    InvalidData(String),

    /// Unknown crop or growth stage. Surfaced to the caller as-is.
    #[error("{0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, CropwiseError>;
