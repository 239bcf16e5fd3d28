use clap::{Parser, Subcommand};
use cropwise::models::VarietyType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cropwise",
    version,
    about = "Weather-driven crop advisories from decision tree rules"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config.yaml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override SQLite data directory
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate decision tree rules against weather readings
    Advise {
        /// Crop name, e.g. maize
        #[arg(long)]
        crop: String,

        /// Growth stage order (1 = earliest)
        #[arg(long)]
        stage: i32,

        /// Early, Mid or Late (defaults to the configured variety)
        #[arg(long, value_parser = parse_variety)]
        variety: Option<VarietyType>,

        /// 4-day precipitation total in mm
        #[arg(long, allow_negative_numbers = true)]
        precipitation: Option<f64>,

        /// 4-day average relative humidity in %
        #[arg(long, allow_negative_numbers = true)]
        humidity: Option<f64>,

        /// 4-day average air temperature in °C
        #[arg(long, allow_negative_numbers = true)]
        temperature: Option<f64>,

        /// 10-day precipitation / potential evapotranspiration ratio
        #[arg(long = "p-pet", allow_negative_numbers = true)]
        p_pet: Option<f64>,

        /// Fill missing readings from the OpenWeatherMap forecast
        #[arg(long)]
        forecast: bool,
    },
    /// Resolve the growth stage for accumulated growing degree days
    Stage {
        #[arg(long)]
        crop: String,

        #[arg(long, value_parser = parse_variety)]
        variety: Option<VarietyType>,

        /// Accumulated growing degree days
        #[arg(long)]
        gdd: f64,
    },
    /// List crops in the rule store
    Crops,
    /// List growth stages of a crop
    Stages {
        #[arg(long)]
        crop: String,
    },
    /// Load a reference dataset (YAML) into the SQLite store
    Import { file: PathBuf },
    /// Re-run interactive setup
    Init,
    /// Validate config and test connections
    Check,
}

fn parse_variety(s: &str) -> Result<VarietyType, String> {
    VarietyType::from_str(s)
        .ok_or_else(|| format!("unknown variety type '{}' (expected Early, Mid or Late)", s))
}
