pub mod config;
pub mod datasources;
pub mod db;
pub mod error;
pub mod logic;
pub mod models;
pub mod store;

pub use error::{CropwiseError, Result};
