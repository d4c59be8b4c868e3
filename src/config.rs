use crate::error::Result;
use crate::models::{StorageUnit, SynopticTime};
use crate::utils::constants::{DEFAULT_CONFIG_FILE, DEFAULT_DATA_FILE, ENV_PREFIX};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings: built-in defaults, then an optional TOML file,
/// then `ARMOBS_*` environment variables. CLI flags are applied on top.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Storage table to load
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Worker threads for batch evaluation
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Memory-map the data file instead of reading it into memory
    #[serde(default)]
    pub use_mmap: bool,

    #[serde(default = "default_unit")]
    pub default_unit: String,

    #[serde(default = "default_synoptic")]
    pub default_synoptic: String,

    /// Parquet export compression
    #[serde(default = "default_compression")]
    pub compression: String,
}

fn default_data_file() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_max_workers() -> usize {
    num_cpus::get()
}

fn default_unit() -> String {
    "KB".to_string()
}

fn default_synoptic() -> String {
    "00Z".to_string()
}

fn default_compression() -> String {
    "snappy".to_string()
}

impl AppConfig {
    /// Load settings. An explicitly named file must exist; the default
    /// `armobs.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_source = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .add_source(file_source)
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn unit(&self) -> Result<StorageUnit> {
        self.default_unit.parse()
    }

    pub fn synoptic_time(&self) -> Result<SynopticTime> {
        self.default_synoptic.parse()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            log_level: default_log_level(),
            max_workers: default_max_workers(),
            use_mmap: false,
            default_unit: default_unit(),
            default_synoptic: default_synoptic(),
            compression: default_compression(),
        }
    }
}
