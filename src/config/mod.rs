use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts after the first one; 0 means a single GET per station.
    #[serde(default)]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// How the history file is updated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Read the whole file, add the new rows, write it back.
    #[default]
    Rewrite,
    /// Open in append mode and write only the new rows.
    Append,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_stations_path")]
    pub stations_path: PathBuf,

    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,

    #[serde(default)]
    pub write_mode: WriteMode,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

/// Times of day (local, `HH:MM`) at which a run is triggered.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_times")]
    pub times: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Plain-text log file, appended to. Console only when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_timeout_secs() -> u64 {
    30
}
fn default_retry_base_ms() -> u64 {
    1000
}
fn default_user_agent() -> String {
    "diesel-prices/0.1 (fuel price monitor)".to_string()
}
fn default_stations_path() -> PathBuf {
    PathBuf::from("config/stations.json")
}
fn default_history_path() -> PathBuf {
    PathBuf::from("data/ceny_paliw.csv")
}
fn default_concurrency() -> usize {
    3
}
fn default_times() -> Vec<String> {
    ["07:00", "10:00", "14:00", "18:00", "22:00"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
            retry_base_ms: default_retry_base_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            stations_path: default_stations_path(),
            history_path: default_history_path(),
            write_mode: WriteMode::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            times: default_times(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("DIESEL").separator("__"))
            .build()
            .context("Failed to read configuration sources")?;

        cfg.try_deserialize()
            .context("Invalid application configuration")
    }
}
