mod file_config;

pub use file_config::{BackfillConfig, FileConfig};

use crate::backfill::{BackfillSettings, DEFAULT_BATCH_DURATION};
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be overridden by the TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub batch_duration_ms: u64,
    pub log_level: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            batch_duration_ms: DEFAULT_BATCH_DURATION.as_millis() as u64,
            log_level: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: Option<String>,
    pub backfill: BackfillSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db or in config file")
            })?;
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let log_level = file.log_level.or_else(|| cli.log_level.clone());

        let batch_duration_ms = file
            .backfill
            .and_then(|b| b.batch_duration_ms)
            .unwrap_or(cli.batch_duration_ms);
        if batch_duration_ms == 0 {
            bail!("batch_duration_ms must be greater than zero");
        }

        Ok(Self {
            db_path,
            log_level,
            backfill: BackfillSettings {
                batch_duration: Duration::from_millis(batch_duration_ms),
            },
        })
    }
}
