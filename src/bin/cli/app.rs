use std::path::Path;

use anyhow::{Context, Result};

use kotoba_lib::config::AppConfig;
use kotoba_lib::srs::{SqliteCardStore, SrsService};

/// Shared application state for CLI commands
pub struct App {
    pub config: AppConfig,
    pub service: SrsService<SqliteCardStore>,
    pub user_id: String,
}

impl App {
    /// Load the config (or defaults) and open the card store it points at
    pub fn new(config_path: Option<&Path>, user_id: &str) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path.to_path_buf(),
            None => AppConfig::default_path().context("Failed to locate config directory")?,
        };
        let config = AppConfig::load(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

        let service = SrsService::open(&config).with_context(|| {
            format!("Failed to open card store at {}", config.database_path.display())
        })?;

        Ok(Self {
            config,
            service,
            user_id: user_id.to_string(),
        })
    }

    pub fn user(&self) -> &str {
        &self.user_id
    }
}
