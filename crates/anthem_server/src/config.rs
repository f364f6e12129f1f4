//! Server configuration: logging, data directory, and the scripted demo
//! session the stub host plays through.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub demo: DemoSettings,
    /// Directory handed to the plugin for its own configuration.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json_format: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSettings {
    #[serde(default = "default_players")]
    pub players: Vec<DemoPlayer>,
    /// Rounds to simulate before shutting down.
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    /// Ticks between rounds; each tick is one simulated second.
    #[serde(default = "default_ticks_per_round")]
    pub ticks_per_round: u64,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoPlayer {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub grants: Vec<String>,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_players() -> Vec<DemoPlayer> {
    vec![
        DemoPlayer { id: 1, name: "Alice".to_string(), grants: vec![] },
        DemoPlayer { id: 2, name: "Bob".to_string(), grants: vec!["vip".to_string()] },
    ]
}

fn default_rounds() -> u32 {
    3
}

fn default_ticks_per_round() -> u64 {
    12
}

fn default_tick_interval() -> u64 {
    250
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: default_log_level(), json_format: false }
    }
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            players: default_players(),
            rounds: default_rounds(),
            ticks_per_round: default_ticks_per_round(),
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LoggingSettings::default(),
            demo: DemoSettings::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl AppConfig {
    /// Loads configuration, writing the default file when none exists.
    pub async fn load_from_file(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str::<AppConfig>(&content)
                .with_context(|| format!("parsing {}", path.display()))?
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!("created default configuration file: {}", path.display());
            default_config
        };
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            ));
        }
        if self.data_dir.is_empty() {
            return Err("data_dir cannot be empty".to_string());
        }
        if self.demo.players.is_empty() {
            return Err("demo needs at least one player".to_string());
        }
        Ok(())
    }
}
