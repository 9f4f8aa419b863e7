use anyhow::Context;
use log::LevelFilter;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_roster_path() -> PathBuf {
    PathBuf::from("data/pokemon.csv")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("data/pokemon_model.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Server settings. Every field has a default so a config file may list only overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default = "default_roster_path")]
    pub roster_path: PathBuf,
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    /// Replacement effectiveness chart; the builtin chart is used when unset.
    #[serde(default)]
    pub type_chart_path: Option<PathBuf>,
    #[serde(default)]
    pub outcome_log_path: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            listen: default_listen(),
            roster_path: default_roster_path(),
            model_path: default_model_path(),
            type_chart_path: None,
            outcome_log_path: None,
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        let parsed: AppConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
        parsed.level_filter()?;
        Ok(parsed)
    }

    pub fn level_filter(&self) -> anyhow::Result<LevelFilter> {
        self.log_level
            .parse()
            .map_err(|_| anyhow::anyhow!("Unknown log level {:?}", self.log_level))
    }
}
