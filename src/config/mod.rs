//! Configuration management
//! Layers a TOML, YAML or JSON file with `FIXER_*` environment overrides

use crate::history::BatchQueryConfig;
use crate::types::Market;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "FIXER_CONFIG";

const DEFAULT_LOCATIONS: &[&str] = &[
    "profit-fixer.toml",
    "profit-fixer.yaml",
    "profit-fixer.yml",
    "profit-fixer.json",
    "config.toml",
];

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// One exchange session whose trades are read from a JSON dump
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub name: String,
    pub trades_file: PathBuf,
}

/// Fixer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logging level (default: info)
    #[serde(default)]
    pub log_level: Option<String>,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Start of the replay window (inclusive)
    #[serde(default)]
    pub trades_since: Option<DateTime<Utc>>,
    /// End of the replay window (exclusive, default: now)
    #[serde(default)]
    pub trades_until: Option<DateTime<Utc>>,
    /// Cancel the run after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    pub market: Market,
    #[serde(default)]
    pub batch: BatchQueryConfig,
    #[serde(default)]
    pub sessions: Vec<SessionConfig>,
}

impl Config {
    /// Load configuration from file, with environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()))
            .add_source(
                ::config::Environment::with_prefix("FIXER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    /// Find the config file: `FIXER_CONFIG`, the working directory, then the
    /// user config directory
    pub fn locate() -> anyhow::Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        for location in DEFAULT_LOCATIONS {
            if Path::new(location).exists() {
                return Ok(PathBuf::from(location));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_file = config_dir.join("profit-fixer/config.toml");
            if config_file.exists() {
                return Ok(config_file);
            }
        }

        anyhow::bail!(
            "No configuration file found. Set {} or create one of: {:?}",
            CONFIG_PATH_ENV,
            DEFAULT_LOCATIONS
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.market.symbol.is_empty() {
            anyhow::bail!("Market symbol is required");
        }
        if self.market.base_currency.is_empty() || self.market.quote_currency.is_empty() {
            anyhow::bail!("Market base and quote currencies are required");
        }
        let Some(since) = self.trades_since else {
            anyhow::bail!("trades_since is required");
        };
        if let Some(until) = self.trades_until {
            if until <= since {
                anyhow::bail!("trades_until ({}) must be after trades_since ({})", until, since);
            }
        }
        if self.batch.page_limit == 0 {
            anyhow::bail!("Batch page limit must be positive");
        }

        let mut names = HashSet::new();
        for session in &self.sessions {
            if session.name.is_empty() {
                anyhow::bail!("Session name must not be empty");
            }
            if !names.insert(session.name.as_str()) {
                anyhow::bail!("Duplicate session name: {}", session.name);
            }
        }
        Ok(())
    }

    /// Replay window, with `trades_until` defaulting to `now`
    pub fn window(&self, now: DateTime<Utc>) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
        let since = self
            .trades_since
            .ok_or_else(|| anyhow::anyhow!("trades_since is required"))?;
        Ok((since, self.trades_until.unwrap_or(now)))
    }
}
