use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

use super::currency::Currency;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RatesProviderConfig {
    pub base_url: String,
}

impl Default for RatesProviderConfig {
    fn default() -> Self {
        RatesProviderConfig {
            base_url: "https://api.exchangeratesapi.io".to_string(),
        }
    }
}

/// Currencies preselected in a freshly created widget.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct WidgetDefaults {
    pub from: Currency,
    pub to: Currency,
}

impl Default for WidgetDefaults {
    fn default() -> Self {
        WidgetDefaults {
            from: Currency::Eur,
            to: Currency::Gbp,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub provider: RatesProviderConfig,
    #[serde(default = "default_base_currency")]
    pub base_currency: Currency,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_balances")]
    pub balances: BTreeMap<Currency, f64>,
    #[serde(default)]
    pub defaults: WidgetDefaults,
}

fn default_base_currency() -> Currency {
    Currency::Eur
}

fn default_poll_interval_secs() -> u64 {
    10
}

pub fn default_balances() -> BTreeMap<Currency, f64> {
    BTreeMap::from([
        (Currency::Eur, 500.95),
        (Currency::Gbp, 1.11),
        (Currency::Usd, 200.0),
    ])
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            provider: RatesProviderConfig::default(),
            base_currency: default_base_currency(),
            poll_interval_secs: default_poll_interval_secs(),
            balances: default_balances(),
            defaults: WidgetDefaults::default(),
        }
    }
}

impl AppConfig {
    /// Loads the default config file, or the built-in defaults when no file
    /// has been created yet.
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "xchg", "xchg")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
