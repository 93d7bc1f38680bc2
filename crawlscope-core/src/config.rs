// User configuration loaded from ~/.config/crawlscope/config.toml

use crate::category::{CategoryStyle, CategoryTable, parse_hex_color};
use crate::error::{CoreError, Result};
use crate::layout::{LayoutConfig, TreeOrientation};
use crawlscope_client::{DEFAULT_BASE_URL, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/crawlscope";
pub const CONFIG_FILE: &str = "config.toml";
pub const LOG_FILE: &str = "crawlscope.log";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub download_dir: String,
    pub retry: RetrySettings,
    pub refresh: RefreshSettings,
    pub layout: LayoutSettings,
    pub categories: Vec<CategoryStyle>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            download_dir: ".".to_string(),
            retry: RetrySettings::default(),
            refresh: RefreshSettings::default(),
            layout: LayoutSettings::default(),
            categories: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub width: f64,
    pub height: f64,
    pub cluster_strength: f64,
    pub tree_orientation: TreeOrientation,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        let layout = LayoutConfig::default();
        Self {
            width: layout.width,
            height: layout.height,
            cluster_strength: layout.cluster_strength,
            tree_orientation: layout.tree_orientation,
        }
    }
}

/// Expand `~` in a configured path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

pub fn default_config_dir() -> PathBuf {
    expand_path(DEFAULT_CONFIG_DIR)
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILE)
}

impl Config {
    /// Load from `path`, or return defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = Self::parse(&contents)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).map_err(|e| CoreError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.layout.width <= 0.0 || self.layout.height <= 0.0 {
            return Err(CoreError::Config(format!(
                "layout size must be positive, got {}x{}",
                self.layout.width, self.layout.height
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(CoreError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if self.refresh.interval_secs == 0 {
            return Err(CoreError::Config("refresh.interval_secs must be at least 1".to_string()));
        }
        for style in &self.categories {
            if parse_hex_color(&style.color).is_none() {
                return Err(CoreError::Config(format!(
                    "category {} has invalid color {:?}",
                    style.name, style.color
                )));
            }
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
        }
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh
            .enabled
            .then(|| Duration::from_secs(self.refresh.interval_secs))
    }

    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            width: self.layout.width,
            height: self.layout.height,
            cluster_strength: self.layout.cluster_strength,
            tree_orientation: self.layout.tree_orientation,
        }
    }

    pub fn category_table(&self) -> CategoryTable {
        CategoryTable::with_overrides(&self.categories)
    }

    pub fn download_dir(&self) -> PathBuf {
        expand_path(&self.download_dir)
    }
}
