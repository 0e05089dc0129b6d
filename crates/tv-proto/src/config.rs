use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub list: ListConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub native: NativeConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Catalog location: an http(s) URL or a local file path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_source")]
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    /// Items materialized per batch.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Distance from the bottom (in the host's units) that triggers the next
    /// batch.
    #[serde(default = "default_near_bottom_threshold")]
    pub near_bottom_threshold: f64,
}

/// Tuning handed to the streaming engine when a session starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Initial bandwidth estimate in bits per second.
    #[serde(default)]
    pub initial_bandwidth_estimate: Option<u64>,
    #[serde(default)]
    pub low_latency: bool,
}

/// Fallback player used when mpv cannot be found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NativeConfig {
    #[serde(default = "default_native_player")]
    pub player: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default)]
    pub locale: Locale,
    /// Rows from the bottom of the list pane that trigger the next batch.
    #[serde(default = "default_near_bottom_rows")]
    pub near_bottom_rows: u16,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ar,
    En,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source: default_catalog_source(),
        }
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            near_bottom_threshold: default_near_bottom_threshold(),
        }
    }
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            player: default_native_player(),
            args: Vec::new(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            near_bottom_rows: default_near_bottom_rows(),
        }
    }
}

fn default_catalog_source() -> String {
    platform::config_dir()
        .join("channels.json")
        .display()
        .to_string()
}

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_NEAR_BOTTOM_THRESHOLD: f64 = 150.0;

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_near_bottom_threshold() -> f64 {
    DEFAULT_NEAR_BOTTOM_THRESHOLD
}

fn default_native_player() -> String {
    "ffplay".to_string()
}

fn default_near_bottom_rows() -> u16 {
    5
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load `path`, writing a default config there first if it does not exist.
    pub fn load_from(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        if config.list.page_size == 0 {
            tracing::warn!("config: list.page_size must be positive, using {}", DEFAULT_PAGE_SIZE);
            config.list.page_size = DEFAULT_PAGE_SIZE;
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
