use crate::provider::ProviderKind;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStrategy {
    /// Uniform random choice among the eligible providers.
    Random,
    /// Day of month modulo the number of eligible providers.
    #[serde(alias = "round-robin")]
    #[value(alias = "round-robin")]
    Rotation,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CategoryConfig {
    pub name: String,
    pub query: String,
    pub max_width: u32,
    pub daily_cap: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderSettings {
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_max_page")]
    pub max_page: u32,
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
}

impl ProviderSettings {
    pub fn endpoint(&self, kind: ProviderKind) -> String {
        self.endpoints
            .get(kind.config_key())
            .cloned()
            .unwrap_or_else(|| kind.default_endpoint().to_string())
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            per_page: default_per_page(),
            max_page: default_max_page(),
            endpoints: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub index_path: String,
    pub images_directory: String,
    #[serde(default = "default_selection")]
    pub selection: SelectionStrategy,
    pub log_level: String,
    #[serde(default = "default_search_timeout")]
    pub search_timeout_secs: u64,
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    pub allowed_extensions: HashSet<String>,
    #[serde(default)]
    pub providers: ProviderSettings,
    pub categories: Vec<CategoryConfig>,
}

impl AppConfig {
    pub fn new(config_dir: &Path) -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        let layer = |name: &str| config_dir.join(name).to_string_lossy().into_owned();

        let s = Config::builder()
            .add_source(File::with_name(&layer("default")))
            .add_source(File::with_name(&layer(&env)).required(false))
            .add_source(File::with_name(&layer("local")).required(false))
            .build()?;

        s.try_deserialize()
    }

    #[cfg(test)]
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(contents, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

/// API keys taken from the process environment. A provider without a key is
/// not eligible for selection.
#[derive(Debug, Clone, Default)]
pub struct ProviderKeys {
    keys: Vec<(ProviderKind, String)>,
}

impl ProviderKeys {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let keys = ProviderKind::ALL
            .iter()
            .filter_map(|kind| {
                lookup(kind.env_var())
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty())
                    .map(|key| (*kind, key))
            })
            .collect();
        Self { keys }
    }

    /// Configured keys, in the fixed provider order.
    pub fn iter(&self) -> impl Iterator<Item = (ProviderKind, &str)> {
        self.keys.iter().map(|(kind, key)| (*kind, key.as_str()))
    }
}

fn default_selection() -> SelectionStrategy {
    SelectionStrategy::Rotation
}

fn default_search_timeout() -> u64 {
    15
}

fn default_download_timeout() -> u64 {
    20
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_per_page() -> u32 {
    10
}

fn default_max_page() -> u32 {
    50
}
