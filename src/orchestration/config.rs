// Studio configuration - service endpoints, models, pacing and storage

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE: &str = "lookbook.toml";
const HOME_CONFIG_FILE: &str = ".lookbook.toml";

/// Environment variables checked, in order, for the service API key
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudioConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Wait between consecutive synthesis calls
    #[serde(default = "default_pacing")]
    pub pacing_ms: u64,

    /// Where finished batches are stored (platform data dir when unset)
    #[serde(default)]
    pub history_dir: Option<PathBuf>,

    #[serde(default = "default_crop_long_edge")]
    pub crop_long_edge: u32,

    #[serde(default)]
    pub models: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    #[serde(default = "default_research_model")]
    pub research: String,

    #[serde(default = "default_thinking_model")]
    pub thinking: String,

    #[serde(default = "default_maps_model")]
    pub maps: String,

    #[serde(default = "default_lite_model")]
    pub lite: String,

    #[serde(default = "default_image_model")]
    pub image: String,

    #[serde(default = "default_pro_image_model")]
    pub pro_image: String,
}

fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_request_timeout() -> u64 {
    120_000
}

fn default_pacing() -> u64 {
    4_500
}

fn default_crop_long_edge() -> u32 {
    1024
}

fn default_research_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_thinking_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_maps_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_lite_model() -> String {
    "gemini-flash-lite-latest".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_pro_image_model() -> String {
    "gemini-3-pro-image-preview".to_string()
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_ms: default_request_timeout(),
            pacing_ms: default_pacing(),
            history_dir: None,
            crop_long_edge: default_crop_long_edge(),
            models: ModelConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            research: default_research_model(),
            thinking: default_thinking_model(),
            maps: default_maps_model(),
            lite: default_lite_model(),
            image: default_image_model(),
            pro_image: default_pro_image_model(),
        }
    }
}

impl StudioConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Load the first config found in the working directory or home
    /// directory, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = find_config() else {
            tracing::debug!("No {} found, using defaults", CONFIG_FILE);
            return Self::default();
        };

        match Self::from_file(&path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Resolved history directory
    pub fn history_location(&self) -> PathBuf {
        self.history_dir
            .clone()
            .or_else(super::history::HistoryStore::default_location)
            .unwrap_or_else(|| PathBuf::from(".lookbook/history"))
    }
}

/// Read the API key from the environment
pub fn api_key_from_env() -> Result<String, ConfigError> {
    API_KEY_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .ok_or(ConfigError::MissingApiKey)
}

fn find_config() -> Option<PathBuf> {
    let local_config = PathBuf::from(CONFIG_FILE);
    if local_config.exists() {
        return Some(local_config);
    }

    dirs::home_dir()
        .map(|home| home.join(HOME_CONFIG_FILE))
        .filter(|path| path.exists())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("No API key set (expected one of GEMINI_API_KEY, API_KEY)")]
    MissingApiKey,
}
