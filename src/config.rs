use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::backends::DEFAULT_COLLECTIONS;

const CONFIG_DIR: &str = ".mediarag";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub collections: CollectionsConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionsConfig {
    /// Collections registered for vector search
    #[serde(default = "default_registered")]
    pub registered: Vec<String>,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            registered: default_registered(),
        }
    }
}

fn default_registered() -> Vec<String> {
    DEFAULT_COLLECTIONS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of results to return
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Per-backend timeout in milliseconds
    #[serde(default = "default_backend_timeout_ms")]
    pub backend_timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            backend_timeout_ms: default_backend_timeout_ms(),
        }
    }
}

fn default_k() -> usize {
    5
}

fn default_backend_timeout_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// Embedding model name
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
        }
    }
}

fn default_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the LanceDB database (relative to .mediarag/)
    #[serde(default = "default_vector_path")]
    pub vector_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            vector_path: default_vector_path(),
        }
    }
}

fn default_vector_path() -> String {
    "vectors.lance".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable file logging
    #[serde(default)]
    pub file: bool,

    /// Enable stderr logging
    #[serde(default = "default_true")]
    pub stderr: bool,

    /// Log level for the file log: trace, debug, info, warn, error
    #[serde(default = "default_level")]
    pub level: String,

    /// Log directory (relative paths resolve against the data root)
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    /// Log file name prefix
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Rotation strategy: hourly, daily, minutely, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: false,
            stderr: default_true(),
            level: default_level(),
            directory: default_log_directory(),
            file_prefix: default_file_prefix(),
            rotation: default_rotation(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> PathBuf {
    PathBuf::from(".mediarag/logs")
}

fn default_file_prefix() -> String {
    "mediarag.log".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Config {
    /// Load configuration from the .mediarag directory
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;

            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", config_path))
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to the .mediarag directory
    pub fn save(&self, root: &Path) -> Result<()> {
        let config_dir = root.join(CONFIG_DIR);
        let config_path = config_dir.join(CONFIG_FILE);

        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory {:?}", config_dir))?;

        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        Ok(())
    }

    /// Get the path to the .mediarag data directory
    pub fn data_dir(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR)
    }

    /// Get the path to the LanceDB database
    pub fn vector_db_path(&self, root: &Path) -> PathBuf {
        Self::data_dir(root).join(&self.storage.vector_path)
    }
}
