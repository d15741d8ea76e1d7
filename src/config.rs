use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "OCADVISOR_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config at {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Sampling options forwarded verbatim to the model server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub temperature: f32,
    /// Context window size in tokens.
    pub num_ctx: u32,
    pub top_k: u32,
    pub top_p: f32,
    /// GPU layers to offload; -1 means all.
    pub num_gpu: i32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            num_ctx: 4096,
            top_k: 40,
            top_p: 0.9,
            num_gpu: -1,
        }
    }
}

/// What to do with a recommendation request whose model call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Store a diagnostic message as the recommendation text.
    #[default]
    RecordDiagnostic,
    /// Store nothing and report the failure to the caller.
    Suppress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm_model_name: String,
    pub ollama_base_url: String,
    /// "NVIDIA" or "AMD"; anything else disables GPU readings.
    pub gpu_brand: String,
    pub target_temperature_celsius: f64,
    /// Default goal when the user leaves it empty.
    pub priority: String,
    pub data_collection_interval_seconds: u64,
    pub app_data_dir: PathBuf,
    pub sampling: SamplingConfig,
    pub failure_policy: FailurePolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm_model_name: "llama3".to_string(),
            ollama_base_url: "http://localhost:11434".to_string(),
            gpu_brand: "NVIDIA".to_string(),
            target_temperature_celsius: 70.0,
            priority: "efficiency".to_string(),
            data_collection_interval_seconds: 10,
            app_data_dir: PathBuf::from("app_data"),
            sampling: SamplingConfig::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl AppConfig {
    /// Load `path`, or write the defaults there if it does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            info!(
                "Default config written to {}. Edit gpu_brand and llm_model_name before relying on it.",
                path.display()
            );
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }

    /// Config path from `OCADVISOR_CONFIG`, else `config.json`.
    pub fn path_from_env() -> PathBuf {
        std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn polling_interval(&self) -> Duration {
        if self.data_collection_interval_seconds == 0 {
            warn!("data_collection_interval_seconds is 0; using 1s");
            return Duration::from_secs(1);
        }
        Duration::from_secs(self.data_collection_interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = AppConfig::load_or_create(&path).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        let reloaded = AppConfig::load_or_create(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn partial_file_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"gpu_brand": "AMD", "data_collection_interval_seconds": 0}"#).unwrap();

        let config = AppConfig::load_or_create(&path).unwrap();
        assert_eq!(config.gpu_brand, "AMD");
        assert_eq!(config.llm_model_name, "llama3");
        assert_eq!(config.sampling.num_ctx, 4096);
        assert_eq!(config.polling_interval(), Duration::from_secs(1));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            AppConfig::load_or_create(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
