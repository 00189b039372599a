//! Assistant configuration.

use std::path::PathBuf;
use std::time::Duration;

use codementor_local_ai::{
    paths, ModelInfo, ServerSettings, DEFAULT_MODEL_FILENAME, DEFAULT_PORT, DEFAULT_REPO_ID,
};
use thiserror::Error;

use crate::leakage::LeakageRules;

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid pattern in leakage rule '{id}': {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },
}

/// Configuration for the assistant and its local model.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Hugging Face repository holding the weights
    pub repo_id: String,
    /// GGUF filename inside the repository
    pub model_filename: String,
    /// Directory downloaded models are stored in
    pub models_dir: PathBuf,
    /// Explicit model file; skips the download step
    pub model_path: Option<PathBuf>,
    /// Already-running llama-server; nothing is spawned when set
    pub server_url: Option<String>,
    pub port: u16,
    pub threads: u32,
    /// Context window in tokens
    pub ctx_size: u32,
    pub batch_size: u32,
    /// Whether a missing model is fetched on first use
    pub auto_download: bool,
    /// Extra leakage rules (JSON)
    pub leakage_rules: Option<PathBuf>,
    /// How long to wait for llama-server to report healthy
    pub startup_timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            repo_id: DEFAULT_REPO_ID.to_string(),
            model_filename: DEFAULT_MODEL_FILENAME.to_string(),
            models_dir: paths::models_dir(),
            model_path: None,
            server_url: None,
            port: DEFAULT_PORT,
            threads: 4,
            ctx_size: 512,
            batch_size: 128,
            auto_download: true,
            leakage_rules: None,
            startup_timeout: Duration::from_secs(120),
        }
    }
}

impl AssistantConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source. Unparseable numbers
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u32>().ok());

        Self {
            repo_id: lookup("HF_REPO_ID").unwrap_or(defaults.repo_id),
            model_filename: lookup("HF_FILENAME").unwrap_or(defaults.model_filename),
            models_dir: lookup("HF_LOCAL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.models_dir),
            model_path: lookup("MODEL_PATH").map(PathBuf::from),
            server_url: lookup("LLAMA_SERVER_URL").filter(|v| !v.trim().is_empty()),
            port: lookup("CODEMENTOR_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            threads: number("CODEMENTOR_THREADS").unwrap_or(defaults.threads),
            ctx_size: number("CODEMENTOR_CTX_SIZE").unwrap_or(defaults.ctx_size),
            batch_size: number("CODEMENTOR_BATCH_SIZE").unwrap_or(defaults.batch_size),
            auto_download: lookup("CODEMENTOR_AUTO_DOWNLOAD")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(defaults.auto_download),
            leakage_rules: lookup("CODEMENTOR_LEAKAGE_RULES").map(PathBuf::from),
            startup_timeout: number("CODEMENTOR_STARTUP_TIMEOUT_SECS")
                .map(|secs| Duration::from_secs(secs as u64))
                .unwrap_or(defaults.startup_timeout),
        }
    }

    /// Create a builder for configuration.
    pub fn builder() -> AssistantConfigBuilder {
        AssistantConfigBuilder::default()
    }

    /// Model to download when no explicit path is configured.
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo::from_hub(&self.repo_id, &self.model_filename)
    }

    /// llama-server runtime settings.
    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            port: self.port,
            ctx_size: self.ctx_size,
            threads: self.threads,
            batch_size: self.batch_size,
        }
    }

    /// Built-in leakage rules, extended by the configured rule file if any.
    pub fn load_leakage_rules(&self) -> Result<LeakageRules, ConfigError> {
        match &self.leakage_rules {
            Some(path) => LeakageRules::load(path),
            None => Ok(LeakageRules::default()),
        }
    }
}

/// Builder for assistant configuration.
#[derive(Debug, Default)]
pub struct AssistantConfigBuilder {
    config: AssistantConfig,
}

impl AssistantConfigBuilder {
    pub fn repo_id(mut self, repo_id: impl Into<String>) -> Self {
        self.config.repo_id = repo_id.into();
        self
    }

    pub fn model_filename(mut self, filename: impl Into<String>) -> Self {
        self.config.model_filename = filename.into();
        self
    }

    pub fn models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.models_dir = dir.into();
        self
    }

    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.model_path = Some(path.into());
        self
    }

    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = Some(url.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn threads(mut self, threads: u32) -> Self {
        self.config.threads = threads;
        self
    }

    pub fn auto_download(mut self, auto_download: bool) -> Self {
        self.config.auto_download = auto_download;
        self
    }

    pub fn leakage_rules(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.leakage_rules = Some(path.into());
        self
    }

    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.config.startup_timeout = timeout;
        self
    }

    pub fn build(self) -> AssistantConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::from_lookup(|_| None);
        assert_eq!(config.repo_id, DEFAULT_REPO_ID);
        assert_eq!(config.model_filename, DEFAULT_MODEL_FILENAME);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.ctx_size, 512);
        assert_eq!(config.threads, 4);
        assert_eq!(config.batch_size, 128);
        assert!(config.auto_download);
        assert!(config.server_url.is_none());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = AssistantConfig::from_lookup(lookup(&[
            ("HF_REPO_ID", "me/models"),
            ("HF_FILENAME", "tiny.gguf"),
            ("HF_LOCAL_DIR", "/tmp/models"),
            ("CODEMENTOR_THREADS", "8"),
            ("CODEMENTOR_PORT", "not-a-port"),
            ("CODEMENTOR_AUTO_DOWNLOAD", "false"),
            ("LLAMA_SERVER_URL", "http://gpu-box:8080"),
        ]));
        assert_eq!(config.repo_id, "me/models");
        assert_eq!(config.models_dir, PathBuf::from("/tmp/models"));
        assert_eq!(config.threads, 8);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.auto_download);
        assert_eq!(config.server_url.as_deref(), Some("http://gpu-box:8080"));
        assert_eq!(
            config.model_info().url,
            "https://huggingface.co/me/models/resolve/main/tiny.gguf"
        );
    }

    #[test]
    fn test_builder() {
        let config = AssistantConfig::builder()
            .port(9001)
            .threads(2)
            .auto_download(false)
            .build();
        let settings = config.server_settings();
        assert_eq!(settings.port, 9001);
        assert_eq!(settings.threads, 2);
        assert_eq!(settings.ctx_size, 512);
    }

    #[test]
    fn test_missing_rule_file_is_error() {
        let config = AssistantConfig::builder()
            .leakage_rules("/no/such/rules.json")
            .build();
        assert!(matches!(config.load_leakage_rules(), Err(ConfigError::Io(_))));
    }
}
