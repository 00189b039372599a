//! Inference engine abstraction and the llama.cpp-backed implementation.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use codementor_local_ai::{
    CompletionOptions, LlamaCppClient, LlamaCppServer, LocalAIError, ModelManager,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AssistantConfig;
use crate::mode::GenerationParameters;

/// Unprocessed engine output for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCompletion {
    Text(String),
    /// The engine answered without any choices.
    Empty,
}

impl RawCompletion {
    pub fn as_str(&self) -> &str {
        match self {
            RawCompletion::Text(text) => text,
            RawCompletion::Empty => "",
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl From<Option<String>> for RawCompletion {
    fn from(text: Option<String>) -> Self {
        text.map(RawCompletion::Text).unwrap_or(RawCompletion::Empty)
    }
}

/// Errors from loading or calling an engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("local AI error: {0}")]
    Backend(#[from] LocalAIError),
    #[error("model not available: {0}")]
    ModelUnavailable(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// A text-completion capability.
///
/// Implementations handle one completion at a time; callers serialize access
/// through [`crate::ModelHandle`].
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParameters,
    ) -> Result<RawCompletion, EngineError>;
}

/// Produces the engine on first use.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn InferenceEngine>, EngineError>;
}

impl From<&GenerationParameters> for CompletionOptions {
    fn from(params: &GenerationParameters) -> Self {
        CompletionOptions {
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stop: params.stop.clone(),
        }
    }
}

/// Engine talking to a llama-server, optionally owning its process.
pub struct LocalEngine {
    client: LlamaCppClient,
    // Dropping the engine stops a server we spawned.
    _server: Option<LlamaCppServer>,
}

impl LocalEngine {
    /// Engine for a server managed elsewhere.
    pub fn remote(client: LlamaCppClient) -> Self {
        Self {
            client,
            _server: None,
        }
    }

    /// Engine owning a running server process.
    pub fn spawned(server: LlamaCppServer) -> Self {
        Self {
            client: server.client(),
            _server: Some(server),
        }
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }
}

#[async_trait]
impl InferenceEngine for LocalEngine {
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParameters,
    ) -> Result<RawCompletion, EngineError> {
        let options = CompletionOptions::from(params);
        let text = self.client.complete(prompt, &options).await?;
        Ok(RawCompletion::from(text))
    }
}

/// Loads the local model described by an [`AssistantConfig`].
pub struct LocalLoader {
    config: AssistantConfig,
}

impl LocalLoader {
    pub fn new(config: AssistantConfig) -> Self {
        Self { config }
    }

    /// Resolve the model file, downloading it when allowed.
    pub async fn resolve_model(&self) -> Result<PathBuf, EngineError> {
        if let Some(path) = &self.config.model_path {
            if path.exists() {
                return Ok(path.clone());
            }
            return Err(EngineError::ModelUnavailable(format!(
                "model file {} does not exist",
                path.display()
            )));
        }

        let manager = ModelManager::with_dir(&self.config.models_dir);
        let model = self.config.model_info();

        if let Some(path) = manager.get_model_path(&model.filename) {
            return Ok(path);
        }
        if !self.config.auto_download {
            return Err(LocalAIError::ModelNotFound(model.filename).into());
        }
        Ok(manager.ensure(&model).await?)
    }
}

#[async_trait]
impl EngineLoader for LocalLoader {
    async fn load(&self) -> Result<Arc<dyn InferenceEngine>, EngineError> {
        if let Some(url) = &self.config.server_url {
            info!("Using external llama-server at {}", url);
            let client = LlamaCppClient::with_url(url.clone());
            client.check_health().await?;
            return Ok(Arc::new(LocalEngine::remote(client)));
        }

        let model_path = self.resolve_model().await?;
        debug!("Resolved model file {:?}", model_path);

        let mut server =
            LlamaCppServer::new(model_path).with_settings(self.config.server_settings());
        server.start()?;
        server.wait_ready(self.config.startup_timeout).await?;

        Ok(Arc::new(LocalEngine::spawned(server)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;
    use tempfile::tempdir;

    #[test]
    fn test_raw_completion_from_option() {
        assert_eq!(RawCompletion::from(None), RawCompletion::Empty);
        assert!(RawCompletion::Empty.is_empty());
        assert!(RawCompletion::Text("  \n".to_string()).is_empty());
        assert_eq!(RawCompletion::from(Some("x".to_string())).as_str(), "x");
    }

    #[test]
    fn test_parameters_to_options() {
        let options = CompletionOptions::from(&Mode::Explain.parameters());
        assert_eq!(options.max_tokens, 400);
        assert_eq!(options.temperature, Some(0.3));
        assert_eq!(options.stop, vec!["</s>", "###"]);
    }

    #[tokio::test]
    async fn test_resolve_explicit_model_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m.gguf");
        std::fs::write(&path, b"x").unwrap();

        let loader = LocalLoader::new(AssistantConfig::builder().model_path(&path).build());
        assert_eq!(loader.resolve_model().await.unwrap(), path);

        let loader = LocalLoader::new(
            AssistantConfig::builder()
                .model_path(dir.path().join("missing.gguf"))
                .build(),
        );
        assert!(matches!(
            loader.resolve_model().await,
            Err(EngineError::ModelUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_without_download() {
        let dir = tempdir().unwrap();
        let config = AssistantConfig::builder()
            .models_dir(dir.path())
            .model_filename("absent.gguf")
            .auto_download(false)
            .build();
        let result = LocalLoader::new(config).resolve_model().await;
        assert!(matches!(
            result,
            Err(EngineError::Backend(LocalAIError::ModelNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_resolve_installed_model() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("here.gguf"), b"x").unwrap();
        let config = AssistantConfig::builder()
            .models_dir(dir.path())
            .model_filename("here.gguf")
            .auto_download(false)
            .build();
        let path = LocalLoader::new(config).resolve_model().await.unwrap();
        assert_eq!(path, dir.path().join("here.gguf"));
    }
}
