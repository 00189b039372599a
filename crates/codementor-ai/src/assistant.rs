//! The assistant facade: prompt → engine → normalizer → artifact.

use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{AssistantConfig, ConfigError};
use crate::engine::{EngineError, LocalLoader};
use crate::handle::ModelHandle;
use crate::mode::{GenerationRequest, Mode, UserLevel};
use crate::normalize::{self, Normalizer};
use crate::prompt;

/// Prefix of warning texts.
pub const WARNING_TAG: &str = "⚠️";

/// Prefix of error texts.
pub const ERROR_TAG: &str = "❌";

/// Errors that cross the facade. Everything else becomes an artifact.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("inference engine unavailable: {0}")]
    EngineUnavailable(#[source] EngineError),
}

/// How an artifact came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactStatus {
    /// Normalized model output.
    Generated,
    /// The model produced nothing usable; a fallback text.
    Fallback,
    /// The engine call failed; the mode's fallback text.
    Warning,
}

/// Final, mode-shaped output of one operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub mode: Mode,
    pub text: String,
    pub status: ArtifactStatus,
    #[serde(serialize_with = "serialize_secs")]
    pub duration: Duration,
}

impl Artifact {
    pub fn is_generated(&self) -> bool {
        self.status == ArtifactStatus::Generated
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// Result of a health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Health {
    Ok,
    Error { detail: String },
}

/// Code assistant over a single shared model.
pub struct Assistant {
    handle: ModelHandle,
    normalizer: Normalizer,
}

impl Assistant {
    pub fn new(handle: ModelHandle, normalizer: Normalizer) -> Self {
        Self { handle, normalizer }
    }

    /// Assistant backed by the local llama.cpp model described by `config`.
    pub fn from_config(config: AssistantConfig) -> Result<Self, ConfigError> {
        let rules = config.load_leakage_rules()?;
        Ok(Self::new(
            ModelHandle::new(LocalLoader::new(config)),
            Normalizer::new(rules),
        ))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Load the model now instead of on the first request.
    pub async fn preload(&self) -> Result<(), AssistantError> {
        self.handle
            .engine()
            .await
            .map(|_| ())
            .map_err(AssistantError::EngineUnavailable)
    }

    /// Report whether the model can be loaded.
    pub async fn health(&self) -> Health {
        match self.preload().await {
            Ok(()) => Health::Ok,
            Err(e) => Health::Error {
                detail: e.to_string(),
            },
        }
    }

    /// Generate a short code snippet for a task.
    pub async fn generate(&self, task: &str, language: &str) -> Result<Artifact, AssistantError> {
        let request = GenerationRequest::new(Mode::Generate, task).with_language(language);
        self.run(&request).await
    }

    /// Suggest a continuation of existing code.
    pub async fn autocomplete(
        &self,
        code: &str,
        language: &str,
    ) -> Result<Artifact, AssistantError> {
        let request = GenerationRequest::new(Mode::Autocomplete, "")
            .with_language(language)
            .with_code(code);
        self.run(&request).await
    }

    /// Explain code to a developer of the given level.
    pub async fn explain(
        &self,
        task: &str,
        language: &str,
        code: &str,
        user_id: &str,
        user_level: UserLevel,
    ) -> Result<Artifact, AssistantError> {
        let request = GenerationRequest::new(Mode::Explain, task)
            .with_language(language)
            .with_code(code)
            .with_user_id(user_id)
            .with_user_level(user_level);
        self.run(&request).await
    }

    /// Produce code only, terminated by the language's end marker.
    pub async fn regenerate_code(
        &self,
        task: &str,
        language: &str,
        code: &str,
        user_id: &str,
    ) -> Result<Artifact, AssistantError> {
        let request = GenerationRequest::new(Mode::RegenerateCode, task)
            .with_language(language)
            .with_code(code)
            .with_user_id(user_id);
        self.run(&request).await
    }

    /// Run any request through the pipeline.
    ///
    /// Only a model that cannot be loaded is an error; engine failures and
    /// unusable output yield the mode's fallback text.
    pub async fn run(&self, request: &GenerationRequest) -> Result<Artifact, AssistantError> {
        let start = Instant::now();
        let mode = request.mode;
        let user = request.user_id.as_deref().unwrap_or("-");

        info!("{} request ({}) from {}", mode, request.language, user);

        let engine = self.handle.acquire().await.map_err(|e| {
            error!("Model unavailable for {} request: {}", mode, e);
            AssistantError::EngineUnavailable(e)
        })?;

        let prompt = prompt::build(request);
        let params = mode.parameters();
        debug!("Prompt for {} ({} chars)", mode, prompt.len());

        let outcome = engine.complete(&prompt, &params).await;
        drop(engine);

        let (text, status) = match outcome {
            Ok(raw) => {
                let text = self
                    .normalizer
                    .normalize(mode, &request.language, raw.as_str());
                if is_unusable(&text) {
                    warn!("{} produced no usable output, using fallback", mode);
                    (mode.fallback_text().to_string(), ArtifactStatus::Fallback)
                } else if text == normalize::MENTOR_FALLBACK {
                    warn!("{} produced no usable explanation, using fallback", mode);
                    (text, ArtifactStatus::Fallback)
                } else {
                    (text, ArtifactStatus::Generated)
                }
            }
            Err(e) => {
                error!("Inference failed for {} request: {}", mode, e);
                (mode.fallback_text().to_string(), ArtifactStatus::Warning)
            }
        };

        let duration = start.elapsed();
        info!("{} finished in {:.2?} ({:?})", mode, duration, status);

        Ok(Artifact {
            mode,
            text,
            status,
            duration,
        })
    }
}

fn is_unusable(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty()
        || trimmed.starts_with(WARNING_TAG)
        || trimmed.starts_with(ERROR_TAG)
        || normalize::is_bare_end_marker(trimmed)
}
