//! # CodeMentor AI
//!
//! Prompt construction and response normalization for a code assistant
//! backed by a local LLM.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────┐    ┌───────────────┐    ┌─────────────────┐    ┌────────────┐
//! │ GenerationRequest │ -> │ PromptBuilder │ -> │ InferenceEngine │ -> │ Normalizer │ -> Artifact
//! └───────────────────┘    └───────────────┘    └─────────────────┘    └────────────┘
//!                                                        │                    │
//!                                                  ┌─────┴───────┐     ┌──────┴───────┐
//!                                                  │ ModelHandle │     │ LeakageRules │
//!                                                  └─────────────┘     └──────────────┘
//! ```
//!
//! ## Modes
//!
//! - **generate** - short snippet from a task description
//! - **autocomplete** - continuation of existing code
//! - **explain** - mentor explanation in numbered steps with one limitation
//! - **regenerate_code** - code only, closed by an end marker
//!
//! ## Usage
//!
//! ```ignore
//! use codementor_ai::{Assistant, AssistantConfig};
//!
//! let assistant = Assistant::from_config(AssistantConfig::from_env())?;
//! let artifact = assistant.generate("reverse a string", "python").await?;
//! println!("{}", artifact.text);
//! ```

mod assistant;
pub mod classify;
mod config;
mod engine;
mod handle;
pub mod leakage;
mod mode;
pub mod normalize;
pub mod postprocess;
pub mod prompt;

pub use assistant::{
    Artifact, ArtifactStatus, Assistant, AssistantError, Health, ERROR_TAG, WARNING_TAG,
};
pub use classify::{classify, Sentiment};
pub use config::{AssistantConfig, AssistantConfigBuilder, ConfigError};
pub use engine::{
    EngineError, EngineLoader, InferenceEngine, LocalEngine, LocalLoader, RawCompletion,
};
pub use handle::{EngineGuard, ModelHandle};
pub use leakage::{LeakageRule, LeakageRules, RuleScope};
pub use mode::{
    GenerationParameters, GenerationRequest, Mode, UnknownUserLevel, UserLevel, DEFAULT_LANGUAGE,
    DEFAULT_STOP,
};
pub use normalize::Normalizer;

// Re-export local AI types
pub use codementor_local_ai::{
    paths as local_ai_paths, LlamaCppClient, LlamaCppServer, LocalAIError, ModelInfo, ModelManager,
    DEFAULT_MODEL_FILENAME, DEFAULT_MODEL_NAME, DEFAULT_PORT as DEFAULT_LOCAL_AI_PORT,
    DEFAULT_REPO_ID,
};
