//! Local AI backend for CodeMentor using llama.cpp.
//!
//! This crate owns everything needed to run a completion model on the local
//! machine: fetching GGUF weights from the Hugging Face Hub, supervising a
//! `llama-server` child process, and talking to its OpenAI-compatible
//! completion endpoint.

mod client;
mod error;
mod model;
pub mod paths;
mod server;

pub use client::{CompletionOptions, LlamaCppClient};
pub use error::LocalAIError;
pub use model::{ModelInfo, ModelManager};
pub use server::{LlamaCppServer, ServerSettings};

/// Default port for the local llama-server instance.
pub const DEFAULT_PORT: u16 = 11435;

/// Default Hugging Face repository holding the model weights.
pub const DEFAULT_REPO_ID: &str = "TheBloke/CodeLlama-7B-Instruct-GGUF";

/// Default model filename inside [`DEFAULT_REPO_ID`].
pub const DEFAULT_MODEL_FILENAME: &str = "codellama-7b-instruct.Q4_K_M.gguf";

/// Default model name shown to users.
pub const DEFAULT_MODEL_NAME: &str = "codellama-7b-instruct";
