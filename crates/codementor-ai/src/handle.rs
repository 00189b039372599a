//! Lazily loaded, shared model handle.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tracing::info;

use crate::engine::{EngineError, EngineLoader, InferenceEngine, RawCompletion};
use crate::mode::GenerationParameters;

/// Owns the inference engine for the lifetime of the process.
///
/// The engine is loaded at most once, even under concurrent first calls. A
/// failed load leaves the handle empty so a later call can try again.
pub struct ModelHandle {
    loader: Option<Box<dyn EngineLoader>>,
    engine: OnceCell<Arc<dyn InferenceEngine>>,
    gate: Mutex<()>,
}

impl ModelHandle {
    /// Handle that loads its engine on first use.
    pub fn new(loader: impl EngineLoader + 'static) -> Self {
        Self {
            loader: Some(Box::new(loader)),
            engine: OnceCell::new(),
            gate: Mutex::new(()),
        }
    }

    /// Handle around an engine that is already loaded.
    pub fn with_engine(engine: Arc<dyn InferenceEngine>) -> Self {
        Self {
            loader: None,
            engine: OnceCell::new_with(Some(engine)),
            gate: Mutex::new(()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.initialized()
    }

    /// Load the engine if needed.
    pub async fn engine(&self) -> Result<&Arc<dyn InferenceEngine>, EngineError> {
        self.engine
            .get_or_try_init(|| async {
                let loader = self.loader.as_ref().ok_or_else(|| {
                    EngineError::ModelUnavailable("no model loader configured".to_string())
                })?;
                info!("Loading model...");
                let engine = loader.load().await?;
                info!("Model loaded");
                Ok(engine)
            })
            .await
    }

    /// Exclusive access to the loaded engine for one completion.
    pub async fn acquire(&self) -> Result<EngineGuard<'_>, EngineError> {
        let engine = self.engine().await?;
        let guard = self.gate.lock().await;
        Ok(EngineGuard {
            engine,
            _guard: guard,
        })
    }
}

/// Serialized access to the engine; released on drop.
pub struct EngineGuard<'a> {
    engine: &'a Arc<dyn InferenceEngine>,
    _guard: MutexGuard<'a, ()>,
}

impl EngineGuard<'_> {
    pub async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParameters,
    ) -> Result<RawCompletion, EngineError> {
        self.engine.complete(prompt, params).await
    }
}
