//! Application context
//!
//! One [`AppState`] is built at process start and cloned into every request
//! handler. It replaces any global model state.

use std::sync::Arc;

use crate::inference::{self, EngineCapability, InferenceOrchestrator, ModelLifecycleManager};
use crate::types::config::ServerConfig;

/// Shared state handed to the HTTP layer
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub lifecycle: Arc<ModelLifecycleManager>,
    pub orchestrator: Arc<InferenceOrchestrator>,
}

impl AppState {
    /// Build the context around an explicit engine binding
    pub fn new(config: ServerConfig, engine: Option<Box<dyn EngineCapability>>) -> Self {
        let config = Arc::new(config);
        let lifecycle = Arc::new(ModelLifecycleManager::new(config.clone(), engine));
        let orchestrator = Arc::new(InferenceOrchestrator::new(config.clone(), lifecycle.clone()));
        tracing::info!("AppState initialized");
        Self {
            config,
            lifecycle,
            orchestrator,
        }
    }

    /// Build the context with the engine compiled into this build
    pub fn with_default_engine(config: ServerConfig) -> Self {
        let engine = inference::default_engine(config.gpu_layers);
        Self::new(config, engine)
    }

    /// Replace the orchestrator, e.g. to shorten the mock latency
    pub fn with_orchestrator(mut self, orchestrator: InferenceOrchestrator) -> Self {
        self.orchestrator = Arc::new(orchestrator);
        self
    }
}
