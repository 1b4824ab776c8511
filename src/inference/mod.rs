//! LLM inference engine
//!
//! Model lifecycle, engine binding and generation orchestration.

pub mod engine;
pub mod error;
pub mod lifecycle;
#[cfg(feature = "llama")]
pub mod llama;
pub mod mock;
pub mod orchestrator;
pub mod streaming;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use engine::{EngineCapability, EngineError, LoadParams, SamplingParams};
pub use error::ErrorKind;
pub use lifecycle::ModelLifecycleManager;
pub use orchestrator::InferenceOrchestrator;

/// The engine binding compiled into this build, if any
pub fn default_engine(gpu_layers: u32) -> Option<Box<dyn EngineCapability>> {
    #[cfg(feature = "llama")]
    {
        Some(Box::new(llama::LlamaEngine::new(gpu_layers)))
    }

    #[cfg(not(feature = "llama"))]
    {
        let _ = gpu_layers;
        None
    }
}
