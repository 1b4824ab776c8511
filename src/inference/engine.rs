//! Engine capability contract
//!
//! The native runtime is reached only through [`EngineCapability`]: one `load`
//! and one `generate`. The concrete binding is picked once at startup; nothing
//! probes the engine per call.

use std::path::Path;
use thiserror::Error;

use crate::types::config::CONTEXT_SIZE;

/// Top-k sampling cutoff applied to every request
pub const TOP_K: i32 = 40;
/// Nucleus sampling threshold applied to every request
pub const TOP_P: f32 = 0.95;
/// Repetition penalty applied to every request
pub const REPEAT_PENALTY: f32 = 1.1;

/// Errors raised by an engine binding
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Backend initialization failed: {0}")]
    Backend(String),
    #[error("Failed to load model: {0}")]
    Load(String),
    #[error("No model loaded")]
    NotLoaded,
    #[error("Generation unsupported: {0}")]
    Unsupported(String),
    #[error("Tokenization failed: {0}")]
    Tokenize(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("{0}")]
    Generation(String),
}

/// Parameters a model is loaded with
///
/// Fixed for the process; not configurable per request.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadParams {
    pub context_size: u32,
    pub seed: u32,
    /// Keep the key/value cache in 16-bit floats
    pub f16_kv: bool,
    /// Compute logits for every prompt token rather than only the last one
    pub logits_all: bool,
    /// Emit the runtime's own log output
    pub verbose: bool,
}

impl Default for LoadParams {
    fn default() -> Self {
        Self {
            context_size: CONTEXT_SIZE,
            seed: 0,
            f16_kv: true,
            logits_all: false,
            verbose: false,
        }
    }
}

/// Sampling parameters for one generation
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_k: i32,
    pub top_p: f32,
    pub repeat_penalty: f32,
}

impl SamplingParams {
    /// Request-controlled values plus the fixed sampling policy
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            max_tokens,
            temperature,
            top_k: TOP_K,
            top_p: TOP_P,
            repeat_penalty: REPEAT_PENALTY,
        }
    }
}

/// What a successful load reports back
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModel {
    pub name: String,
}

/// Lazy, finite, non-restartable sequence of generated text fragments
pub type TokenStream<'a> = Box<dyn Iterator<Item = Result<String, EngineError>> + 'a>;

/// Capability exposed by an inference runtime
///
/// Implementations are driven from a blocking thread and never invoked
/// concurrently; the lifecycle manager holds them behind a mutex.
pub trait EngineCapability: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Load the model file at `path`
    fn load(&mut self, path: &Path, params: &LoadParams) -> Result<LoadedModel, EngineError>;

    /// Start generating a continuation of `prompt`
    ///
    /// Errors returned here mean generation never started; errors yielded by
    /// the stream mean it failed midway.
    fn generate<'a>(
        &'a self,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<TokenStream<'a>, EngineError>;
}

/// Name a model after its file when the runtime reports none
pub fn model_name_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("model")
        .to_string()
}
