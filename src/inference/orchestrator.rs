//! Inference orchestration
//!
//! Turns a [`GenerationRequest`] into a [`GenerationResult`]. Cheap request
//! checks run before any model state is consulted; the mock and engine paths
//! share one dispatch point and produce the same result shape.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::i18n::{format_message, Locale};
use crate::inference::engine::{EngineError, SamplingParams};
use crate::inference::error::ErrorKind;
use crate::inference::lifecycle::{Backend, ModelLifecycleManager, SharedEngine};
use crate::inference::mock::{mock_completion, MOCK_LATENCY};
use crate::inference::streaming::collect_stream;
use crate::types::config::ServerConfig;
use crate::types::generation::{GenerationRequest, GenerationResult};

/// Dispatches generation requests to the mock path or the engine
pub struct InferenceOrchestrator {
    config: Arc<ServerConfig>,
    lifecycle: Arc<ModelLifecycleManager>,
    mock_latency: Duration,
}

impl InferenceOrchestrator {
    pub fn new(config: Arc<ServerConfig>, lifecycle: Arc<ModelLifecycleManager>) -> Self {
        Self {
            config,
            lifecycle,
            mock_latency: MOCK_LATENCY,
        }
    }

    /// Override the simulated mock latency
    pub fn with_mock_latency(mut self, latency: Duration) -> Self {
        self.mock_latency = latency;
        self
    }

    /// Generate a completion
    ///
    /// At most one generation runs against the engine at a time. Once engine
    /// work has started it runs to completion even if the returned future is
    /// dropped; there is no timeout on the engine call.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, ErrorKind> {
        request.validate()?;
        let backend = self.lifecycle.backend()?;

        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);
        let temperature = request.temperature.unwrap_or(self.config.temperature);
        let request_id = Uuid::new_v4();
        let span = info_span!("generate", %request_id, max_tokens, temperature);

        async move {
            let result = match backend {
                Backend::Mock => {
                    self.generate_mock(&request.prompt, max_tokens, temperature, request.locale)
                        .await
                }
                Backend::Engine(engine) => {
                    let params = SamplingParams::new(max_tokens, temperature);
                    self.generate_with_engine(engine, request.prompt.clone(), params)
                        .await
                }
            };

            match &result {
                Ok(result) => info!(
                    "{}: {} ms, ~{} tokens",
                    format_message(Locale::default(), "model.inference.complete"),
                    result.inference_time_ms,
                    result.tokens_generated
                ),
                Err(e) => error!(
                    "{}: {}",
                    format_message(Locale::default(), "model.inference.error"),
                    e
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn generate_mock(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
        locale: Locale,
    ) -> Result<GenerationResult, ErrorKind> {
        debug!("Serving mock completion");
        let start = tokio::time::Instant::now();
        tokio::time::sleep(self.mock_latency).await;
        let text = mock_completion(prompt, max_tokens, temperature, locale);
        Ok(GenerationResult::new(
            text.trim_start().to_string(),
            start.elapsed().as_millis() as u64,
        ))
    }

    async fn generate_with_engine(
        &self,
        engine: SharedEngine,
        prompt: String,
        params: SamplingParams,
    ) -> Result<GenerationResult, ErrorKind> {
        let guard = engine.lock_owned().await;
        info!("{}", format_message(Locale::default(), "model.inference.start"));

        // The guard moves into the blocking task, so the engine stays locked
        // until generation finishes regardless of what happens to the caller.
        let outcome = tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let stream = guard.generate(&prompt, &params).map_err(classify_start_error)?;
            let text = collect_stream(stream)
                .map_err(|e| ErrorKind::GenerationError(e.to_string()))?;
            Ok::<_, ErrorKind>((text, start.elapsed()))
        })
        .await;

        let (text, elapsed) = match outcome {
            Ok(result) => result?,
            Err(e) => {
                return Err(ErrorKind::GenerationError(format!(
                    "inference task failed: {e}"
                )))
            }
        };

        Ok(GenerationResult::new(
            text.trim_start().to_string(),
            elapsed.as_millis() as u64,
        ))
    }
}

fn classify_start_error(err: EngineError) -> ErrorKind {
    match err {
        EngineError::Unsupported(_) | EngineError::NotLoaded => {
            ErrorKind::EngineMisconfigured(err.to_string())
        }
        other => ErrorKind::GenerationError(other.to_string()),
    }
}
