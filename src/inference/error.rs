//! API-facing error taxonomy
//!
//! Every failure the orchestration layer reports maps to one [`ErrorKind`].
//! Engine failures are normalized into these kinds before leaving the
//! inference module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error kinds surfaced to API consumers
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum ErrorKind {
    /// The prompt was absent or blank
    #[error("Missing required parameter \"prompt\"")]
    MissingPrompt,
    /// maxTokens or temperature outside the accepted range
    #[error("Invalid request parameters: {0}")]
    InvalidParameters(String),
    /// No model is ready to serve generation requests
    #[error("Model not initialized")]
    ModelNotInitialized,
    /// The configured model path does not exist (load time only)
    #[error("Model not found at the specified path")]
    ModelNotFound,
    /// The engine rejected the model file (load time only)
    #[error("Model load failed: {0}")]
    ModelLoadFailed(String),
    /// The engine binding cannot generate at all
    #[error("Inference engine misconfigured: {0}")]
    EngineMisconfigured(String),
    /// The engine failed while generating
    #[error("{0}")]
    GenerationError(String),
}

impl ErrorKind {
    /// Stable error code used in JSON error bodies
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::MissingPrompt => "missing_prompt",
            ErrorKind::InvalidParameters(_) => "invalid_params",
            ErrorKind::ModelNotInitialized => "model_not_loaded",
            ErrorKind::ModelNotFound => "model_not_found",
            ErrorKind::ModelLoadFailed(_) => "model_load_failed",
            ErrorKind::EngineMisconfigured(_) | ErrorKind::GenerationError(_) => {
                "generation_error"
            }
        }
    }

    /// Catalog key of the localized message, if the kind has one
    ///
    /// Kinds carrying an engine message pass that message through instead.
    pub fn message_key(&self) -> Option<&'static str> {
        match self {
            ErrorKind::MissingPrompt => Some("api.validation.missingPrompt"),
            ErrorKind::InvalidParameters(_) => Some("api.validation.invalidParams"),
            ErrorKind::ModelNotInitialized => Some("api.errors.modelNotInitialized"),
            ErrorKind::ModelNotFound => Some("model.notFound"),
            ErrorKind::ModelLoadFailed(_)
            | ErrorKind::EngineMisconfigured(_)
            | ErrorKind::GenerationError(_) => None,
        }
    }

    /// Whether the caller, not the server, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, ErrorKind::MissingPrompt | ErrorKind::InvalidParameters(_))
    }
}
