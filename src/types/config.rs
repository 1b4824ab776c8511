//! Configuration types
//!
//! Process-wide server configuration, read once from the environment at startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Variables that must be present for the server to start
pub const REQUIRED_VARS: [&str; 2] = ["PORT", "MODEL_PATH"];

/// Context window the model is loaded with; generation can never exceed it
pub const CONTEXT_SIZE: u32 = 2048;

/// Configuration errors, all fatal at startup
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: String, value: String },
}

/// Deployment mode, the `NODE_ENV` of this service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => RunMode::Production,
            _ => RunMode::Development,
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Development => write!(f, "development"),
            RunMode::Production => write!(f, "production"),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Deployment mode
    pub mode: RunMode,
    /// Path to the GGUF model file
    pub model_path: PathBuf,
    /// Default maximum number of tokens to generate
    pub max_tokens: u32,
    /// Default sampling temperature (0.0 - 2.0)
    pub temperature: f32,
    /// Serve synthesized responses instead of touching the engine
    pub mock_mode: bool,
    /// Number of layers to offload to the GPU (0 = CPU only)
    pub gpu_layers: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            mode: RunMode::Development,
            model_path: PathBuf::from("./models/tiny-llama-model"),
            max_tokens: 512,
            temperature: 0.7,
            mock_mode: false,
            gpu_layers: 0,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Every missing required variable is reported at once. Optional variables
    /// fall back to [`ServerConfig::default`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|&&name| get(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let defaults = Self::default();
        let mut config = Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", get("PORT"), defaults.port)?,
            mode: get("NODE_ENV")
                .or_else(|| get("RUN_MODE"))
                .map(|raw| RunMode::parse(&raw))
                .unwrap_or(defaults.mode),
            model_path: get("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            max_tokens: parse_var("MAX_TOKENS", get("MAX_TOKENS"), defaults.max_tokens)?,
            temperature: parse_var("TEMPERATURE", get("TEMPERATURE"), defaults.temperature)?,
            mock_mode: parse_flag(get("BYPASS_MODEL_CHECK")) || parse_flag(get("MOCK_MODE")),
            gpu_layers: parse_var("GPU_LAYERS", get("GPU_LAYERS"), defaults.gpu_layers)?,
        };

        config.validate();
        Ok(config)
    }

    /// Clamp defaults into the ranges generation accepts
    pub fn validate(&mut self) {
        if !(0.0..=2.0).contains(&self.temperature) {
            let clamped = if self.temperature.is_nan() {
                0.7
            } else {
                self.temperature.clamp(0.0, 2.0)
            };
            tracing::warn!(
                "TEMPERATURE {} out of range, using {}",
                self.temperature,
                clamped
            );
            self.temperature = clamped;
        }

        let capped = self.max_tokens.clamp(1, CONTEXT_SIZE);
        if capped != self.max_tokens {
            tracing::warn!("MAX_TOKENS {} out of range, using {}", self.max_tokens, capped);
            self.max_tokens = capped;
        }
    }

    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name: name.to_string(),
            value,
        }),
    }
}

fn parse_flag(raw: Option<String>) -> bool {
    matches!(
        raw.as_deref().map(str::trim),
        Some("true") | Some("1") | Some("yes")
    )
}
