//! Generation types
//!
//! Request and result values exchanged with the inference orchestrator.

use crate::i18n::Locale;
use crate::inference::error::ErrorKind;

/// Upper bound of the accepted temperature range
pub const MAX_TEMPERATURE: f32 = 2.0;

/// A text generation request
///
/// `max_tokens` and `temperature` are `None` when the caller left them to the
/// configured defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub locale: Locale,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Check the request without looking at any model state
    ///
    /// The prompt is checked first; a whitespace-only prompt counts as missing.
    pub fn validate(&self) -> Result<(), ErrorKind> {
        if self.prompt.trim().is_empty() {
            return Err(ErrorKind::MissingPrompt);
        }
        if self.max_tokens == Some(0) {
            return Err(ErrorKind::InvalidParameters(
                "maxTokens must be greater than 0".to_string(),
            ));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
                return Err(ErrorKind::InvalidParameters(format!(
                    "temperature must be within [0, {MAX_TEMPERATURE}], got {temperature}"
                )));
            }
        }
        Ok(())
    }
}

/// Output of a successful generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub text: String,
    pub inference_time_ms: u64,
    /// Whitespace-delimited word count of `text`, an approximation of the
    /// number of tokens the engine produced
    pub tokens_generated: usize,
}

impl GenerationResult {
    /// Build a result, deriving the token estimate from the text
    pub fn new(text: String, inference_time_ms: u64) -> Self {
        let tokens_generated = approximate_token_count(&text);
        Self {
            text,
            inference_time_ms,
            tokens_generated,
        }
    }
}

/// Count whitespace-separated words
pub fn approximate_token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_estimate_is_word_count() {
        assert_eq!(approximate_token_count("a b c"), 3);
        assert_eq!(approximate_token_count("  a\n\tb  c  "), 3);
        assert_eq!(approximate_token_count(""), 0);
        assert_eq!(GenerationResult::new("a b c".to_string(), 10).tokens_generated, 3);
    }

    #[test]
    fn test_blank_prompt_is_missing() {
        assert_eq!(GenerationRequest::new("").validate(), Err(ErrorKind::MissingPrompt));
        assert_eq!(GenerationRequest::new(" \n\t ").validate(), Err(ErrorKind::MissingPrompt));
        // prompt check wins over parameter checks
        assert_eq!(
            GenerationRequest::new("").with_max_tokens(0).validate(),
            Err(ErrorKind::MissingPrompt)
        );
    }

    #[test]
    fn test_parameter_bounds() {
        assert!(GenerationRequest::new("hi").with_max_tokens(0).validate().is_err());
        assert!(GenerationRequest::new("hi").with_temperature(2.5).validate().is_err());
        assert!(GenerationRequest::new("hi").with_temperature(-0.1).validate().is_err());
        assert!(GenerationRequest::new("hi")
            .with_max_tokens(1)
            .with_temperature(0.0)
            .validate()
            .is_ok());
        assert!(GenerationRequest::new("hi").with_temperature(2.0).validate().is_ok());
    }
}
