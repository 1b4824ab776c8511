//! Mock generation
//!
//! Placeholder completions served when no engine is available or mock mode is
//! configured. Responses are deterministic and echo the request parameters.

use std::time::Duration;

use crate::i18n::Locale;

/// Simulated inference latency
pub const MOCK_LATENCY: Duration = Duration::from_millis(500);

/// Model name reported in mock mode
pub const MOCK_MODEL_NAME: &str = "Mock Tiny Llama Model";

/// Build the placeholder completion for a prompt
pub fn mock_completion(prompt: &str, max_tokens: u32, temperature: f32, locale: Locale) -> String {
    match locale {
        Locale::Ru => format!(
            "[ДЕМО РЕЖИМ] Ответ на запрос: \"{prompt}\"\n\n\
             Это демонстрационный ответ API без фактической загрузки модели. \
             В реальном режиме здесь будет ответ от модели Tiny Llama.\n\n\
             Параметры запроса: максимум токенов={max_tokens}, температура={temperature:.1}"
        ),
        Locale::En => format!(
            "[DEMO MODE] Response to prompt: \"{prompt}\"\n\n\
             This is a demonstration response served without loading a model. \
             With a real model loaded, Tiny Llama would answer here.\n\n\
             Request parameters: max tokens={max_tokens}, temperature={temperature:.1}"
        ),
    }
}
