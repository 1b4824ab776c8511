//! Localized message catalog
//!
//! Russian is the primary locale, English the secondary one. Lookups use
//! dotted keys such as `api.errors.serverError`; a key with no entry resolves
//! to the key itself.

use serde::{Deserialize, Serialize};

/// Supported response locales
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ru,
    En,
}

impl Locale {
    /// Parse a locale tag, falling back to the primary locale
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en-gb" => Locale::En,
            _ => Locale::Ru,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Ru => "ru",
            Locale::En => "en",
        }
    }
}

const RU: &[(&str, &str)] = &[
    ("common.welcome", "Добро пожаловать в API для Tiny Llama"),
    ("common.error", "Ошибка"),
    ("common.success", "Успех"),
    ("model.notFound", "Модель не найдена по указанному пути"),
    ("model.inference.start", "Начало генерации текста"),
    ("model.inference.complete", "Генерация текста завершена"),
    ("model.inference.error", "Ошибка при генерации текста"),
    ("api.validation.missingPrompt", "Отсутствует обязательный параметр \"prompt\""),
    ("api.validation.invalidParams", "Неверные параметры запроса"),
    ("api.errors.serverError", "Внутренняя ошибка сервера"),
    ("api.errors.modelNotInitialized", "Модель не инициализирована"),
];

const EN: &[(&str, &str)] = &[
    ("common.welcome", "Welcome to Tiny Llama API"),
    ("common.error", "Error"),
    ("common.success", "Success"),
    ("model.notFound", "Model not found at the specified path"),
    ("model.inference.start", "Text generation started"),
    ("model.inference.complete", "Text generation completed"),
    ("model.inference.error", "Error during text generation"),
    ("api.validation.missingPrompt", "Missing required parameter \"prompt\""),
    ("api.validation.invalidParams", "Invalid request parameters"),
    ("api.errors.serverError", "Internal server error"),
    ("api.errors.modelNotInitialized", "Model not initialized"),
];

fn table(locale: Locale) -> &'static [(&'static str, &'static str)] {
    match locale {
        Locale::Ru => RU,
        Locale::En => EN,
    }
}

/// Resolve a message key in the given locale
///
/// Returns the key unchanged when no entry exists.
pub fn format_message<'a>(locale: Locale, key: &'a str) -> &'a str {
    match table(locale).iter().find(|(k, _)| *k == key) {
        Some((_, message)) => message,
        None => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_per_locale() {
        assert_eq!(format_message(Locale::En, "common.success"), "Success");
        assert_eq!(format_message(Locale::Ru, "common.success"), "Успех");
        assert_eq!(
            format_message(Locale::En, "api.errors.modelNotInitialized"),
            "Model not initialized"
        );
    }

    #[test]
    fn test_log_messages_resolve() {
        for key in [
            "model.notFound",
            "model.inference.start",
            "model.inference.complete",
            "model.inference.error",
        ] {
            assert_ne!(format_message(Locale::Ru, key), key);
            assert_ne!(format_message(Locale::En, key), key);
        }
        assert_eq!(
            format_message(Locale::default(), "model.inference.start"),
            "Начало генерации текста"
        );
    }

    #[test]
    fn test_unknown_key_falls_back_to_key() {
        assert_eq!(format_message(Locale::En, "api.errors.nope"), "api.errors.nope");
        assert_eq!(format_message(Locale::Ru, "common"), "common");
    }

    #[test]
    fn test_catalogs_cover_same_keys() {
        for (key, _) in RU {
            assert!(EN.iter().any(|(k, _)| k == key), "missing en entry for {key}");
        }
        assert_eq!(RU.len(), EN.len());
    }

    #[test]
    fn test_locale_parse() {
        assert_eq!(Locale::parse("en"), Locale::En);
        assert_eq!(Locale::parse("EN"), Locale::En);
        assert_eq!(Locale::parse("ru"), Locale::Ru);
        assert_eq!(Locale::parse("de"), Locale::Ru);
    }
}
