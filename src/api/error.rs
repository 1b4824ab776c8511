//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::i18n::{format_message, Locale};
use crate::inference::ErrorKind;

/// Error rendered as `{ "error": code, "message": message }`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    /// Render an orchestration error in the caller's locale
    pub fn from_kind(kind: &ErrorKind, locale: Locale) -> Self {
        let status = match kind {
            ErrorKind::MissingPrompt | ErrorKind::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            ErrorKind::ModelNotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match (kind.message_key(), kind) {
            (Some(key), ErrorKind::InvalidParameters(detail)) => {
                format!("{}: {}", format_message(locale, key), detail)
            }
            (Some(key), _) => format_message(locale, key).to_string(),
            (None, _) => kind.to_string(),
        };
        Self {
            status,
            code: kind.code(),
            message,
        }
    }

    /// The request body could not be read
    pub fn invalid_body(locale: Locale, detail: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_params",
            message: format!(
                "{}: {}",
                format_message(locale, "api.validation.invalidParams"),
                detail
            ),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}
