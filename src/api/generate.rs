//! Text generation endpoint

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::app::AppState;
use crate::i18n::Locale;
use crate::types::generation::GenerationRequest;

/// Request body of `POST /api/generate`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub locale: Option<String>,
}

impl GenerateBody {
    fn into_request(self) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt.unwrap_or_default(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            locale: self.locale.as_deref().map(Locale::parse).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateStats {
    pub inference_time_ms: u64,
    pub tokens_generated: usize,
}

/// Response of `POST /api/generate`
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub generated_text: String,
    pub stats: GenerateStats,
}

/// Read the request body
///
/// A body that is empty or not declared as JSON counts as an empty object, so
/// the missing prompt is reported instead of a parse error.
fn parse_body(headers: &HeaderMap, bytes: &[u8]) -> Result<GenerateBody, serde_json::Error> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            let mime = value.split(';').next().unwrap_or_default().trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
        .unwrap_or(false);

    if !is_json || bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(GenerateBody::default());
    }
    serde_json::from_slice(bytes)
}

/// Generate text from a prompt
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    let body = parse_body(&headers, &bytes).map_err(|e| {
        tracing::warn!("Rejected generate body: {}", e);
        ApiError::invalid_body(Locale::default(), e)
    })?;
    let request = body.into_request();
    let locale = request.locale;

    let result = state
        .orchestrator
        .generate(&request)
        .await
        .map_err(|kind| ApiError::from_kind(&kind, locale))?;

    Ok(Json(GenerateResponse {
        generated_text: result.text,
        stats: GenerateStats {
            inference_time_ms: result.inference_time_ms,
            tokens_generated: result.tokens_generated,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn json_headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn test_empty_or_untyped_body_is_empty_object() {
        let body = parse_body(&HeaderMap::new(), b"").unwrap();
        assert!(body.prompt.is_none());

        let body = parse_body(&HeaderMap::new(), br#"{"prompt":"hi"}"#).unwrap();
        assert!(body.prompt.is_none());

        let body = parse_body(&json_headers("application/json"), b"  \n").unwrap();
        assert!(body.prompt.is_none());
    }

    #[test]
    fn test_json_body_parsed() {
        let body = parse_body(
            &json_headers("application/json; charset=utf-8"),
            br#"{"prompt":"hi","maxTokens":5,"locale":"EN"}"#,
        )
        .unwrap();
        let request = body.into_request();
        assert_eq!(request.prompt, "hi");
        assert_eq!(request.max_tokens, Some(5));
        assert_eq!(request.locale, Locale::En);
    }

    #[test]
    fn test_bad_json_rejected() {
        let headers = json_headers("application/json");
        assert!(parse_body(&headers, b"{not json").is_err());
        assert!(parse_body(&headers, br#"{"maxTokens":-3}"#).is_err());
    }
}
