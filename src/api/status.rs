//! Model status endpoint

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::i18n::{format_message, Locale};
use crate::types::model::ModelStatus;

#[derive(Debug, Default, Deserialize)]
pub struct LocaleQuery {
    pub locale: Option<String>,
}

impl LocaleQuery {
    pub fn locale(&self) -> Locale {
        self.locale.as_deref().map(Locale::parse).unwrap_or_default()
    }
}

/// Response for the status endpoint
#[derive(Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub model_status: ModelStatus,
}

/// Report whether the model is ready
///
/// The snapshot is an owned copy, so this never waits on a load or a
/// generation. An unreadable query string falls back to the default locale.
pub async fn get_status(
    State(state): State<AppState>,
    query: Result<Query<LocaleQuery>, QueryRejection>,
) -> Json<StatusResponse> {
    let locale = match query {
        Ok(Query(query)) => query.locale(),
        Err(rejection) => {
            tracing::debug!("Ignoring status query: {}", rejection.body_text());
            Locale::default()
        }
    };
    let model_status = state.lifecycle.status();

    let key = if model_status.loaded {
        "common.success"
    } else {
        "common.error"
    };
    Json(StatusResponse {
        status: format_message(locale, key).to_string(),
        model_status,
    })
}
