//! API routes and handlers

pub mod error;
mod generate;
mod status;

use axum::{
    extract::Query,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::error::ApiError;
use crate::api::status::LocaleQuery;
use crate::app::AppState;
use crate::i18n::format_message;

pub use generate::{GenerateBody, GenerateResponse, GenerateStats};
pub use status::StatusResponse;

/// Service banner
#[derive(Serialize)]
pub struct BannerResponse {
    pub message: String,
    pub docs: &'static str,
    pub version: &'static str,
}

async fn banner(Query(query): Query<LocaleQuery>) -> Json<BannerResponse> {
    Json(BannerResponse {
        message: format_message(query.locale(), "common.welcome").to_string(),
        docs: "/api-docs",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/status", get(status::get_status))
        .route("/generate", post(generate::generate));

    Router::new()
        .route("/", get(banner))
        .nest("/api", api_routes)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
