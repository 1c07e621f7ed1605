//! API handlers for the circulation REST endpoints

pub mod extract;
pub mod health;
pub mod loans;
pub mod openapi;

use axum::{
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Envelope wrapping every successful response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: None,
        })
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: Some(message.into()),
        })
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Borrowings
        .route("/borrowings", get(loans::list_loans).post(loans::create_loan))
        .route("/borrowings/overdue/bulk-remind", post(loans::bulk_remind))
        .route("/borrowings/overdue/sync", post(loans::sync_overdue))
        .route("/borrowings/:id", get(loans::get_loan))
        .route("/borrowings/:id/return", put(loans::return_loan))
        .route("/borrowings/:id/fine", put(loans::settle_fine))
        .route("/borrowings/:id/remind", post(loans::remind_loan))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
