//! Readiness endpoint.
//!
//! Liveness (`/health`) comes from `panelpay-web`; readiness needs the store.

use axum::{Json, extract::State, http::StatusCode};
use panelpay_core::store::PaymentStore;
use serde::Serialize;
use std::sync::Arc;

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness status
    pub ready: bool,
    /// Database connectivity
    pub database: bool,
}

/// Readiness check endpoint.
///
/// Returns 200 when the database answers, 503 otherwise.
///
/// ```bash
/// curl http://localhost:8080/ready
/// # {"ready":true,"database":true}
/// ```
pub async fn readiness_check(
    State(store): State<Arc<dyn PaymentStore>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                ready: true,
                database: true,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    ready: false,
                    database: false,
                }),
            )
        }
    }
}
