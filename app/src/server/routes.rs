//! Router configuration.

use super::health::readiness_check;
use super::state::AppState;
use crate::api::{panels, payments, tickets, webhooks};
use axum::{
    Router,
    routing::{get, post},
};
use panelpay_web::handlers::health_check;

/// Build the complete Axum router.
///
/// Middleware (tracing, correlation ids) is layered by the caller so tests
/// can drive the bare router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Panels and domains
        .route("/panels", post(panels::create_panel))
        .route("/panels/:id", get(panels::get_panel))
        .route("/check-subdomain", post(panels::check_subdomain))
        .route("/verify-domain", post(panels::verify_domain))
        // Checkout
        .route("/payments/initiate", post(payments::initiate_payment))
        .route("/payment/process", post(payments::process_payment))
        // Reconciliation
        .route(
            "/payment/verify",
            post(payments::verify_payment).get(payments::payment_callback),
        )
        .route(
            "/webhooks/paystack",
            post(webhooks::paystack_webhook).get(webhooks::webhook_info),
        )
        .route(
            "/webhooks/etegram",
            post(webhooks::etegram_webhook).get(webhooks::webhook_info),
        )
        // Tickets
        .route("/tickets", get(tickets::list_tickets));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .with_state(state)
}
