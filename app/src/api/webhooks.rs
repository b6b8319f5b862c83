//! Provider webhooks.
//!
//! - POST /api/webhooks/paystack
//! - POST /api/webhooks/etegram
//!
//! The raw body is signature-checked before it is parsed. The payload only
//! names a reference; status and amount always come from the provider's
//! verify API through the reconciler.
//!
//! "Not applicable" deliveries (unknown reference, unmapped status,
//! non-charge events, already completed payments) are acknowledged with
//! 200 so providers stop redelivering. Genuine failures return non-200 so
//! they redeliver.

use crate::reconciliation::ReconcileRequest;
use crate::server::state::AppState;
use crate::signature::{self, SignatureError};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use panelpay_core::Provider;
use panelpay_web::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Acknowledgement body.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct WebhookAck {
    /// Always true for a 200
    pub received: bool,
    /// What happened
    pub message: String,
}

impl WebhookAck {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            received: true,
            message: message.into(),
        })
    }
}

/// Paystack event envelope.
#[derive(Debug, Deserialize)]
struct PaystackEvent {
    #[serde(default)]
    event: String,
    #[serde(default)]
    data: Value,
}

/// Etegram notification.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EtegramEvent {
    reference: Option<String>,
    access_code: Option<String>,
    #[serde(alias = "projectID")]
    project_id: Option<String>,
    #[serde(default)]
    data: Value,
}

/// Paystack webhook.
///
/// # Errors
///
/// - 401 for a missing or invalid `x-paystack-signature`
/// - 400 for malformed JSON or a missing reference
/// - 422, 502, 500 for reconciliation failures
pub async fn paystack_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    authenticate(&state, Provider::Paystack, &headers, &body)?;

    let payload: PaystackEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("Invalid webhook payload: {e}")))?;

    if !payload.event.starts_with("charge.") {
        tracing::info!(event = %payload.event, "Paystack event acknowledged without action");
        return Ok(WebhookAck::new(format!("Event {} ignored", payload.event)));
    }

    let reference = string_field(&payload.data, "reference")
        .ok_or_else(|| AppError::bad_request("Webhook payload has no reference"))?;
    tracing::info!(event = %payload.event, %reference, "Paystack webhook received");

    reconcile(
        &state,
        ReconcileRequest::for_reference(reference).with_provider(Provider::Paystack),
    )
    .await
}

/// Etegram webhook.
///
/// # Errors
///
/// - 401 for a missing or invalid `x-etegram-signature`
/// - 400 for malformed JSON or a missing reference
/// - 422, 502, 500 for reconciliation failures
pub async fn etegram_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    authenticate(&state, Provider::Etegram, &headers, &body)?;

    let payload: EtegramEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::bad_request(format!("Invalid webhook payload: {e}")))?;

    let reference = payload
        .reference
        .filter(|r| !r.trim().is_empty())
        .or_else(|| string_field(&payload.data, "reference"))
        .ok_or_else(|| AppError::bad_request("Webhook payload has no reference"))?;
    tracing::info!(%reference, "Etegram webhook received");

    let mut request = ReconcileRequest::for_reference(reference).with_provider(Provider::Etegram);
    request.access_code = payload
        .access_code
        .or_else(|| string_field(&payload.data, "accessCode"));
    request.project_id = payload
        .project_id
        .or_else(|| string_field(&payload.data, "projectID"));

    reconcile(&state, request).await
}

/// Liveness message for `GET` on a webhook path.
#[allow(clippy::unused_async)]
pub async fn webhook_info() -> (StatusCode, Json<WebhookAck>) {
    (
        StatusCode::OK,
        Json(WebhookAck {
            received: false,
            message: "Webhook endpoint is active; deliveries must be POSTed".to_string(),
        }),
    )
}

fn authenticate(
    state: &AppState,
    provider: Provider,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), AppError> {
    let header = headers
        .get(signature::header_name(provider))
        .and_then(|v| v.to_str().ok());

    signature::verify(provider, state.secrets.get(provider), body, header).map_err(|e| {
        tracing::warn!(%provider, error = %e, "Webhook rejected");
        match e {
            SignatureError::NotConfigured => AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Payment provider {provider} is not configured"),
                "PROVIDER_CONFIG_MISSING",
            ),
            SignatureError::Missing | SignatureError::Mismatch => {
                AppError::unauthorized(e.to_string())
            }
        }
    })
}

async fn reconcile(
    state: &AppState,
    request: ReconcileRequest,
) -> Result<Json<WebhookAck>, AppError> {
    let reconciliation = state.reconciler.reconcile(request).await?;
    Ok(WebhookAck::new(reconciliation.outcome.message()))
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
