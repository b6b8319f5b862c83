//! Payment endpoints.
//!
//! - POST /api/payments/initiate - open a panel setup checkout
//! - POST /api/payment/process - open a ticket checkout
//! - POST /api/payment/verify - reconcile a reference on demand
//! - GET /api/payment/verify - provider redirect after checkout
//!
//! # Payment Flow
//!
//! 1. **Initiate**: a `PENDING` payment is stored and the client is sent
//!    to the provider's checkout URL
//! 2. **Provider**: the buyer pays on the provider's hosted page
//! 3. **Return**: the provider redirects to `GET /api/payment/verify`, or
//!    the client calls `POST /api/payment/verify`; a webhook may also
//!    arrive. Each path reconciles the same reference and only the first
//!    applies side effects.

use crate::checkout::{PanelCheckoutRequest, TicketCheckoutRequest};
use crate::reconciliation::ReconcileRequest;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
    response::Redirect,
};
use panelpay_core::gateway::ProviderVerification;
use panelpay_core::pricing::CartItem;
use panelpay_core::{PanelId, PaymentStatus, Provider};
use panelpay_web::{AppError, RequestMeta};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Verify request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    /// Payment reference
    #[serde(default)]
    pub reference: String,
    /// Provider name
    pub method: Option<String>,
    /// Etegram access code
    pub access_code: Option<String>,
    /// Etegram project id
    #[serde(alias = "projectID")]
    pub project_id: Option<String>,
}

/// Provider answer plus the local result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyData {
    /// What the provider reported (amount in kobo); absent for unknown references
    #[serde(flatten)]
    pub verification: Option<ProviderVerification>,
    /// Local status after reconciliation; absent for unknown references
    pub payment_status: Option<PaymentStatus>,
    /// Reconciliation outcome label
    pub outcome: &'static str,
}

/// Verify response body.
#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    /// Whether the payment is completed
    pub success: bool,
    /// Message for the user
    pub message: String,
    /// Details
    pub data: VerifyData,
}

/// Query string of the provider redirect.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Reference (Paystack sends it twice, as `reference` and `trxref`)
    pub reference: Option<String>,
    /// Paystack transaction reference
    pub trxref: Option<String>,
    /// Reference as sent by Etegram checkout pages
    #[serde(rename = "ref")]
    pub short_ref: Option<String>,
}

/// Panel checkout request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRequest {
    /// Panel to pay for
    pub panel_id: Option<String>,
    /// `monthly` or `annual`
    pub plan: Option<String>,
    /// `etegram` (default) or `paystack`
    pub provider: Option<String>,
}

/// Panel price breakdown, in naira.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBody {
    /// One-off setup fee
    pub setup_fee: i64,
    /// Plan service fee
    pub service_fee: i64,
    /// Amount charged
    pub total: i64,
}

/// Panel checkout response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentResponse {
    /// Always true
    pub success: bool,
    /// Payment reference
    pub reference: String,
    /// Where to send the owner
    pub checkout_url: String,
    /// Provider handling the checkout
    pub provider: Provider,
    /// Price breakdown
    pub pricing: PricingBody,
}

/// Ticket checkout request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    /// Client checkout session
    pub session_id: Option<String>,
    /// `paystack` or `etegram`
    pub method: Option<String>,
    /// Buyer email
    pub attendee_email: Option<String>,
    /// Buyer name
    pub attendee_name: Option<String>,
    /// Buyer phone
    pub attendee_phone: Option<String>,
    /// Buyer company
    pub attendee_company: Option<String>,
    /// Buyer job title
    pub attendee_job_title: Option<String>,
    /// Ticket lines
    #[serde(default)]
    pub tickets: Vec<CartItem>,
    /// Client-computed total, in naira
    pub amount: Option<f64>,
    /// Provider return URL override
    pub callback_url: Option<String>,
}

/// Ticket checkout response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentResponse {
    /// Always true
    pub success: bool,
    /// Payment reference
    pub reference: String,
    /// Where to send the buyer
    pub authorization_url: String,
    /// Provider handling the checkout
    pub method: Provider,
    /// Amount charged, in naira
    pub amount: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Reconcile a reference on demand.
///
/// Every acknowledged outcome is a 200; `success` is true only when the
/// payment is completed afterwards.
///
/// # Errors
///
/// Validation, provider and amount errors map through [`AppError`].
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    let reconciliation = state
        .reconciler
        .reconcile(ReconcileRequest {
            reference: request.reference,
            provider: request.method,
            access_code: request.access_code,
            project_id: request.project_id,
        })
        .await?;

    Ok(Json(VerifyPaymentResponse {
        success: reconciliation.is_completed(),
        message: reconciliation.outcome.message(),
        data: VerifyData {
            payment_status: reconciliation.status,
            outcome: reconciliation.outcome.label(),
            verification: reconciliation.verification,
        },
    }))
}

/// Provider redirect: reconcile, then send the browser back to the site.
pub async fn payment_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let reference = query
        .reference
        .or(query.trxref)
        .or(query.short_ref)
        .unwrap_or_default();

    let completed = match state
        .reconciler
        .reconcile(ReconcileRequest::for_reference(reference.clone()))
        .await
    {
        Ok(reconciliation) => reconciliation.is_completed(),
        Err(e) => {
            tracing::warn!(%reference, error = %e, "Callback verification failed");
            false
        }
    };

    let result = if completed { "success" } else { "failed" };
    Redirect::to(&format!(
        "{}/?payment={result}&reference={}",
        state.public_base_url,
        urlencoding::encode(&reference)
    ))
}

/// Open a setup-fee checkout for a panel.
///
/// # Errors
///
/// - 400 for a missing or malformed panel id or unknown provider
/// - 404 for an unknown panel
/// - provider errors map through [`AppError`]
pub async fn initiate_payment(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<Json<InitiatePaymentResponse>, AppError> {
    let panel_id = request
        .panel_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::validation("panelId is required"))?;
    let panel_id = Uuid::parse_str(panel_id)
        .map(PanelId::from_uuid)
        .map_err(|_| AppError::validation("panelId must be a UUID"))?;

    let checkout = state
        .checkout
        .initiate_panel(
            PanelCheckoutRequest {
                panel_id,
                plan: request.plan,
                provider: request.provider,
            },
            meta.to_json(),
        )
        .await?;

    Ok(Json(InitiatePaymentResponse {
        success: true,
        reference: checkout.payment.reference.to_string(),
        checkout_url: checkout.checkout_url,
        provider: checkout.payment.provider,
        pricing: PricingBody {
            setup_fee: checkout.quote.setup_fee.naira(),
            service_fee: checkout.quote.service_fee.naira(),
            total: checkout.quote.total.naira(),
        },
    }))
}

/// Open a checkout for a ticket cart.
///
/// # Errors
///
/// - 400 for missing buyer details, a bad cart, a declared amount that
///   differs from the catalogue, or an unknown method
/// - provider errors map through [`AppError`]
pub async fn process_payment(
    State(state): State<AppState>,
    meta: RequestMeta,
    Json(request): Json<ProcessPaymentRequest>,
) -> Result<Json<ProcessPaymentResponse>, AppError> {
    tracing::info!(client_ip = %meta.client_ip, "Creating ticket checkout");

    let checkout = state
        .checkout
        .process_tickets(
            TicketCheckoutRequest {
                session_id: request.session_id,
                method: request.method,
                attendee_name: request.attendee_name,
                attendee_email: request.attendee_email,
                attendee_phone: request.attendee_phone,
                attendee_company: request.attendee_company,
                attendee_job_title: request.attendee_job_title,
                tickets: request.tickets,
                amount: request.amount,
                callback_url: request.callback_url,
            },
            meta.to_json(),
        )
        .await?;

    Ok(Json(ProcessPaymentResponse {
        success: true,
        reference: checkout.payment.reference.to_string(),
        authorization_url: checkout.checkout_url,
        method: checkout.payment.provider,
        amount: checkout.quote.total.naira(),
    }))
}
