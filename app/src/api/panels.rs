//! Panel endpoints.
//!
//! - POST /api/panels - register a panel
//! - GET /api/panels/:id - panel with its setup payments
//! - POST /api/check-subdomain - subdomain availability
//! - POST /api/verify-domain - custom domain availability and DNS

use crate::panels::{Availability, RegisterPanel};
use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use panelpay_core::PanelId;
use panelpay_core::model::{Panel, PaymentRecord};
use panelpay_web::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Panel registration body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePanelRequest {
    /// Display name
    pub name: Option<String>,
    /// Requested subdomain
    pub subdomain: Option<String>,
    /// Optional custom domain
    pub custom_domain: Option<String>,
    /// Owner name
    pub owner_name: Option<String>,
    /// Owner email
    pub owner_email: Option<String>,
    /// Owner phone
    pub owner_phone: Option<String>,
}

/// Single panel response.
#[derive(Debug, Serialize)]
pub struct PanelResponse {
    /// The panel
    pub panel: Panel,
}

/// Panel with payments.
#[derive(Debug, Serialize)]
pub struct PanelDetailResponse {
    /// The panel
    pub panel: Panel,
    /// Setup payments, newest first
    pub payments: Vec<PaymentRecord>,
}

/// Subdomain check body.
#[derive(Debug, Deserialize)]
pub struct CheckSubdomainRequest {
    /// Subdomain to check
    #[serde(default)]
    pub subdomain: String,
}

/// Domain check body.
#[derive(Debug, Deserialize)]
pub struct VerifyDomainRequest {
    /// Domain to check
    #[serde(default)]
    pub domain: String,
}

/// Register a panel.
///
/// # Errors
///
/// - 400 for missing or malformed fields
/// - 409 when the subdomain exists
pub async fn create_panel(
    State(state): State<AppState>,
    Json(request): Json<CreatePanelRequest>,
) -> Result<(StatusCode, Json<PanelResponse>), AppError> {
    let panel = state
        .panels
        .register(RegisterPanel {
            name: request.name,
            subdomain: request.subdomain,
            custom_domain: request.custom_domain,
            owner_name: request.owner_name,
            owner_email: request.owner_email,
            owner_phone: request.owner_phone,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(PanelResponse { panel })))
}

/// Get a panel and its payments.
///
/// # Errors
///
/// - 400 for a malformed id
/// - 404 for an unknown panel
pub async fn get_panel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PanelDetailResponse>, AppError> {
    let id = Uuid::parse_str(&id)
        .map(PanelId::from_uuid)
        .map_err(|_| AppError::validation("Panel id must be a UUID"))?;

    let (panel, payments) = state.panels.get(id).await?;
    Ok(Json(PanelDetailResponse { panel, payments }))
}

/// Check subdomain availability.
///
/// # Errors
///
/// 500 when the lookup fails.
pub async fn check_subdomain(
    State(state): State<AppState>,
    Json(request): Json<CheckSubdomainRequest>,
) -> Result<Json<Availability>, AppError> {
    Ok(Json(state.panels.check_subdomain(&request.subdomain).await?))
}

/// Check custom domain availability and DNS.
///
/// # Errors
///
/// 500 when the lookup fails.
pub async fn verify_domain(
    State(state): State<AppState>,
    Json(request): Json<VerifyDomainRequest>,
) -> Result<Json<Availability>, AppError> {
    Ok(Json(state.panels.verify_domain(&request.domain).await?))
}
