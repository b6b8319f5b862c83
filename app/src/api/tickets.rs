//! Ticket listing.
//!
//! - GET /api/tickets?page=&limit=&search=

use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Query, State},
};
use panelpay_core::model::{TicketPage, TicketQuery};
use panelpay_web::AppError;
use serde::Deserialize;

/// Query parameters for listing tickets.
#[derive(Debug, Deserialize)]
pub struct ListTicketsQuery {
    /// 1-based page (default 1)
    pub page: Option<u32>,
    /// Page size (default 20, at most 100)
    pub limit: Option<u32>,
    /// Case-insensitive substring over attendee, code and type
    pub search: Option<String>,
}

/// List issued tickets, newest first.
///
/// # Errors
///
/// 500 when the store fails.
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(query): Query<ListTicketsQuery>,
) -> Result<Json<TicketPage>, AppError> {
    let query = TicketQuery::new(query.page, query.limit, query.search);
    let page = state
        .store
        .list_tickets(&query)
        .await
        .map_err(panelpay_core::PaymentError::from)?;
    Ok(Json(page))
}
