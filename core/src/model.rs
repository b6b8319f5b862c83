//! Persisted entities: panels, payments and tickets.

use crate::pricing::{LineItem, PanelPlan};
use crate::provider::Provider;
use crate::reference::PaymentReference;
use crate::status::PaymentStatus;
use crate::types::{Money, PanelId, PaymentId, TicketId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tenant panel whose activation is gated by a setup payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    /// Panel id
    pub id: PanelId,
    /// Display name
    pub name: String,
    /// Unique subdomain label
    pub subdomain: String,
    /// Optional custom domain
    pub custom_domain: Option<String>,
    /// Owner name
    pub owner_name: Option<String>,
    /// Owner email
    pub owner_email: String,
    /// Owner phone, normalised to `+234...`
    pub owner_phone: String,
    /// Mirrors the status of the latest setup payment
    pub payment_status: PaymentStatus,
    /// Set once a setup payment completes
    pub setup_paid: bool,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a panel. Fields are already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPanel {
    /// Display name
    pub name: String,
    /// Unique subdomain label
    pub subdomain: String,
    /// Optional custom domain
    pub custom_domain: Option<String>,
    /// Owner name
    pub owner_name: Option<String>,
    /// Owner email
    pub owner_email: String,
    /// Owner phone
    pub owner_phone: String,
}

/// Ticket buyer details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
    /// Phone number
    pub phone: Option<String>,
    /// Company
    pub company: Option<String>,
    /// Job title
    pub job_title: Option<String>,
}

/// Discriminant stored in `payments.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentKind {
    /// Panel setup fee
    PanelSetup,
    /// Event ticket purchase
    TicketPurchase,
}

impl PaymentKind {
    /// Database representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PanelSetup => "PANEL_SETUP",
            Self::TicketPurchase => "TICKET_PURCHASE",
        }
    }

    /// Parse the database representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PANEL_SETUP" => Some(Self::PanelSetup),
            "TICKET_PURCHASE" => Some(Self::TicketPurchase),
            _ => None,
        }
    }
}

/// What a payment pays for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentPurpose {
    /// Setup fee for a panel
    #[serde(rename_all = "camelCase")]
    PanelSetup {
        /// Panel being activated
        panel_id: PanelId,
        /// Chosen plan
        plan: PanelPlan,
    },
    /// Tickets for an attendee
    #[serde(rename_all = "camelCase")]
    TicketPurchase {
        /// Client checkout session, if any
        session_id: Option<String>,
        /// Buyer
        attendee: Attendee,
        /// Priced cart lines
        items: Vec<LineItem>,
    },
}

impl PaymentPurpose {
    /// The stored discriminant.
    #[must_use]
    pub const fn kind(&self) -> PaymentKind {
        match self {
            Self::PanelSetup { .. } => PaymentKind::PanelSetup,
            Self::TicketPurchase { .. } => PaymentKind::TicketPurchase,
        }
    }

    /// Linked panel, for setup payments.
    #[must_use]
    pub const fn panel_id(&self) -> Option<PanelId> {
        match self {
            Self::PanelSetup { panel_id, .. } => Some(*panel_id),
            Self::TicketPurchase { .. } => None,
        }
    }
}

/// One checkout attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Row id
    pub id: PaymentId,
    /// Globally unique reference
    pub reference: PaymentReference,
    /// Provider the checkout was created with
    pub provider: Provider,
    /// Current status
    pub status: PaymentStatus,
    /// Expected amount
    pub amount: Money,
    /// What the payment is for
    pub purpose: PaymentPurpose,
    /// Provider payload history and request metadata
    pub metadata: Value,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Set when the payment reaches `Completed`
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for creating a `Pending` payment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    /// Freshly generated reference
    pub reference: PaymentReference,
    /// Provider
    pub provider: Provider,
    /// Expected amount
    pub amount: Money,
    /// What the payment is for
    pub purpose: PaymentPurpose,
    /// Initial metadata
    pub metadata: Value,
}

/// An issued ticket. One row per unit of quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Row id
    pub id: TicketId,
    /// Payment that produced the ticket
    pub payment_id: PaymentId,
    /// Unique ticket code
    pub code: String,
    /// Catalogue ticket type
    pub ticket_type: String,
    /// Price paid for this ticket
    pub price: Money,
    /// Holder
    pub attendee: Attendee,
    /// Issued timestamp
    pub created_at: DateTime<Utc>,
}

/// A ticket to insert as part of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    /// Unique ticket code
    pub code: String,
    /// Catalogue ticket type
    pub ticket_type: String,
    /// Price paid
    pub price: Money,
    /// Holder
    pub attendee: Attendee,
}

/// Ticket listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketQuery {
    /// 1-based page
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Case-insensitive substring filter
    pub search: Option<String>,
}

impl TicketQuery {
    /// Largest page size.
    pub const MAX_LIMIT: u32 = 100;

    /// Build a query, clamping page and limit into range.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>, search: Option<String>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(20).clamp(1, Self::MAX_LIMIT),
            search: search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    /// Rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }

    /// Whether a ticket matches the search filter.
    #[must_use]
    pub fn matches(&self, ticket: &Ticket) -> bool {
        let Some(needle) = self.search.as_deref().map(str::to_lowercase) else {
            return true;
        };
        let attendee = &ticket.attendee;
        [
            Some(attendee.name.as_str()),
            Some(attendee.email.as_str()),
            attendee.phone.as_deref(),
            attendee.company.as_deref(),
            attendee.job_title.as_deref(),
            Some(ticket.code.as_str()),
            Some(ticket.ticket_type.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// One page of tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPage {
    /// Tickets on this page, newest first
    pub tickets: Vec<Ticket>,
    /// Matching tickets across all pages
    pub total: u64,
    /// Page number
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Number of pages
    pub total_pages: u64,
}

impl TicketPage {
    /// Assemble a page from query and results.
    #[must_use]
    pub fn new(query: &TicketQuery, tickets: Vec<Ticket>, total: u64) -> Self {
        Self {
            tickets,
            total,
            page: query.page,
            limit: query.limit,
            total_pages: total.div_ceil(u64::from(query.limit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_query_clamps() {
        let query = TicketQuery::new(Some(0), Some(500), Some("  ".to_string()));
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 100);
        assert_eq!(query.search, None);
        assert_eq!(query.offset(), 0);

        let query = TicketQuery::new(Some(3), Some(10), None);
        assert_eq!(query.offset(), 20);
    }

    #[test]
    fn test_total_pages() {
        let query = TicketQuery::new(None, Some(10), None);
        assert_eq!(TicketPage::new(&query, Vec::new(), 21).total_pages, 3);
        assert_eq!(TicketPage::new(&query, Vec::new(), 0).total_pages, 0);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let ticket = Ticket {
            id: TicketId::new(),
            payment_id: PaymentId::new(),
            code: "PSK-1-ABC-001".to_string(),
            ticket_type: "regular".to_string(),
            price: Money::from_naira(5_000),
            attendee: Attendee {
                name: "Ada Obi".to_string(),
                email: "ada@example.com".to_string(),
                phone: None,
                company: Some("Acme".to_string()),
                job_title: None,
            },
            created_at: Utc::now(),
        };

        assert!(TicketQuery::new(None, None, Some("ACME".into())).matches(&ticket));
        assert!(TicketQuery::new(None, None, Some("abc-001".into())).matches(&ticket));
        assert!(!TicketQuery::new(None, None, Some("vip".into())).matches(&ticket));
    }
}
