//! Builders for common test data.
//!
//! These construct inputs only; validation belongs to the code under test,
//! so malformed references here are a test bug and fall back to a fixed one.

use chrono::{DateTime, Utc};
use panelpay_core::gateway::ProviderVerification;
use panelpay_core::model::{Attendee, NewPanel, NewPayment, PaymentPurpose, PaymentRecord};
use panelpay_core::pricing::{LineItem, PanelPlan, quote_panel, ticket_price};
use panelpay_core::reconcile::build_transition;
use panelpay_core::status::PaymentStatus;
use panelpay_core::store::TransitionRequest;
use panelpay_core::types::{Money, PanelId};
use panelpay_core::{PaymentReference, Provider};
use serde_json::{Value, json};

fn reference(raw: &str) -> PaymentReference {
    PaymentReference::parse(raw).unwrap_or_else(|_| {
        PaymentReference::generate(Provider::Paystack, DateTime::<Utc>::UNIX_EPOCH)
    })
}

/// A ticket buyer.
#[must_use]
pub fn attendee() -> Attendee {
    Attendee {
        name: "Ada Obi".to_string(),
        email: "ada@example.com".to_string(),
        phone: Some("+2348031234567".to_string()),
        company: Some("Acme Ltd".to_string()),
        job_title: Some("Engineer".to_string()),
    }
}

/// A valid panel registration.
#[must_use]
pub fn new_panel(subdomain: &str) -> NewPanel {
    NewPanel {
        name: format!("{subdomain} panel"),
        subdomain: subdomain.to_string(),
        custom_domain: None,
        owner_name: Some("Chidi Okafor".to_string()),
        owner_email: "owner@example.com".to_string(),
        owner_phone: "+2348031234567".to_string(),
    }
}

/// A pending purchase of `quantity` regular tickets.
#[must_use]
pub fn ticket_payment(raw_reference: &str, quantity: u32) -> NewPayment {
    let unit_price = ticket_price("regular").unwrap_or(Money::from_naira(5_000));
    let line_total = unit_price.checked_mul(quantity).unwrap_or(Money::ZERO);
    let reference = reference(raw_reference);
    NewPayment {
        provider: reference.provider().unwrap_or(Provider::Paystack),
        reference,
        amount: line_total,
        purpose: PaymentPurpose::TicketPurchase {
            session_id: Some("session-1".to_string()),
            attendee: attendee(),
            items: vec![LineItem {
                ticket_type: "regular".to_string(),
                quantity,
                unit_price,
                line_total,
            }],
        },
        metadata: json!({}),
    }
}

/// A pending setup payment for a panel.
#[must_use]
pub fn panel_payment(raw_reference: &str, panel_id: PanelId, plan: PanelPlan) -> NewPayment {
    let reference = reference(raw_reference);
    NewPayment {
        provider: reference.provider().unwrap_or(Provider::Etegram),
        reference,
        amount: quote_panel(plan).total,
        purpose: PaymentPurpose::PanelSetup { panel_id, plan },
        metadata: json!({}),
    }
}

/// A provider answer.
#[must_use]
pub fn verification(reference: &str, status: &str, kobo: i64) -> ProviderVerification {
    ProviderVerification {
        reference: reference.to_string(),
        status: status.to_string(),
        amount: Money::from_kobo(kobo),
        paid_at: Some("2025-01-01T00:00:00Z".to_string()),
        channel: Some("card".to_string()),
        metadata: Value::Null,
    }
}

/// The write that completes `record` for its full amount.
#[must_use]
pub fn completion_of(record: &PaymentRecord, at: DateTime<Utc>) -> TransitionRequest {
    build_transition(
        record,
        PaymentStatus::Completed,
        &verification(record.reference.as_str(), "success", record.amount.kobo()),
        at,
    )
}

/// The write that marks `record` failed.
#[must_use]
pub fn failure_of(record: &PaymentRecord, at: DateTime<Utc>) -> TransitionRequest {
    build_transition(
        record,
        PaymentStatus::Failed,
        &verification(record.reference.as_str(), "failed", record.amount.kobo()),
        at,
    )
}
