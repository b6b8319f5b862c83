//! Reconciliation rules.
//!
//! Given the stored payment and the provider's authoritative answer, decide
//! whether anything should be written and, if so, build the single
//! [`TransitionRequest`] that carries every side effect. No I/O happens
//! here; the caller fetches, decides, then writes.

use crate::error::PaymentError;
use crate::gateway::ProviderVerification;
use crate::model::{Attendee, NewTicket, PaymentPurpose, PaymentRecord};
use crate::pricing::LineItem;
use crate::provider::Provider;
use crate::status::{PaymentStatus, map_provider_status};
use crate::store::{PanelUpdate, TransitionRequest};
use crate::types::Money;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Largest accepted difference between expected and reported amounts.
pub const AMOUNT_TOLERANCE: Money = Money::from_kobo(100);

/// Whether `received` is within [`AMOUNT_TOLERANCE`] of `expected`.
#[must_use]
pub const fn amount_within_tolerance(expected: Money, received: Money) -> bool {
    expected.abs_diff(received) <= AMOUNT_TOLERANCE.kobo().unsigned_abs()
}

/// What to do with a verified provider answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Payment is already `Completed`; do nothing.
    AlreadyCompleted,
    /// Provider status is outside the mapping table.
    Ignore,
    /// Mapped status is not a permitted transition from the current one.
    Unchanged {
        /// Stored status
        current: PaymentStatus,
        /// Mapped provider status
        reported: PaymentStatus,
    },
    /// Move the payment.
    Transition {
        /// Stored status
        from: PaymentStatus,
        /// Target status
        to: PaymentStatus,
    },
}

/// Decide how a provider answer applies to a stored payment.
///
/// # Errors
///
/// - [`PaymentError::ReferenceMismatch`] when the answer is for another
///   reference
/// - [`PaymentError::AmountMismatch`] when the provider reports success for
///   an amount outside tolerance
pub fn decide(
    record: &PaymentRecord,
    verification: &ProviderVerification,
) -> Result<Decision, PaymentError> {
    let reported_reference = verification.reference.trim();
    if reported_reference != record.reference.as_str() {
        return Err(PaymentError::ReferenceMismatch {
            reference: record.reference.to_string(),
            reported: reported_reference.to_string(),
        });
    }

    if record.status == PaymentStatus::Completed {
        return Ok(Decision::AlreadyCompleted);
    }

    let Some(reported) = map_provider_status(&verification.status) else {
        return Ok(Decision::Ignore);
    };

    if reported == PaymentStatus::Completed
        && !amount_within_tolerance(record.amount, verification.amount)
    {
        return Err(PaymentError::AmountMismatch {
            reference: record.reference.to_string(),
            expected: record.amount,
            received: verification.amount,
        });
    }

    if record.status.can_transition_to(reported) {
        Ok(Decision::Transition {
            from: record.status,
            to: reported,
        })
    } else {
        Ok(Decision::Unchanged {
            current: record.status,
            reported,
        })
    }
}

/// Final result of one reconciliation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Status moved and side effects were written by this call.
    Applied {
        /// Previous status
        from: PaymentStatus,
        /// New status
        to: PaymentStatus,
        /// Tickets issued
        tickets_issued: usize,
    },
    /// Payment was already completed.
    AlreadyCompleted,
    /// A concurrent reconciliation wrote first.
    Superseded {
        /// Status after the competing write
        current: PaymentStatus,
    },
    /// Reported status does not move the payment.
    Unchanged {
        /// Stored status
        current: PaymentStatus,
    },
    /// Provider status string is not recognised.
    Ignored {
        /// Raw provider status
        provider_status: String,
    },
    /// No local payment has this reference.
    UnknownReference,
}

impl Outcome {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::AlreadyCompleted => "already_completed",
            Self::Superseded { .. } => "superseded",
            Self::Unchanged { .. } => "unchanged",
            Self::Ignored { .. } => "ignored",
            Self::UnknownReference => "unknown_reference",
        }
    }

    /// Human-readable summary for API responses.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Applied { to, .. } => format!("Payment marked {to}"),
            Self::AlreadyCompleted => "Payment already completed".to_string(),
            Self::Superseded { current } => {
                format!("Payment already processed ({current})")
            }
            Self::Unchanged { current } => format!("Payment status unchanged ({current})"),
            Self::Ignored { provider_status } => {
                format!("Provider status '{provider_status}' ignored")
            }
            Self::UnknownReference => "Payment reference not recognised".to_string(),
        }
    }
}

/// Expand priced cart lines into one ticket per unit.
///
/// Codes are `{reference}-{NNN}`, numbered from 1 across all lines.
#[must_use]
pub fn expand_tickets(reference: &str, attendee: &Attendee, items: &[LineItem]) -> Vec<NewTicket> {
    items
        .iter()
        .flat_map(|item| {
            (0..item.quantity).map(move |_| (item.ticket_type.as_str(), item.unit_price))
        })
        .enumerate()
        .map(|(index, (ticket_type, price))| NewTicket {
            code: format!("{reference}-{:03}", index + 1),
            ticket_type: ticket_type.to_string(),
            price,
            attendee: attendee.clone(),
        })
        .collect()
}

/// Merge the latest verification into the payment metadata.
///
/// The provider key is replaced; other keys (request metadata, the other
/// provider's history) are kept.
#[must_use]
pub fn merge_verification_metadata(
    existing: &Value,
    provider: Provider,
    verification: &ProviderVerification,
    at: DateTime<Utc>,
) -> Value {
    let mut merged = match existing {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    merged.insert(
        provider.as_str().to_string(),
        json!({
            "lastVerification": {
                "status": verification.status,
                "amount": verification.amount.kobo(),
                "channel": verification.channel,
                "paidAt": verification.paid_at,
                "reference": verification.reference,
            },
            "lastVerifiedAt": at.to_rfc3339(),
        }),
    );

    Value::Object(merged)
}

/// Build the write for a [`Decision::Transition`].
#[must_use]
pub fn build_transition(
    record: &PaymentRecord,
    to: PaymentStatus,
    verification: &ProviderVerification,
    at: DateTime<Utc>,
) -> TransitionRequest {
    let completed = to == PaymentStatus::Completed;

    let (tickets, panel) = match &record.purpose {
        PaymentPurpose::TicketPurchase {
            attendee, items, ..
        } if completed => (
            expand_tickets(record.reference.as_str(), attendee, items),
            None,
        ),
        PaymentPurpose::TicketPurchase { .. } => (Vec::new(), None),
        PaymentPurpose::PanelSetup { panel_id, .. } => (
            Vec::new(),
            Some(PanelUpdate {
                panel_id: *panel_id,
                payment_status: to,
                setup_paid: completed,
            }),
        ),
    };

    TransitionRequest {
        payment_id: record.id,
        to,
        metadata: merge_verification_metadata(&record.metadata, record.provider, verification, at),
        tickets,
        panel,
        at,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pricing::PanelPlan;
    use crate::reference::PaymentReference;
    use crate::types::{PanelId, PaymentId};
    use proptest::prelude::*;

    fn attendee() -> Attendee {
        Attendee {
            name: "Ada Obi".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            company: None,
            job_title: None,
        }
    }

    fn ticket_payment(status: PaymentStatus) -> PaymentRecord {
        PaymentRecord {
            id: PaymentId::new(),
            reference: PaymentReference::parse("PSK-171234-ABC").unwrap(),
            provider: Provider::Paystack,
            status,
            amount: Money::from_naira(20_000),
            purpose: PaymentPurpose::TicketPurchase {
                session_id: None,
                attendee: attendee(),
                items: vec![LineItem {
                    ticket_type: "regular".to_string(),
                    quantity: 4,
                    unit_price: Money::from_naira(5_000),
                    line_total: Money::from_naira(20_000),
                }],
            },
            metadata: json!({"request": {"userAgent": "test"}}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: None,
        }
    }

    fn verification(status: &str, kobo: i64) -> ProviderVerification {
        ProviderVerification {
            reference: "PSK-171234-ABC".to_string(),
            status: status.to_string(),
            amount: Money::from_kobo(kobo),
            paid_at: None,
            channel: Some("card".to_string()),
            metadata: Value::Null,
        }
    }

    #[test]
    fn test_success_transitions_pending() {
        let record = ticket_payment(PaymentStatus::Pending);
        let decision = decide(&record, &verification("success", 2_000_000)).unwrap();
        assert_eq!(
            decision,
            Decision::Transition {
                from: PaymentStatus::Pending,
                to: PaymentStatus::Completed
            }
        );
    }

    #[test]
    fn test_completed_is_guarded_before_amount_check() {
        let record = ticket_payment(PaymentStatus::Completed);
        let decision = decide(&record, &verification("success", 1)).unwrap();
        assert_eq!(decision, Decision::AlreadyCompleted);
    }

    #[test]
    fn test_amount_tolerance_edges() {
        let record = ticket_payment(PaymentStatus::Pending);
        assert!(decide(&record, &verification("success", 2_000_100)).is_ok());
        assert!(decide(&record, &verification("success", 1_999_900)).is_ok());
        assert!(matches!(
            decide(&record, &verification("success", 2_000_101)),
            Err(PaymentError::AmountMismatch { .. })
        ));
        assert!(matches!(
            decide(&record, &verification("success", 20_000)),
            Err(PaymentError::AmountMismatch { .. })
        ));
    }

    #[test]
    fn test_answer_for_another_reference_is_rejected() {
        let mut other = verification("success", 2_000_000);
        other.reference = "PSK-000000-OTHER".to_string();

        for status in [PaymentStatus::Pending, PaymentStatus::Completed] {
            let err = decide(&ticket_payment(status), &other).unwrap_err();
            assert!(matches!(
                err,
                PaymentError::ReferenceMismatch { ref reported, .. } if reported == "PSK-000000-OTHER"
            ));
        }

        other.reference = String::new();
        assert!(decide(&ticket_payment(PaymentStatus::Pending), &other).is_err());
    }

    #[test]
    fn test_failed_report_ignores_amount() {
        let record = ticket_payment(PaymentStatus::Pending);
        let decision = decide(&record, &verification("failed", 0)).unwrap();
        assert_eq!(
            decision,
            Decision::Transition {
                from: PaymentStatus::Pending,
                to: PaymentStatus::Failed
            }
        );
    }

    #[test]
    fn test_unmapped_and_pending_reports() {
        let record = ticket_payment(PaymentStatus::Pending);
        assert_eq!(
            decide(&record, &verification("chargeback", 2_000_000)).unwrap(),
            Decision::Ignore
        );
        assert_eq!(
            decide(&record, &verification("pending", 2_000_000)).unwrap(),
            Decision::Unchanged {
                current: PaymentStatus::Pending,
                reported: PaymentStatus::Pending
            }
        );
    }

    #[test]
    fn test_cancelled_is_not_reopened() {
        let record = ticket_payment(PaymentStatus::Cancelled);
        assert!(matches!(
            decide(&record, &verification("success", 2_000_000)).unwrap(),
            Decision::Unchanged { .. }
        ));
    }

    #[test]
    fn test_ticket_expansion_codes() {
        let items = vec![
            LineItem {
                ticket_type: "regular".to_string(),
                quantity: 2,
                unit_price: Money::from_naira(5_000),
                line_total: Money::from_naira(10_000),
            },
            LineItem {
                ticket_type: "vip".to_string(),
                quantity: 1,
                unit_price: Money::from_naira(60_000),
                line_total: Money::from_naira(60_000),
            },
        ];
        let tickets = expand_tickets("ETG-1-XYZ", &attendee(), &items);
        let codes: Vec<&str> = tickets.iter().map(|t| t.code.as_str()).collect();

        assert_eq!(codes, ["ETG-1-XYZ-001", "ETG-1-XYZ-002", "ETG-1-XYZ-003"]);
        assert_eq!(tickets[2].ticket_type, "vip");
        assert_eq!(tickets[2].price, Money::from_naira(60_000));
    }

    #[test]
    fn test_build_transition_for_completed_purchase() {
        let record = ticket_payment(PaymentStatus::Pending);
        let request = build_transition(
            &record,
            PaymentStatus::Completed,
            &verification("success", 2_000_000),
            Utc::now(),
        );

        assert_eq!(request.tickets.len(), 4);
        assert!(request.panel.is_none());
        assert_eq!(request.metadata["request"]["userAgent"], "test");
        assert_eq!(
            request.metadata["paystack"]["lastVerification"]["amount"],
            2_000_000
        );
    }

    #[test]
    fn test_failed_purchase_issues_no_tickets() {
        let record = ticket_payment(PaymentStatus::Pending);
        let request = build_transition(
            &record,
            PaymentStatus::Failed,
            &verification("failed", 0),
            Utc::now(),
        );
        assert!(request.tickets.is_empty());
    }

    #[test]
    fn test_panel_setup_mirrors_status() {
        let panel_id = PanelId::new();
        let mut record = ticket_payment(PaymentStatus::Pending);
        record.purpose = PaymentPurpose::PanelSetup {
            panel_id,
            plan: PanelPlan::Monthly,
        };

        let completed = build_transition(
            &record,
            PaymentStatus::Completed,
            &verification("success", 2_000_000),
            Utc::now(),
        );
        assert_eq!(
            completed.panel,
            Some(PanelUpdate {
                panel_id,
                payment_status: PaymentStatus::Completed,
                setup_paid: true
            })
        );

        let failed = build_transition(
            &record,
            PaymentStatus::Failed,
            &verification("failed", 0),
            Utc::now(),
        );
        assert_eq!(failed.panel.map(|p| p.setup_paid), Some(false));
        assert!(failed.tickets.is_empty());
    }

    proptest! {
        #[test]
        fn prop_tolerance_is_symmetric(expected in 0i64..10_000_000_000, delta in -500i64..500) {
            let a = Money::from_kobo(expected);
            let b = Money::from_kobo(expected + delta);
            prop_assert_eq!(amount_within_tolerance(a, b), amount_within_tolerance(b, a));
            prop_assert_eq!(amount_within_tolerance(a, b), delta.abs() <= 100);
        }

        #[test]
        fn prop_expansion_count_matches_quantity(quantities in proptest::collection::vec(1u32..20, 1..5)) {
            let items: Vec<LineItem> = quantities
                .iter()
                .map(|q| LineItem {
                    ticket_type: "regular".to_string(),
                    quantity: *q,
                    unit_price: Money::from_naira(5_000),
                    line_total: Money::from_naira(5_000 * i64::from(*q)),
                })
                .collect();
            let tickets = expand_tickets("PSK-1-A", &attendee(), &items);
            let expected: u32 = quantities.iter().sum();
            prop_assert_eq!(tickets.len(), expected as usize);
        }
    }
}
