//! Payment status and the provider vocabulary mapping.
//!
//! Providers describe outcomes with their own strings ("success",
//! "successful", "PAID", "abandoned", ...). Everything entering the
//! reconciliation path is translated through [`map_provider_status`];
//! strings outside the table are reported as unmapped and ignored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a payment row.
///
/// `Pending` is the only initial state. `Completed`, `Failed`, `Cancelled`
/// and `Refunded` are terminal for automatic processing, with one exception:
/// a `Failed` attempt may still be completed (or cancelled/refunded) when the
/// provider later reports so for the same reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Checkout created, outcome unknown
    Pending,
    /// Provider confirmed the charge
    Completed,
    /// Provider reported a failed charge
    Failed,
    /// Checkout abandoned or cancelled
    Cancelled,
    /// Charge reversed or refunded
    Refunded,
}

impl PaymentStatus {
    /// All statuses, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Completed,
        Self::Failed,
        Self::Cancelled,
        Self::Refunded,
    ];

    /// Database / wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }

    /// Parse the database representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Whether no further automatic transition normally occurs from here.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether a reconciliation may move a payment from `self` to `next`.
    ///
    /// Only `Pending` and `Failed` rows are writable; `Completed` is sticky.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Completed | Self::Failed | Self::Cancelled | Self::Refunded)
            | (Self::Failed, Self::Completed | Self::Cancelled | Self::Refunded) => true,
            _ => false,
        }
    }

    /// Statuses a reconciliation is allowed to overwrite.
    pub const WRITABLE: [Self; 2] = [Self::Pending, Self::Failed];
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Translate a provider status string into the internal status.
///
/// Matching is case-insensitive and ignores surrounding whitespace.
/// Returns `None` for strings outside the table; callers acknowledge and
/// ignore those.
#[must_use]
pub fn map_provider_status(raw: &str) -> Option<PaymentStatus> {
    let normalized = raw.trim().to_ascii_lowercase();
    let status = match normalized.as_str() {
        "success" | "successful" | "paid" | "completed" => PaymentStatus::Completed,
        "pending" | "initiated" | "processing" | "ongoing" | "queued" => PaymentStatus::Pending,
        "failed" | "declined" => PaymentStatus::Failed,
        "cancelled" | "canceled" | "abandoned" => PaymentStatus::Cancelled,
        "reversed" | "refunded" => PaymentStatus::Refunded,
        _ => return None,
    };
    Some(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_documented_provider_strings() {
        let cases = [
            ("successful", Some(PaymentStatus::Completed)),
            ("success", Some(PaymentStatus::Completed)),
            ("PAID", Some(PaymentStatus::Completed)),
            ("failed", Some(PaymentStatus::Failed)),
            ("pending", Some(PaymentStatus::Pending)),
            ("cancelled", Some(PaymentStatus::Cancelled)),
            ("reversed", Some(PaymentStatus::Refunded)),
            ("refunded", Some(PaymentStatus::Refunded)),
            ("abandoned", Some(PaymentStatus::Cancelled)),
            ("chargeback", None),
            ("", None),
        ];

        for (raw, expected) in cases {
            assert_eq!(map_provider_status(raw), expected, "mapping of {raw:?}");
        }
    }

    #[test]
    fn test_completed_is_sticky() {
        for next in PaymentStatus::ALL {
            assert!(!PaymentStatus::Completed.can_transition_to(next));
        }
    }

    #[test]
    fn test_failed_can_be_retried_to_success() {
        assert!(PaymentStatus::Failed.can_transition_to(PaymentStatus::Completed));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Pending));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Failed));
    }

    #[test]
    fn test_nothing_returns_to_pending() {
        for from in PaymentStatus::ALL {
            assert!(!from.can_transition_to(PaymentStatus::Pending));
        }
    }

    #[test]
    fn test_db_representation_parses_back() {
        for status in PaymentStatus::ALL {
            assert_eq!(PaymentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PaymentStatus::parse("verified"), None);
    }

    proptest! {
        #[test]
        fn prop_mapping_ignores_case(raw in "[a-zA-Z]{0,12}") {
            prop_assert_eq!(
                map_provider_status(&raw),
                map_provider_status(&raw.to_ascii_uppercase())
            );
        }

        #[test]
        fn prop_only_writable_states_move(from_idx in 0usize..5, to_idx in 0usize..5) {
            let from = PaymentStatus::ALL[from_idx];
            let to = PaymentStatus::ALL[to_idx];
            if from.can_transition_to(to) {
                prop_assert!(PaymentStatus::WRITABLE.contains(&from));
                prop_assert!(to.is_terminal());
            }
        }
    }
}
