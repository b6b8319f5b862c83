//! Storage abstraction for panels, payments and tickets.
//!
//! Implementations must apply a [`TransitionRequest`] atomically: the payment
//! status, the ticket rows and the panel status are written together or not
//! at all. The write itself is guarded on the payment still being in a
//! writable status, so concurrent reconciliations of the same reference
//! cannot both succeed.

use crate::BoxFuture;
use crate::model::{
    NewPanel, NewPayment, NewTicket, Panel, PaymentRecord, Ticket, TicketPage, TicketQuery,
};
use crate::status::PaymentStatus;
use crate::types::{PanelId, PaymentId};
use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

/// Storage errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint was violated.
    #[error("Conflict on {field}: {value}")]
    Conflict {
        /// Constrained field
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// A row that must exist was not found.
    #[error("{entity} not found: {id}")]
    Missing {
        /// Entity kind
        entity: &'static str,
        /// Identifier
        id: String,
    },

    /// The database failed.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be decoded.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Panel status change applied alongside a payment transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelUpdate {
    /// Panel to update
    pub panel_id: PanelId,
    /// New mirrored payment status
    pub payment_status: PaymentStatus,
    /// Whether the setup fee is now paid
    pub setup_paid: bool,
}

/// Everything written by one reconciliation, in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRequest {
    /// Payment row
    pub payment_id: PaymentId,
    /// Target status
    pub to: PaymentStatus,
    /// Full replacement metadata document
    pub metadata: Value,
    /// Tickets to issue (only for completed purchases)
    pub tickets: Vec<NewTicket>,
    /// Panel mirror update, for setup payments
    pub panel: Option<PanelUpdate>,
    /// Transition time
    pub at: DateTime<Utc>,
}

/// Result of a guarded transition write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// This call moved the payment; side effects were written.
    Applied {
        /// Status before the write
        from: PaymentStatus,
        /// Tickets issued in the same transaction
        tickets: Vec<Ticket>,
    },
    /// The payment was no longer writable; nothing was written.
    Superseded {
        /// Status found at write time
        current: PaymentStatus,
    },
}

/// Persistence for the payment flows.
pub trait PaymentStore: Send + Sync {
    /// Insert a panel.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] when the subdomain exists.
    fn create_panel(
        &self,
        panel: NewPanel,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Panel, StoreError>>;

    /// Load a panel by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error on database failure.
    fn get_panel(&self, id: PanelId) -> BoxFuture<'_, Result<Option<Panel>, StoreError>>;

    /// Load a panel by subdomain.
    ///
    /// # Errors
    ///
    /// Returns a storage error on database failure.
    fn find_panel_by_subdomain<'a>(
        &'a self,
        subdomain: &'a str,
    ) -> BoxFuture<'a, Result<Option<Panel>, StoreError>>;

    /// Load a panel by custom domain.
    ///
    /// # Errors
    ///
    /// Returns a storage error on database failure.
    fn find_panel_by_custom_domain<'a>(
        &'a self,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Option<Panel>, StoreError>>;

    /// Insert a `Pending` payment. Setup payments also set the panel's
    /// mirrored status to `Pending`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] when the reference exists,
    /// [`StoreError::Missing`] when the linked panel does not.
    fn create_payment(
        &self,
        payment: NewPayment,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<PaymentRecord, StoreError>>;

    /// Load a payment by reference.
    ///
    /// # Errors
    ///
    /// Returns a storage error on database failure.
    fn find_payment<'a>(
        &'a self,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<Option<PaymentRecord>, StoreError>>;

    /// Setup payments of a panel, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error on database failure.
    fn payments_for_panel(
        &self,
        panel_id: PanelId,
    ) -> BoxFuture<'_, Result<Vec<PaymentRecord>, StoreError>>;

    /// Apply a transition if the payment is still `Pending` or `Failed`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the transaction fails; nothing is
    /// written in that case.
    fn apply_transition(
        &self,
        request: TransitionRequest,
    ) -> BoxFuture<'_, Result<ApplyOutcome, StoreError>>;

    /// Tickets issued for a payment, in code order.
    ///
    /// # Errors
    ///
    /// Returns a storage error on database failure.
    fn tickets_for_payment(
        &self,
        payment_id: PaymentId,
    ) -> BoxFuture<'_, Result<Vec<Ticket>, StoreError>>;

    /// Page through tickets, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error on database failure.
    fn list_tickets<'a>(
        &'a self,
        query: &'a TicketQuery,
    ) -> BoxFuture<'a, Result<TicketPage, StoreError>>;

    /// Check connectivity.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the backend is unavailable.
    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>>;
}
