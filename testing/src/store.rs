//! In-memory [`PaymentStore`] for tests.
//!
//! Transitions are staged on copies and only swapped in once every step
//! succeeded, mirroring a database transaction. Fault injection lets tests
//! fail the ticket insert after the payment row was already updated in the
//! staged copy.

use chrono::{DateTime, Utc};
use panelpay_core::BoxFuture;
use panelpay_core::model::{
    NewPanel, NewPayment, Panel, PaymentPurpose, PaymentRecord, Ticket, TicketPage, TicketQuery,
};
use panelpay_core::status::PaymentStatus;
use panelpay_core::store::{ApplyOutcome, PaymentStore, StoreError, TransitionRequest};
use panelpay_core::types::{PanelId, PaymentId, TicketId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default, Clone)]
struct State {
    panels: HashMap<PanelId, Panel>,
    payments: HashMap<String, PaymentRecord>,
    tickets: Vec<Ticket>,
}

/// In-memory store with write counting and fault injection.
#[derive(Debug, Default)]
pub struct InMemoryPaymentStore {
    state: Mutex<State>,
    writes: AtomicUsize,
    fail_ticket_insert: AtomicBool,
    unavailable: AtomicBool,
}

impl InMemoryPaymentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next transitions fail while inserting tickets.
    pub fn fail_ticket_inserts(&self, fail: bool) {
        self.fail_ticket_insert.store(fail, Ordering::SeqCst);
    }

    /// Make every call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of committed writes (panel/payment inserts and transitions).
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of a payment by reference.
    #[must_use]
    pub fn payment(&self, reference: &str) -> Option<PaymentRecord> {
        self.lock().ok()?.payments.get(reference).cloned()
    }

    /// Snapshot of a panel.
    #[must_use]
    pub fn panel(&self, id: PanelId) -> Option<Panel> {
        self.lock().ok()?.panels.get(&id).cloned()
    }

    /// Snapshot of all issued tickets.
    #[must_use]
    pub fn tickets(&self) -> Vec<Ticket> {
        self.lock().map(|s| s.tickets.clone()).unwrap_or_default()
    }

    /// Overwrite a payment status behind the service's back, simulating a
    /// concurrent writer.
    pub fn force_status(&self, reference: &str, status: PaymentStatus) {
        if let Ok(mut state) = self.lock() {
            if let Some(payment) = state.payments.get_mut(reference) {
                payment.status = status;
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Database("store unavailable".to_string()));
        }
        self.state
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".to_string()))
    }

    fn committed(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }

    fn transition(&self, request: TransitionRequest) -> Result<ApplyOutcome, StoreError> {
        let mut state = self.lock()?;
        let mut staged = state.clone();

        let payment = staged
            .payments
            .values_mut()
            .find(|p| p.id == request.payment_id)
            .ok_or_else(|| StoreError::Missing {
                entity: "payment",
                id: request.payment_id.to_string(),
            })?;

        if !payment.status.can_transition_to(request.to) {
            return Ok(ApplyOutcome::Superseded {
                current: payment.status,
            });
        }

        let from = payment.status;
        payment.status = request.to;
        payment.metadata = request.metadata;
        payment.updated_at = request.at;
        if request.to == PaymentStatus::Completed {
            payment.completed_at = Some(request.at);
        }
        let payment_id = payment.id;

        if !request.tickets.is_empty() && self.fail_ticket_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Database(
                "injected failure inserting tickets".to_string(),
            ));
        }

        let mut issued = Vec::with_capacity(request.tickets.len());
        for ticket in request.tickets {
            if staged.tickets.iter().any(|t| t.code == ticket.code) {
                return Err(StoreError::Conflict {
                    field: "ticket_code",
                    value: ticket.code,
                });
            }
            let ticket = Ticket {
                id: TicketId::new(),
                payment_id,
                code: ticket.code,
                ticket_type: ticket.ticket_type,
                price: ticket.price,
                attendee: ticket.attendee,
                created_at: request.at,
            };
            staged.tickets.push(ticket.clone());
            issued.push(ticket);
        }

        if let Some(update) = request.panel {
            let panel = staged
                .panels
                .get_mut(&update.panel_id)
                .ok_or_else(|| StoreError::Missing {
                    entity: "panel",
                    id: update.panel_id.to_string(),
                })?;
            panel.payment_status = update.payment_status;
            panel.setup_paid = panel.setup_paid || update.setup_paid;
            panel.updated_at = request.at;
        }

        *state = staged;
        drop(state);
        self.committed();

        Ok(ApplyOutcome::Applied {
            from,
            tickets: issued,
        })
    }
}

impl PaymentStore for InMemoryPaymentStore {
    fn create_panel(
        &self,
        panel: NewPanel,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<Panel, StoreError>> {
        Box::pin(async move {
            let mut state = self.lock()?;
            if state.panels.values().any(|p| p.subdomain == panel.subdomain) {
                return Err(StoreError::Conflict {
                    field: "subdomain",
                    value: panel.subdomain,
                });
            }
            let panel = Panel {
                id: PanelId::new(),
                name: panel.name,
                subdomain: panel.subdomain,
                custom_domain: panel.custom_domain,
                owner_name: panel.owner_name,
                owner_email: panel.owner_email,
                owner_phone: panel.owner_phone,
                payment_status: PaymentStatus::Pending,
                setup_paid: false,
                created_at: now,
                updated_at: now,
            };
            state.panels.insert(panel.id, panel.clone());
            drop(state);
            self.committed();
            Ok(panel)
        })
    }

    fn get_panel(&self, id: PanelId) -> BoxFuture<'_, Result<Option<Panel>, StoreError>> {
        Box::pin(async move { Ok(self.lock()?.panels.get(&id).cloned()) })
    }

    fn find_panel_by_subdomain<'a>(
        &'a self,
        subdomain: &'a str,
    ) -> BoxFuture<'a, Result<Option<Panel>, StoreError>> {
        Box::pin(async move {
            Ok(self
                .lock()?
                .panels
                .values()
                .find(|p| p.subdomain == subdomain)
                .cloned())
        })
    }

    fn find_panel_by_custom_domain<'a>(
        &'a self,
        domain: &'a str,
    ) -> BoxFuture<'a, Result<Option<Panel>, StoreError>> {
        Box::pin(async move {
            Ok(self
                .lock()?
                .panels
                .values()
                .find(|p| p.custom_domain.as_deref() == Some(domain))
                .cloned())
        })
    }

    fn create_payment(
        &self,
        payment: NewPayment,
        now: DateTime<Utc>,
    ) -> BoxFuture<'_, Result<PaymentRecord, StoreError>> {
        Box::pin(async move {
            let mut state = self.lock()?;
            if state.payments.contains_key(payment.reference.as_str()) {
                return Err(StoreError::Conflict {
                    field: "reference",
                    value: payment.reference.to_string(),
                });
            }
            if let PaymentPurpose::PanelSetup { panel_id, .. } = &payment.purpose {
                let panel = state
                    .panels
                    .get_mut(panel_id)
                    .ok_or_else(|| StoreError::Missing {
                        entity: "panel",
                        id: panel_id.to_string(),
                    })?;
                panel.payment_status = PaymentStatus::Pending;
                panel.updated_at = now;
            }
            let record = PaymentRecord {
                id: PaymentId::new(),
                reference: payment.reference,
                provider: payment.provider,
                status: PaymentStatus::Pending,
                amount: payment.amount,
                purpose: payment.purpose,
                metadata: payment.metadata,
                created_at: now,
                updated_at: now,
                completed_at: None,
            };
            state
                .payments
                .insert(record.reference.to_string(), record.clone());
            drop(state);
            self.committed();
            Ok(record)
        })
    }

    fn find_payment<'a>(
        &'a self,
        reference: &'a str,
    ) -> BoxFuture<'a, Result<Option<PaymentRecord>, StoreError>> {
        Box::pin(async move { Ok(self.lock()?.payments.get(reference).cloned()) })
    }

    fn payments_for_panel(
        &self,
        panel_id: PanelId,
    ) -> BoxFuture<'_, Result<Vec<PaymentRecord>, StoreError>> {
        Box::pin(async move {
            let state = self.lock()?;
            let mut payments: Vec<PaymentRecord> = state
                .payments
                .values()
                .filter(|p| p.purpose.panel_id() == Some(panel_id))
                .cloned()
                .collect();
            payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(payments)
        })
    }

    fn apply_transition(
        &self,
        request: TransitionRequest,
    ) -> BoxFuture<'_, Result<ApplyOutcome, StoreError>> {
        Box::pin(async move { self.transition(request) })
    }

    fn tickets_for_payment(
        &self,
        payment_id: PaymentId,
    ) -> BoxFuture<'_, Result<Vec<Ticket>, StoreError>> {
        Box::pin(async move {
            let mut tickets: Vec<Ticket> = self
                .lock()?
                .tickets
                .iter()
                .filter(|t| t.payment_id == payment_id)
                .cloned()
                .collect();
            tickets.sort_by(|a, b| a.code.cmp(&b.code));
            Ok(tickets)
        })
    }

    fn list_tickets<'a>(
        &'a self,
        query: &'a TicketQuery,
    ) -> BoxFuture<'a, Result<TicketPage, StoreError>> {
        Box::pin(async move {
            let state = self.lock()?;
            let mut matching: Vec<Ticket> = state
                .tickets
                .iter()
                .filter(|t| query.matches(t))
                .cloned()
                .collect();
            drop(state);
            matching.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.code.cmp(&a.code))
            });
            let total = matching.len() as u64;
            let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
            let page = matching
                .into_iter()
                .skip(offset)
                .take(query.limit as usize)
                .collect();
            Ok(TicketPage::new(query, page, total))
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move { self.lock().map(|_| ()) })
    }
}
