//! Payment reconciliation service.
//!
//! One entry point, [`Reconciler::reconcile`], serves the verify endpoint,
//! the provider callback and both webhooks:
//!
//! 1. resolve the provider from the hint or the reference prefix
//! 2. load the local payment (unknown references are acknowledged with no
//!    provider call and no writes)
//! 3. ask the provider for the authoritative status
//! 4. decide: already completed, ignore, unchanged, or transition; an
//!    answer for another reference or amount is rejected
//! 5. apply the transition and its side effects in one store transaction
//! 6. after commit, send confirmation emails (best effort)
//!
//! The store's guarded write makes concurrent calls for the same reference
//! safe: exactly one of them observes `Applied`, the others `Superseded`.

use crate::metrics;
use crate::notifications::Notifier;
use crate::providers::Gateways;
use panelpay_core::environment::Clock;
use panelpay_core::gateway::{ProviderVerification, VerifyRequest};
use panelpay_core::model::{PaymentPurpose, PaymentRecord, Ticket};
use panelpay_core::reconcile::{Decision, Outcome, build_transition, decide};
use panelpay_core::store::{ApplyOutcome, PaymentStore};
use panelpay_core::{PaymentError, PaymentReference, PaymentStatus, Provider};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// A request to reconcile one reference.
#[derive(Debug, Clone, Default)]
pub struct ReconcileRequest {
    /// Raw reference as received
    pub reference: String,
    /// Explicit provider name (`paystack` / `etegram`)
    pub provider: Option<String>,
    /// Etegram checkout access code
    pub access_code: Option<String>,
    /// Etegram project id
    pub project_id: Option<String>,
}

impl ReconcileRequest {
    /// Reconcile `reference`, resolving the provider from its prefix.
    #[must_use]
    pub fn for_reference(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Self::default()
        }
    }

    /// Use `provider` instead of the reference prefix.
    #[must_use]
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider.as_str().to_string());
        self
    }
}

/// Result of a reconciliation call.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Validated reference
    pub reference: PaymentReference,
    /// Provider that answered
    pub provider: Provider,
    /// What happened locally
    pub outcome: Outcome,
    /// Local status after the call; `None` for unknown references
    pub status: Option<PaymentStatus>,
    /// The provider's answer; `None` for unknown references
    pub verification: Option<ProviderVerification>,
}

impl Reconciliation {
    /// Whether the payment is completed after this call.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == Some(PaymentStatus::Completed)
    }
}

/// Reconciles provider answers into local payment state.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn PaymentStore>,
    gateways: Gateways,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    /// Create a reconciler.
    #[must_use]
    pub fn new(
        store: Arc<dyn PaymentStore>,
        gateways: Gateways,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            gateways,
            notifier,
            clock,
        }
    }

    /// Verify a reference with its provider and apply the result once.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::Validation`] for a malformed reference
    /// - [`PaymentError::UnknownProvider`] when no provider can be resolved
    /// - [`PaymentError::ProviderConfigMissing`], [`PaymentError::ProviderUnreachable`],
    ///   [`PaymentError::ProviderRejected`] from the verify call
    /// - [`PaymentError::ReferenceMismatch`] when the provider answers for another reference
    /// - [`PaymentError::AmountMismatch`] when a reported success is outside tolerance
    /// - [`PaymentError::Storage`] when the store fails; nothing is partially written
    pub async fn reconcile(&self, request: ReconcileRequest) -> Result<Reconciliation, PaymentError> {
        let reference = PaymentReference::parse(&request.reference)?;
        let provider = Provider::resolve(request.provider.as_deref(), reference.as_str())?;

        let span = tracing::info_span!("reconcile", reference = %reference, provider = %provider);

        let result = self
            .run(reference, provider, request.access_code, request.project_id)
            .instrument(span)
            .await;

        match &result {
            Ok(reconciliation) => {
                metrics::record_reconciliation(provider, reconciliation.outcome.label());
            }
            Err(_) => metrics::record_reconciliation(provider, "error"),
        }
        result
    }

    async fn run(
        &self,
        reference: PaymentReference,
        provider: Provider,
        access_code: Option<String>,
        project_id: Option<String>,
    ) -> Result<Reconciliation, PaymentError> {
        let Some(record) = self.store.find_payment(reference.as_str()).await? else {
            tracing::info!("Reference not recognised; acknowledged without changes");
            return Ok(Reconciliation {
                reference,
                provider,
                outcome: Outcome::UnknownReference,
                status: None,
                verification: None,
            });
        };

        if record.provider != provider {
            tracing::warn!(
                stored_provider = %record.provider,
                "Payment was created for a different provider"
            );
        }

        let verification = self
            .verify_with_provider(&reference, provider, access_code, project_id)
            .await?;

        let decision = decide(&record, &verification).inspect_err(|e| match e {
            PaymentError::AmountMismatch { .. } => {
                metrics::record_amount_mismatch(provider);
                tracing::error!(
                    expected = record.amount.kobo(),
                    received = verification.amount.kobo(),
                    "Amount mismatch; payment left unchanged for manual review"
                );
            }
            PaymentError::ReferenceMismatch { reported, .. } => {
                tracing::error!(
                    %reported,
                    "Provider answered for another reference; payment left unchanged for manual review"
                );
            }
            _ => {}
        })?;

        let (outcome, status) = match decision {
            Decision::AlreadyCompleted => {
                tracing::debug!("Payment already completed; nothing to do");
                (Outcome::AlreadyCompleted, PaymentStatus::Completed)
            }
            Decision::Ignore => {
                tracing::info!(
                    provider_status = %verification.status,
                    "Unrecognised provider status; ignored"
                );
                (
                    Outcome::Ignored {
                        provider_status: verification.status.clone(),
                    },
                    record.status,
                )
            }
            Decision::Unchanged { current, reported } => {
                tracing::debug!(%current, %reported, "Reported status does not move the payment");
                (Outcome::Unchanged { current }, current)
            }
            Decision::Transition { to, .. } => self.apply(&record, to, &verification).await?,
        };

        Ok(Reconciliation {
            reference,
            provider,
            outcome,
            status: Some(status),
            verification: Some(verification),
        })
    }

    async fn verify_with_provider(
        &self,
        reference: &PaymentReference,
        provider: Provider,
        access_code: Option<String>,
        project_id: Option<String>,
    ) -> Result<ProviderVerification, PaymentError> {
        let gateway = self.gateways.get(provider);
        let started = Instant::now();

        let result = gateway
            .verify(VerifyRequest {
                reference: reference.clone(),
                access_code,
                project_id,
            })
            .await;
        metrics::record_verify_duration(provider, started.elapsed().as_secs_f64());

        result.map_err(|e| {
            tracing::warn!(error = %e, "Provider verification failed");
            e.into_payment_error(provider)
        })
    }

    async fn apply(
        &self,
        record: &PaymentRecord,
        to: PaymentStatus,
        verification: &ProviderVerification,
    ) -> Result<(Outcome, PaymentStatus), PaymentError> {
        let now = self.clock.now();
        let transition = build_transition(record, to, verification, now);

        match self.store.apply_transition(transition).await? {
            ApplyOutcome::Applied { from, tickets } => {
                tracing::info!(
                    %from,
                    %to,
                    tickets = tickets.len(),
                    "Payment status updated"
                );
                if !tickets.is_empty() {
                    metrics::record_tickets_issued(tickets.len());
                }
                if to == PaymentStatus::Completed {
                    self.send_confirmations(record, &tickets).await;
                }
                Ok((
                    Outcome::Applied {
                        from,
                        to,
                        tickets_issued: tickets.len(),
                    },
                    to,
                ))
            }
            ApplyOutcome::Superseded { current } => {
                tracing::info!(%current, "Concurrent reconciliation already applied a status");
                Ok((Outcome::Superseded { current }, current))
            }
        }
    }

    async fn send_confirmations(&self, record: &PaymentRecord, tickets: &[Ticket]) {
        match &record.purpose {
            PaymentPurpose::TicketPurchase { attendee, .. } => {
                self.notifier.tickets_issued(attendee, record, tickets).await;
            }
            PaymentPurpose::PanelSetup { panel_id, .. } => match self.store.get_panel(*panel_id).await {
                Ok(Some(panel)) => self.notifier.panel_activated(&panel, record).await,
                Ok(None) => tracing::warn!(panel_id = %panel_id, "Paid panel not found; no email sent"),
                Err(e) => {
                    tracing::warn!(panel_id = %panel_id, error = %e, "Could not load panel for email");
                }
            },
        }
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("gateways", &self.gateways)
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}
