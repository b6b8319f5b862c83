//! Checkout initiation.
//!
//! Prices the request from the fixed catalogue, persists a `PENDING`
//! payment under a fresh reference, then asks the provider for a checkout
//! URL. The payment row is written before the provider call, so a failed
//! initialisation leaves a pending row that a later reconciliation can
//! still resolve.

use crate::metrics;
use crate::providers::{Gateways, to_money};
use panelpay_core::environment::Clock;
use panelpay_core::gateway::{CheckoutRequest, CheckoutSession};
use panelpay_core::model::{Attendee, NewPayment, PaymentPurpose, PaymentRecord};
use panelpay_core::pricing::{CartItem, CartQuote, PanelPlan, PanelQuote, quote_cart, quote_panel};
use panelpay_core::store::PaymentStore;
use panelpay_core::validation::{is_valid_email, required};
use panelpay_core::{Money, PanelId, PaymentError, PaymentReference, Provider};
use serde_json::{Value, json};
use std::sync::Arc;

/// Provider used when a panel checkout does not name one.
pub const DEFAULT_PANEL_PROVIDER: Provider = Provider::Etegram;

/// Panel setup checkout input.
#[derive(Debug, Clone)]
pub struct PanelCheckoutRequest {
    /// Panel to activate
    pub panel_id: PanelId,
    /// Plan name; unknown names fall back to monthly
    pub plan: Option<String>,
    /// Provider name; defaults to [`DEFAULT_PANEL_PROVIDER`]
    pub provider: Option<String>,
}

/// Opened panel checkout.
#[derive(Debug, Clone)]
pub struct PanelCheckout {
    /// Stored pending payment
    pub payment: PaymentRecord,
    /// Price breakdown
    pub quote: PanelQuote,
    /// Where to send the owner
    pub checkout_url: String,
}

/// Ticket checkout input.
#[derive(Debug, Clone, Default)]
pub struct TicketCheckoutRequest {
    /// Client checkout session
    pub session_id: Option<String>,
    /// Provider name
    pub method: Option<String>,
    /// Buyer name
    pub attendee_name: Option<String>,
    /// Buyer email
    pub attendee_email: Option<String>,
    /// Buyer phone
    pub attendee_phone: Option<String>,
    /// Buyer company
    pub attendee_company: Option<String>,
    /// Buyer job title
    pub attendee_job_title: Option<String>,
    /// Requested ticket lines
    pub tickets: Vec<CartItem>,
    /// Client-computed total in naira, checked against the catalogue
    pub amount: Option<f64>,
    /// Where the provider should send the buyer back
    pub callback_url: Option<String>,
}

/// Opened ticket checkout.
#[derive(Debug, Clone)]
pub struct TicketCheckout {
    /// Stored pending payment
    pub payment: PaymentRecord,
    /// Priced cart
    pub quote: CartQuote,
    /// Where to send the buyer
    pub checkout_url: String,
}

/// Creates pending payments and opens provider checkouts.
#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn PaymentStore>,
    gateways: Gateways,
    clock: Arc<dyn Clock>,
    public_base_url: String,
}

impl CheckoutService {
    /// Create a checkout service.
    #[must_use]
    pub fn new(
        store: Arc<dyn PaymentStore>,
        gateways: Gateways,
        clock: Arc<dyn Clock>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            gateways,
            clock,
            public_base_url: public_base_url.into(),
        }
    }

    /// Open a setup-fee checkout for an existing panel.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::NotFound`] for an unknown panel
    /// - [`PaymentError::UnknownProvider`] for an unknown provider name
    /// - provider and storage errors from persisting or initialising
    pub async fn initiate_panel(
        &self,
        request: PanelCheckoutRequest,
        request_meta: Value,
    ) -> Result<PanelCheckout, PaymentError> {
        let panel = self
            .store
            .get_panel(request.panel_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("Panel", request.panel_id))?;

        let provider = match request.provider.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Provider::parse(name)?,
            _ => DEFAULT_PANEL_PROVIDER,
        };
        let plan = PanelPlan::parse_lenient(request.plan.as_deref());
        let quote = quote_panel(plan);

        let payment = self
            .create_pending(
                provider,
                quote.total,
                PaymentPurpose::PanelSetup {
                    panel_id: panel.id,
                    plan,
                },
                json!({ "request": request_meta }),
            )
            .await?;

        let session = self
            .open(
                &payment,
                panel.owner_email.clone(),
                None,
                json!({
                    "panel_id": panel.id,
                    "plan": plan.as_str(),
                    "kind": payment.purpose.kind().as_str(),
                }),
            )
            .await?;

        Ok(PanelCheckout {
            payment,
            quote,
            checkout_url: session.checkout_url,
        })
    }

    /// Open a checkout for a ticket cart.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::Validation`] for missing buyer details, a bad cart,
    ///   or a declared amount that differs from the catalogue total
    /// - [`PaymentError::UnknownProvider`] for an unknown provider name
    /// - provider and storage errors from persisting or initialising
    pub async fn process_tickets(
        &self,
        request: TicketCheckoutRequest,
        request_meta: Value,
    ) -> Result<TicketCheckout, PaymentError> {
        let provider = Provider::parse(&required("method", request.method.as_deref())?)?;
        let attendee = attendee_from(&request)?;
        let quote =
            quote_cart(&request.tickets).map_err(|e| PaymentError::validation(e.to_string()))?;

        if let Some(declared) = request.amount {
            if to_money(declared, 100.0) != Some(quote.total) {
                return Err(PaymentError::validation(format!(
                    "amount {declared} does not match ticket total {}",
                    quote.total
                )));
            }
        }

        let session_id = request
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let payment = self
            .create_pending(
                provider,
                quote.total,
                PaymentPurpose::TicketPurchase {
                    session_id: session_id.clone(),
                    attendee: attendee.clone(),
                    items: quote.items.clone(),
                },
                json!({ "request": request_meta }),
            )
            .await?;

        let session = self
            .open(
                &payment,
                attendee.email.clone(),
                request.callback_url.filter(|url| !url.trim().is_empty()),
                json!({
                    "sessionId": session_id,
                    "attendee_name": attendee.name,
                    "attendee_phone": attendee.phone,
                    "tickets": quote.items,
                }),
            )
            .await?;

        Ok(TicketCheckout {
            payment,
            quote,
            checkout_url: session.checkout_url,
        })
    }

    async fn create_pending(
        &self,
        provider: Provider,
        amount: Money,
        purpose: PaymentPurpose,
        metadata: Value,
    ) -> Result<PaymentRecord, PaymentError> {
        let now = self.clock.now();
        let kind = purpose.kind();

        let payment = self
            .store
            .create_payment(
                NewPayment {
                    reference: PaymentReference::generate(provider, now),
                    provider,
                    amount,
                    purpose,
                    metadata,
                },
                now,
            )
            .await?;

        metrics::record_payment_initiated(provider, kind);
        tracing::info!(
            reference = %payment.reference,
            %provider,
            kind = kind.as_str(),
            amount = amount.kobo(),
            "Pending payment created"
        );
        Ok(payment)
    }

    async fn open(
        &self,
        payment: &PaymentRecord,
        email: String,
        callback_url: Option<String>,
        metadata: Value,
    ) -> Result<CheckoutSession, PaymentError> {
        let callback_url = callback_url
            .unwrap_or_else(|| format!("{}/api/payment/verify", self.public_base_url));

        self.gateways
            .get(payment.provider)
            .initialize(CheckoutRequest {
                reference: payment.reference.clone(),
                amount: payment.amount,
                email,
                callback_url: Some(callback_url),
                metadata,
            })
            .await
            .map_err(|e| {
                tracing::error!(
                    reference = %payment.reference,
                    provider = %payment.provider,
                    error = %e,
                    "Checkout initialisation failed; payment left pending"
                );
                e.into_payment_error(payment.provider)
            })
    }
}

fn attendee_from(request: &TicketCheckoutRequest) -> Result<Attendee, PaymentError> {
    let name = required("attendeeName", request.attendee_name.as_deref())?;
    let email = required("attendeeEmail", request.attendee_email.as_deref())?;
    if !is_valid_email(&email) {
        return Err(PaymentError::validation("attendeeEmail is not a valid email"));
    }

    let optional = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    Ok(Attendee {
        name,
        email,
        phone: optional(&request.attendee_phone),
        company: optional(&request.attendee_company),
        job_title: optional(&request.attendee_job_title),
    })
}

impl std::fmt::Debug for CheckoutService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutService")
            .field("gateways", &self.gateways)
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}
