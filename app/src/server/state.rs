//! Application state shared by every handler.
//!
//! Built once at startup; each request clones it cheaply (everything is an
//! `Arc` or a small string).

use crate::checkout::CheckoutService;
use crate::panels::PanelService;
use crate::reconciliation::Reconciler;
use axum::extract::FromRef;
use panelpay_core::Provider;
use panelpay_core::store::PaymentStore;
use std::sync::Arc;

/// Webhook signing secrets, one per provider.
#[derive(Clone, Default)]
pub struct WebhookSecrets {
    /// Paystack secret key
    pub paystack: Option<String>,
    /// Etegram secret key
    pub etegram: Option<String>,
}

impl WebhookSecrets {
    /// Secret for `provider`, if configured.
    #[must_use]
    pub fn get(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Paystack => self.paystack.as_deref(),
            Provider::Etegram => self.etegram.as_deref(),
        }
    }
}

impl std::fmt::Debug for WebhookSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSecrets")
            .field("paystack", &self.paystack.is_some())
            .field("etegram", &self.etegram.is_some())
            .finish()
    }
}

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage, for reads that need no service logic
    pub store: Arc<dyn PaymentStore>,

    /// Verify-and-apply service behind the verify endpoints and webhooks
    pub reconciler: Reconciler,

    /// Checkout initiation
    pub checkout: CheckoutService,

    /// Panel registration and availability checks
    pub panels: PanelService,

    /// Webhook signature secrets
    pub secrets: WebhookSecrets,

    /// Public site URL used for post-payment redirects
    pub public_base_url: Arc<str>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        store: Arc<dyn PaymentStore>,
        reconciler: Reconciler,
        checkout: CheckoutService,
        panels: PanelService,
        secrets: WebhookSecrets,
        public_base_url: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            store,
            reconciler,
            checkout,
            panels,
            secrets,
            public_base_url: public_base_url.into(),
        }
    }
}

impl FromRef<AppState> for Reconciler {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.reconciler.clone()
    }
}

impl FromRef<AppState> for Arc<dyn PaymentStore> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.store)
    }
}
