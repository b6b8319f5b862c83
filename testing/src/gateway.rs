//! Scripted [`PaymentGateway`] for tests.

use panelpay_core::BoxFuture;
use panelpay_core::Provider;
use panelpay_core::gateway::{
    CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway, ProviderVerification,
    VerifyRequest,
};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Gateway that replays a configured answer and counts calls.
///
/// With no scripted answer, `verify` reports `Rejected` and `initialize`
/// returns a checkout URL derived from the reference.
#[derive(Debug)]
pub struct MockGateway {
    provider: Provider,
    verify_result: Mutex<Option<Result<ProviderVerification, GatewayError>>>,
    initialize_error: Mutex<Option<GatewayError>>,
    verify_calls: AtomicUsize,
    initialize_calls: AtomicUsize,
}

impl MockGateway {
    /// Create a gateway for `provider`.
    #[must_use]
    pub const fn new(provider: Provider) -> Self {
        Self {
            provider,
            verify_result: Mutex::new(None),
            initialize_error: Mutex::new(None),
            verify_calls: AtomicUsize::new(0),
            initialize_calls: AtomicUsize::new(0),
        }
    }

    /// Answer every subsequent `verify` with `result`.
    pub fn respond_with(&self, result: Result<ProviderVerification, GatewayError>) {
        if let Ok(mut slot) = self.verify_result.lock() {
            *slot = Some(result);
        }
    }

    /// Fail every subsequent `initialize` with `error`.
    pub fn fail_initialize(&self, error: GatewayError) {
        if let Ok(mut slot) = self.initialize_error.lock() {
            *slot = Some(error);
        }
    }

    /// Number of `verify` calls so far.
    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    /// Number of `initialize` calls so far.
    #[must_use]
    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }
}

impl PaymentGateway for MockGateway {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn verify(
        &self,
        _request: VerifyRequest,
    ) -> BoxFuture<'_, Result<ProviderVerification, GatewayError>> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self
            .verify_result
            .lock()
            .ok()
            .and_then(|slot| slot.clone());
        Box::pin(async move {
            scripted.unwrap_or_else(|| Err(GatewayError::Rejected("no scripted answer".to_string())))
        })
    }

    fn initialize(
        &self,
        request: CheckoutRequest,
    ) -> BoxFuture<'_, Result<CheckoutSession, GatewayError>> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        let error = self
            .initialize_error
            .lock()
            .ok()
            .and_then(|slot| slot.clone());
        Box::pin(async move {
            match error {
                Some(error) => Err(error),
                None => Ok(CheckoutSession {
                    checkout_url: format!("https://checkout.test/{}", request.reference),
                    access_code: Some(format!("ac_{}", request.reference)),
                }),
            }
        })
    }
}
