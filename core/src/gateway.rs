//! Payment provider abstraction.
//!
//! A gateway knows how to ask its provider for the authoritative status of a
//! reference and how to open a checkout. Webhook bodies are never trusted for
//! amount or status; reconciliation always goes through [`PaymentGateway::verify`].

use crate::BoxFuture;
use crate::error::PaymentError;
use crate::provider::Provider;
use crate::reference::PaymentReference;
use crate::types::Money;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Gateway errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The server-held secret or project id is not configured.
    #[error("Provider credentials are not configured")]
    ConfigMissing,

    /// Network failure, timeout or 5xx.
    #[error("Provider unreachable: {0}")]
    Unreachable(String),

    /// The provider refused the request or could not find the transaction.
    #[error("Provider rejected request: {0}")]
    Rejected(String),

    /// The provider answered with a body we could not interpret.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Attach the provider and convert into the domain taxonomy.
    #[must_use]
    pub fn into_payment_error(self, provider: Provider) -> PaymentError {
        match self {
            Self::ConfigMissing => PaymentError::ProviderConfigMissing(provider),
            Self::Unreachable(message) => PaymentError::ProviderUnreachable { provider, message },
            Self::Rejected(message) | Self::InvalidResponse(message) => {
                PaymentError::ProviderRejected { provider, message }
            }
        }
    }
}

/// Input to a verification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyRequest {
    /// Local reference
    pub reference: PaymentReference,
    /// Etegram checkout access code, when known
    pub access_code: Option<String>,
    /// Etegram project id override
    pub project_id: Option<String>,
}

impl VerifyRequest {
    /// A request carrying only the reference.
    #[must_use]
    pub const fn for_reference(reference: PaymentReference) -> Self {
        Self {
            reference,
            access_code: None,
            project_id: None,
        }
    }
}

/// Authoritative transaction state reported by a provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderVerification {
    /// Reference echoed by the provider
    pub reference: String,
    /// Raw provider status string
    pub status: String,
    /// Amount normalised to kobo
    pub amount: Money,
    /// Payment time as reported
    pub paid_at: Option<String>,
    /// Payment channel (card, bank, transfer, ...)
    pub channel: Option<String>,
    /// Provider-side metadata
    pub metadata: Value,
}

/// Input to a checkout initialisation.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    /// Local reference
    pub reference: PaymentReference,
    /// Amount to charge
    pub amount: Money,
    /// Payer email
    pub email: String,
    /// Where the provider should send the payer afterwards
    pub callback_url: Option<String>,
    /// Metadata echoed back by the provider
    pub metadata: Value,
}

/// A checkout the payer can be redirected to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    /// Redirect URL
    pub checkout_url: String,
    /// Provider access code, if issued
    pub access_code: Option<String>,
}

/// A payment provider client.
pub trait PaymentGateway: Send + Sync {
    /// Which provider this client talks to.
    fn provider(&self) -> Provider;

    /// Ask the provider for the authoritative state of a reference.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on missing config, transport failure,
    /// rejection, or an unreadable body.
    fn verify(
        &self,
        request: VerifyRequest,
    ) -> BoxFuture<'_, Result<ProviderVerification, GatewayError>>;

    /// Open a checkout for a pending payment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] on missing config, transport failure,
    /// rejection, or an unreadable body.
    fn initialize(
        &self,
        request: CheckoutRequest,
    ) -> BoxFuture<'_, Result<CheckoutSession, GatewayError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            GatewayError::ConfigMissing.into_payment_error(Provider::Paystack),
            PaymentError::ProviderConfigMissing(Provider::Paystack)
        ));
        assert!(matches!(
            GatewayError::Unreachable("timeout".into()).into_payment_error(Provider::Etegram),
            PaymentError::ProviderUnreachable { .. }
        ));
        assert!(matches!(
            GatewayError::InvalidResponse("not json".into()).into_payment_error(Provider::Etegram),
            PaymentError::ProviderRejected { .. }
        ));
    }
}
