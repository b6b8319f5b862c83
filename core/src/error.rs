//! Error taxonomy for payment operations.

use crate::provider::Provider;
use crate::store::StoreError;
use crate::types::Money;
use thiserror::Error;

/// Errors surfaced by intake, checkout and reconciliation.
///
/// "Not applicable" conditions (unknown reference on a webhook, unmapped
/// provider status, already completed payment) are *outcomes*, not errors;
/// see `reconcile::Outcome`.
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Malformed request or field.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (payment, panel, ...)
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Neither the explicit provider nor the reference prefix is known.
    #[error("Unknown payment provider for {0}")]
    UnknownProvider(String),

    /// Network failure or 5xx from the provider. Safe to retry later.
    #[error("{provider} is unreachable: {message}")]
    ProviderUnreachable {
        /// Provider that failed
        provider: Provider,
        /// Transport or status detail
        message: String,
    },

    /// The provider answered but refused or could not verify the request.
    #[error("{provider} rejected the request: {message}")]
    ProviderRejected {
        /// Provider that rejected
        provider: Provider,
        /// Provider-supplied message
        message: String,
    },

    /// Provider-reported amount is outside tolerance. Needs manual review.
    #[error("Amount mismatch for {reference}: expected {expected}, provider reported {received}")]
    AmountMismatch {
        /// Payment reference
        reference: String,
        /// Locally stored amount
        expected: Money,
        /// Amount reported by the provider
        received: Money,
    },

    /// The provider answered for a different transaction. Needs manual review.
    #[error("Provider answered for {reported}, not {reference}")]
    ReferenceMismatch {
        /// Payment reference being reconciled
        reference: String,
        /// Reference in the provider's answer
        reported: String,
    },

    /// Server-held secret for the provider is not configured.
    #[error("Configuration missing for {0}")]
    ProviderConfigMissing(Provider),

    /// The requested subdomain already belongs to a panel.
    #[error("Subdomain already exists: {0}")]
    DuplicateSubdomain(String),

    /// Storage layer failure.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl PaymentError {
    /// Shorthand for a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Shorthand for a not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether the caller may retry the same request later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnreachable { .. } | Self::Storage(_))
    }
}

/// Result alias for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;
