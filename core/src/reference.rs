//! Payment references.
//!
//! A reference correlates one local payment row with one provider
//! transaction. Generated references look like `PSK-1712345678901-AB12CD3`.

use crate::error::PaymentError;
use crate::provider::Provider;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum accepted reference length.
pub const MAX_REFERENCE_LEN: usize = 100;

const SUFFIX_LEN: usize = 7;

/// A validated payment reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PaymentReference(String);

impl PaymentReference {
    /// Mint a fresh reference for `provider` at `now`.
    #[must_use]
    pub fn generate(provider: Provider, now: DateTime<Utc>) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(Alphanumeric)
            .map(char::from)
            .map(|c| c.to_ascii_uppercase())
            .take(SUFFIX_LEN)
            .collect();

        Self(format!(
            "{}-{}-{suffix}",
            provider.reference_prefix(),
            now.timestamp_millis()
        ))
    }

    /// Validate a reference received from a client or provider.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Validation`] when the reference is empty,
    /// longer than [`MAX_REFERENCE_LEN`], or contains characters other than
    /// ASCII alphanumerics, `-` and `_`.
    pub fn parse(raw: &str) -> Result<Self, PaymentError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PaymentError::validation("Payment reference is required"));
        }
        if trimmed.len() > MAX_REFERENCE_LEN {
            return Err(PaymentError::validation(format!(
                "Payment reference exceeds {MAX_REFERENCE_LEN} characters"
            )));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(PaymentError::validation(
                "Payment reference contains invalid characters",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the reference string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Provider implied by the prefix, if any.
    #[must_use]
    pub fn provider(&self) -> Option<Provider> {
        Provider::from_reference(&self.0)
    }
}

impl TryFrom<String> for PaymentReference {
    type Error = PaymentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PaymentReference> for String {
    fn from(value: PaymentReference) -> Self {
        value.0
    }
}

impl AsRef<str> for PaymentReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
