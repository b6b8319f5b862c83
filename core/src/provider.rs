//! Payment providers and reference-prefix resolution.

use crate::error::PaymentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A third-party payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Paystack (HMAC-SHA512 webhooks, amounts in kobo)
    Paystack,
    /// Etegram (HMAC-SHA256 webhooks, amounts in naira)
    Etegram,
}

impl Provider {
    /// Both providers.
    pub const ALL: [Self; 2] = [Self::Paystack, Self::Etegram];

    /// Lowercase name used in URLs, metadata keys and the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Paystack => "paystack",
            Self::Etegram => "etegram",
        }
    }

    /// Prefix stamped on references generated for this provider.
    #[must_use]
    pub const fn reference_prefix(&self) -> &'static str {
        match self {
            Self::Paystack => "PSK",
            Self::Etegram => "ETG",
        }
    }

    /// Parse an explicit provider name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::UnknownProvider`] for any other name.
    pub fn parse(name: &str) -> Result<Self, PaymentError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "paystack" => Ok(Self::Paystack),
            "etegram" => Ok(Self::Etegram),
            _ => Err(PaymentError::UnknownProvider(name.to_string())),
        }
    }

    /// Infer the provider from a reference prefix.
    ///
    /// `PSTK-` is accepted for references minted by the older panel checkout.
    #[must_use]
    pub fn from_reference(reference: &str) -> Option<Self> {
        if reference.starts_with("ETG-") {
            Some(Self::Etegram)
        } else if reference.starts_with("PSK-") || reference.starts_with("PSTK-") {
            Some(Self::Paystack)
        } else {
            None
        }
    }

    /// Resolve the provider for a reconciliation request.
    ///
    /// An explicit hint wins over the reference prefix.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::UnknownProvider`] when the hint is not a known
    /// provider, or when there is no hint and the prefix matches nothing.
    pub fn resolve(hint: Option<&str>, reference: &str) -> Result<Self, PaymentError> {
        match hint {
            Some(name) if !name.trim().is_empty() => Self::parse(name),
            _ => Self::from_reference(reference)
                .ok_or_else(|| PaymentError::UnknownProvider(reference.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_from_prefix() {
        assert_eq!(Provider::resolve(None, "PSK-171234-ABC").ok(), Some(Provider::Paystack));
        assert_eq!(Provider::resolve(None, "PSTK-MONTHLY-1-ab").ok(), Some(Provider::Paystack));
        assert_eq!(Provider::resolve(None, "ETG-171234-XYZ").ok(), Some(Provider::Etegram));
    }

    #[test]
    fn test_hint_overrides_prefix() {
        assert_eq!(
            Provider::resolve(Some("Etegram"), "PSK-1-A").ok(),
            Some(Provider::Etegram)
        );
    }

    #[test]
    fn test_unknown_provider() {
        assert!(matches!(
            Provider::resolve(None, "order-42"),
            Err(PaymentError::UnknownProvider(_))
        ));
        assert!(matches!(
            Provider::resolve(Some("stripe"), "PSK-1-A"),
            Err(PaymentError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_blank_hint_falls_back_to_prefix() {
        assert_eq!(Provider::resolve(Some("  "), "ETG-1-A").ok(), Some(Provider::Etegram));
    }
}
