//! Webhook signature checks.
//!
//! | Provider | Header                 | Algorithm                      |
//! |----------|------------------------|--------------------------------|
//! | Paystack | `x-paystack-signature` | hex HMAC-SHA512 of the raw body |
//! | Etegram  | `x-etegram-signature`  | hex HMAC-SHA256 of the raw body |
//!
//! Both are keyed with the provider's secret key. A missing header always
//! fails; there is no unsigned mode.

use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use panelpay_core::Provider;
use sha2::{Sha256, Sha512};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

/// Signature check failures.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureError {
    /// The provider secret is not configured.
    #[error("webhook secret is not configured")]
    NotConfigured,
    /// The signature header is absent or empty.
    #[error("missing signature header")]
    Missing,
    /// The signature does not match the body.
    #[error("invalid signature")]
    Mismatch,
}

/// Header carrying the signature for `provider`.
#[must_use]
pub const fn header_name(provider: Provider) -> &'static str {
    match provider {
        Provider::Paystack => "x-paystack-signature",
        Provider::Etegram => "x-etegram-signature",
    }
}

/// Hex signature of `body` for `provider`.
#[must_use]
pub fn sign(provider: Provider, secret: &str, body: &[u8]) -> String {
    match provider {
        Provider::Paystack => {
            // HMAC accepts keys of any length.
            let Ok(mut mac) = HmacSha512::new_from_slice(secret.as_bytes()) else {
                return String::new();
            };
            mac.update(body);
            hex::encode(mac.finalize().into_bytes())
        }
        Provider::Etegram => {
            let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
                return String::new();
            };
            mac.update(body);
            hex::encode(mac.finalize().into_bytes())
        }
    }
}

/// Check a webhook signature in constant time.
///
/// # Errors
///
/// Returns [`SignatureError`] when the secret is missing, the header is
/// missing, or the signature does not match.
pub fn verify(
    provider: Provider,
    secret: Option<&str>,
    body: &[u8],
    header: Option<&str>,
) -> Result<(), SignatureError> {
    let secret = secret
        .filter(|s| !s.is_empty())
        .ok_or(SignatureError::NotConfigured)?;
    let received = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(SignatureError::Missing)?
        .to_ascii_lowercase();

    let expected = sign(provider, secret, body);
    if !expected.is_empty() && constant_time_eq(expected.as_bytes(), received.as_bytes()) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BODY: &[u8] = br#"{"event":"charge.success","data":{"reference":"PSK-171234-ABC"}}"#;

    #[test]
    fn test_signature_lengths() {
        assert_eq!(sign(Provider::Paystack, "sk_test", BODY).len(), 128);
        assert_eq!(sign(Provider::Etegram, "sk_test", BODY).len(), 64);
    }

    #[test]
    fn test_valid_signature() {
        let signature = sign(Provider::Paystack, "sk_test", BODY);
        assert_eq!(
            verify(Provider::Paystack, Some("sk_test"), BODY, Some(&signature)),
            Ok(())
        );
    }

    #[test]
    fn test_uppercase_hex_is_accepted() {
        let signature = sign(Provider::Etegram, "sk_test", BODY).to_uppercase();
        assert_eq!(
            verify(Provider::Etegram, Some("sk_test"), BODY, Some(&signature)),
            Ok(())
        );
    }

    #[test]
    fn test_missing_header_is_rejected() {
        assert_eq!(
            verify(Provider::Paystack, Some("sk_test"), BODY, None),
            Err(SignatureError::Missing)
        );
        assert_eq!(
            verify(Provider::Paystack, Some("sk_test"), BODY, Some("  ")),
            Err(SignatureError::Missing)
        );
    }

    #[test]
    fn test_missing_secret() {
        assert_eq!(
            verify(Provider::Etegram, None, BODY, Some("abc")),
            Err(SignatureError::NotConfigured)
        );
    }

    #[test]
    fn test_algorithms_are_not_interchangeable() {
        let sha256 = sign(Provider::Etegram, "sk_test", BODY);
        assert_eq!(
            verify(Provider::Paystack, Some("sk_test"), BODY, Some(&sha256)),
            Err(SignatureError::Mismatch)
        );
    }

    proptest! {
        #[test]
        fn prop_tampered_body_fails(body in proptest::collection::vec(any::<u8>(), 1..256), flip in any::<prop::sample::Index>()) {
            let signature = sign(Provider::Paystack, "sk_test", &body);
            let mut tampered = body.clone();
            let at = flip.index(tampered.len());
            tampered[at] ^= 0x01;
            prop_assert_eq!(
                verify(Provider::Paystack, Some("sk_test"), &tampered, Some(&signature)),
                Err(SignatureError::Mismatch)
            );
        }
    }
}
