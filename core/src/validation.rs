//! Input validation for intake and domain checks.

use crate::error::PaymentError;
use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

static NIGERIAN_PHONE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(\+234|0)[789][01]\d{8}$").ok());

static SUBDOMAIN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").ok());

static DOMAIN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z0-9][a-z0-9-]{0,61}[a-z0-9]$").ok()
});

fn matches(re: &LazyLock<Option<Regex>>, value: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(value))
}

/// Shortest accepted subdomain.
pub const SUBDOMAIN_MIN_LEN: usize = 3;
/// Longest accepted subdomain (one DNS label).
pub const SUBDOMAIN_MAX_LEN: usize = 63;

/// Whether `email` looks like an address.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    matches(&EMAIL, email.trim())
}

/// Validate a Nigerian mobile number and normalise it to `+234XXXXXXXXXX`.
///
/// Spaces are ignored.
///
/// # Errors
///
/// Returns [`PaymentError::Validation`] for anything that is not a
/// Nigerian mobile number.
pub fn normalize_nigerian_phone(phone: &str) -> Result<String, PaymentError> {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    if !matches(&NIGERIAN_PHONE, &compact) {
        return Err(PaymentError::validation(
            "Phone number must be a valid Nigerian mobile number",
        ));
    }
    Ok(match compact.strip_prefix('0') {
        Some(rest) => format!("+234{rest}"),
        None => compact,
    })
}

/// Check subdomain format; returns the reason when invalid.
#[must_use]
pub fn subdomain_format_error(subdomain: &str) -> Option<&'static str> {
    if subdomain.len() < SUBDOMAIN_MIN_LEN {
        Some("Subdomain must be at least 3 characters")
    } else if subdomain.len() > SUBDOMAIN_MAX_LEN {
        Some("Subdomain must be at most 63 characters")
    } else if !matches(&SUBDOMAIN, subdomain) {
        Some("Subdomain can only contain lowercase letters, numbers, and hyphens")
    } else {
        None
    }
}

/// Whether `domain` is a syntactically valid lowercase host name.
#[must_use]
pub fn is_valid_domain(domain: &str) -> bool {
    matches(&DOMAIN, domain)
}

/// Require a non-blank string field.
///
/// # Errors
///
/// Returns [`PaymentError::Validation`] naming the field when blank.
pub fn required(field: &str, value: Option<&str>) -> Result<String, PaymentError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| PaymentError::validation(format!("{field} is required")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(is_valid_email("ada@example.com"));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example@x.com"));
    }

    #[test]
    fn test_phone_normalisation() {
        assert_eq!(normalize_nigerian_phone("0803 123 4567").unwrap(), "+2348031234567");
        assert_eq!(normalize_nigerian_phone("+2349012345678").unwrap(), "+2349012345678");
        assert!(normalize_nigerian_phone("08231234567").is_err());
        assert!(normalize_nigerian_phone("+14155552671").is_err());
    }

    #[test]
    fn test_subdomain_rules() {
        assert_eq!(subdomain_format_error("my-panel"), None);
        assert!(subdomain_format_error("ab").is_some());
        assert!(subdomain_format_error("My-Panel").is_some());
        assert!(subdomain_format_error(&"a".repeat(64)).is_some());
    }

    #[test]
    fn test_domain_format() {
        assert!(is_valid_domain("events.example.com"));
        assert!(!is_valid_domain("localhost"));
        assert!(!is_valid_domain("-bad.example.com"));
        assert!(!is_valid_domain("Example.com"));
    }

    #[test]
    fn test_required() {
        assert_eq!(required("name", Some(" Ada ")).unwrap(), "Ada");
        assert!(required("name", Some("  ")).is_err());
        assert!(required("name", None).is_err());
    }
}
