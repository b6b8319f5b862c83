//! HTTP clients for the payment providers.
//!
//! Each client implements [`PaymentGateway`](panelpay_core::gateway::PaymentGateway).
//! Responses are classified the same way for both providers:
//!
//! - transport failures and 5xx → [`GatewayError::Unreachable`]
//! - other non-2xx → [`GatewayError::Rejected`] with the provider's message
//! - unreadable 2xx bodies → [`GatewayError::InvalidResponse`]

pub mod etegram;
pub mod paystack;

pub use etegram::EtegramGateway;
pub use paystack::PaystackGateway;

use panelpay_core::gateway::{GatewayError, PaymentGateway};
use panelpay_core::{Money, Provider};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Build the shared HTTP client used for provider calls.
///
/// # Errors
///
/// Returns the reqwest builder error if the TLS backend cannot initialise.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("panelpay/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// The configured gateways, one per provider.
#[derive(Clone)]
pub struct Gateways {
    paystack: Arc<dyn PaymentGateway>,
    etegram: Arc<dyn PaymentGateway>,
}

impl Gateways {
    /// Bundle a Paystack and an Etegram gateway.
    #[must_use]
    pub fn new(paystack: Arc<dyn PaymentGateway>, etegram: Arc<dyn PaymentGateway>) -> Self {
        Self { paystack, etegram }
    }

    /// Gateway for `provider`.
    #[must_use]
    pub fn get(&self, provider: Provider) -> &Arc<dyn PaymentGateway> {
        match provider {
            Provider::Paystack => &self.paystack,
            Provider::Etegram => &self.etegram,
        }
    }
}

impl std::fmt::Debug for Gateways {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateways")
            .field("paystack", &self.paystack.provider())
            .field("etegram", &self.etegram.provider())
            .finish()
    }
}

/// Send a request and decode a JSON body, classifying failures.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, GatewayError> {
    let response = request
        .send()
        .await
        .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

    if status.is_server_error() {
        return Err(GatewayError::Unreachable(format!("HTTP {status}")));
    }
    if !status.is_success() {
        return Err(GatewayError::Rejected(
            provider_message(&body).unwrap_or_else(|| format!("HTTP {status}")),
        ));
    }

    serde_json::from_str(&body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}

/// The `message` field of a provider error body, if any.
fn provider_message(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// `base` with `segments` appended, each percent-encoded as one path segment.
pub(crate) fn endpoint<'a>(
    base: &str,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<reqwest::Url, GatewayError> {
    let mut url = reqwest::Url::parse(base)
        .map_err(|e| GatewayError::Unreachable(format!("invalid base URL {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| GatewayError::Unreachable(format!("base URL {base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Read an amount that providers send either as a number or a numeric string.
pub(crate) fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Convert a provider amount to [`Money`], given the kobo per reported unit.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(crate) fn to_money(amount: f64, kobo_per_unit: f64) -> Option<Money> {
    let kobo = (amount * kobo_per_unit).round();
    (kobo.is_finite() && kobo >= 0.0 && kobo < i64::MAX as f64)
        .then(|| Money::from_kobo(kobo as i64))
}

/// Read an optional string field, accepting numbers too.
pub(crate) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
