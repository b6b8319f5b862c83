//! Etegram client.
//!
//! Verification has two paths:
//!
//! - with an access code and a project id:
//!   `PATCH {checkout}/api/transaction/verify-payment/{projectId}/{accessCode}`,
//!   amounts in naira
//! - otherwise the legacy by-reference endpoint:
//!   `GET {legacy}/api/verify/{reference}` with the secret key as bearer,
//!   amounts in kobo
//!
//! Checkout is rendered client-side, so `initialize` only builds the URL of
//! the hosted checkout page.

use super::{endpoint, numeric, send_json, text, to_money};
use crate::config::EtegramConfig;
use panelpay_core::gateway::{
    CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway, ProviderVerification,
    VerifyRequest,
};
use panelpay_core::{BoxFuture, Money, Provider};
use serde_json::Value;

const KOBO_PER_NAIRA: f64 = 100.0;

/// Etegram API client.
#[derive(Debug, Clone)]
pub struct EtegramGateway {
    client: reqwest::Client,
    checkout_base_url: String,
    legacy_base_url: String,
    secret_key: Option<String>,
    project_id: Option<String>,
    public_base_url: String,
}

impl EtegramGateway {
    /// Create a client from configuration.
    ///
    /// `public_base_url` hosts the checkout page returned by `initialize`.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &EtegramConfig, public_base_url: &str) -> Self {
        Self {
            client,
            checkout_base_url: config.checkout_base_url.clone(),
            legacy_base_url: config.legacy_base_url.clone(),
            secret_key: config.secret_key.clone(),
            project_id: config.project_id.clone(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn verify_payment(
        &self,
        request: VerifyRequest,
    ) -> Result<ProviderVerification, GatewayError> {
        let project_id = request
            .project_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(self.project_id.as_deref());

        match (request.access_code.as_deref().filter(|a| !a.is_empty()), project_id) {
            (Some(access_code), Some(project_id)) => {
                let url = endpoint(
                    &self.checkout_base_url,
                    ["api", "transaction", "verify-payment", project_id, access_code],
                )?;
                let body: Value = send_json(self.client.patch(url)).await?;
                checkout_verification(&body)
            }
            _ => {
                let secret = self.secret_key.as_deref().ok_or(GatewayError::ConfigMissing)?;
                let url = endpoint(
                    &self.legacy_base_url,
                    ["api", "verify", request.reference.as_str()],
                )?;
                let body: Value = send_json(self.client.get(url).bearer_auth(secret)).await?;
                legacy_verification(&body, request.reference.as_str())
            }
        }
    }

    fn checkout_url(&self, request: &CheckoutRequest) -> CheckoutSession {
        CheckoutSession {
            checkout_url: format!(
                "{}/payment/etegram/checkout?ref={}",
                self.public_base_url, request.reference
            ),
            access_code: None,
        }
    }
}

fn is_truthy(status: &Value) -> bool {
    match status {
        Value::Bool(flag) => *flag,
        Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "success" | "successful"),
        _ => false,
    }
}

/// Status string from a field that may be a string or a boolean flag.
fn status_text(status: &Value) -> Option<String> {
    match status {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Bool(true) => Some("success".to_string()),
        Value::Bool(false) => Some("failed".to_string()),
        _ => None,
    }
}

/// Missing amounts read as zero so a reported success fails the amount check.
fn amount(value: &Value, kobo_per_unit: f64) -> Result<Money, GatewayError> {
    if value.is_null() {
        return Ok(Money::ZERO);
    }
    numeric(value)
        .and_then(|units| to_money(units, kobo_per_unit))
        .ok_or_else(|| GatewayError::InvalidResponse(format!("invalid amount {value}")))
}

/// The access code is caller-supplied, so the transaction's own reference
/// must be in the answer; it is never filled in from the request.
fn checkout_verification(body: &Value) -> Result<ProviderVerification, GatewayError> {
    let data = body.get("data").filter(|d| d.is_object());

    let Some(data) = data else {
        if is_truthy(&body["status"]) {
            return Err(GatewayError::InvalidResponse(
                "verification body has no data".to_string(),
            ));
        }
        return Err(GatewayError::Rejected(
            text(&body["message"]).unwrap_or_else(|| "Etegram verification failed".to_string()),
        ));
    };

    let status = status_text(&data["status"])
        .or_else(|| status_text(&Value::Bool(is_truthy(&body["status"]))))
        .unwrap_or_else(|| "failed".to_string());

    let reference = text(&data["reference"]).ok_or_else(|| {
        GatewayError::InvalidResponse("verification data has no reference".to_string())
    })?;

    Ok(ProviderVerification {
        reference,
        status,
        amount: amount(&data["amount"], KOBO_PER_NAIRA)?,
        paid_at: text(&data["paid_at"]),
        channel: text(&data["channel"]),
        metadata: data["metadata"].clone(),
    })
}

fn legacy_verification(body: &Value, reference: &str) -> Result<ProviderVerification, GatewayError> {
    let status = status_text(&body["status"]).ok_or_else(|| {
        GatewayError::InvalidResponse("verification body has no status".to_string())
    })?;

    Ok(ProviderVerification {
        reference: text(&body["reference"]).unwrap_or_else(|| reference.to_string()),
        status,
        amount: amount(&body["amount"], 1.0)?,
        paid_at: text(&body["paid_at"]),
        channel: text(&body["channel"]),
        metadata: body["metadata"].clone(),
    })
}

impl PaymentGateway for EtegramGateway {
    fn provider(&self) -> Provider {
        Provider::Etegram
    }

    fn verify(
        &self,
        request: VerifyRequest,
    ) -> BoxFuture<'_, Result<ProviderVerification, GatewayError>> {
        Box::pin(self.verify_payment(request))
    }

    fn initialize(
        &self,
        request: CheckoutRequest,
    ) -> BoxFuture<'_, Result<CheckoutSession, GatewayError>> {
        let session = self.checkout_url(&request);
        Box::pin(async move { Ok(session) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(secret: Option<&str>) -> EtegramConfig {
        EtegramConfig {
            secret_key: secret.map(str::to_string),
            project_id: None,
            checkout_base_url: "http://127.0.0.1:9".to_string(),
            legacy_base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_checkout_body_amount_in_naira() {
        let body = json!({
            "status": true,
            "message": "ok",
            "data": {
                "status": "successful",
                "amount": "20000",
                "reference": "ETG-1700000000000-ABCDEFG",
                "channel": "bank_transfer"
            }
        });

        let verification = checkout_verification(&body).unwrap();
        assert_eq!(verification.status, "successful");
        assert_eq!(verification.amount, Money::from_naira(20_000));
        assert_eq!(verification.channel.as_deref(), Some("bank_transfer"));
    }

    #[test]
    fn test_checkout_status_falls_back_to_flag() {
        let body = json!({"status": true, "data": {"amount": 5000, "reference": "ETG-1-A"}});
        let verification = checkout_verification(&body).unwrap();
        assert_eq!(verification.status, "success");
        assert_eq!(verification.reference, "ETG-1-A");
    }

    #[test]
    fn test_checkout_answer_must_name_its_reference() {
        let body = json!({"status": true, "data": {"status": "successful", "amount": 20000}});
        assert!(matches!(
            checkout_verification(&body),
            Err(GatewayError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_checkout_failure_without_data() {
        let body = json!({"status": false, "message": "Invalid access code"});
        assert_eq!(
            checkout_verification(&body),
            Err(GatewayError::Rejected("Invalid access code".to_string()))
        );
    }

    #[test]
    fn test_legacy_body_amount_in_kobo() {
        let body = json!({"status": "success", "amount": 2_000_000, "reference": "ETG-1-A"});
        let verification = legacy_verification(&body, "ETG-1-A").unwrap();
        assert_eq!(verification.amount, Money::from_naira(20_000));
    }

    #[test]
    fn test_missing_amount_reads_zero() {
        let body = json!({"status": "success"});
        let verification = legacy_verification(&body, "ETG-1-A").unwrap();
        assert_eq!(verification.amount, Money::ZERO);
    }

    #[tokio::test]
    async fn test_legacy_path_needs_secret() {
        let gateway = EtegramGateway::new(reqwest::Client::new(), &config(None), "http://site");
        let reference = panelpay_core::PaymentReference::parse("ETG-1-ABC").unwrap();

        let result = gateway.verify(VerifyRequest::for_reference(reference)).await;
        assert_eq!(result, Err(GatewayError::ConfigMissing));
    }

    #[tokio::test]
    async fn test_checkout_url() {
        let gateway =
            EtegramGateway::new(reqwest::Client::new(), &config(None), "https://tickets.example/");
        let session = gateway
            .initialize(CheckoutRequest {
                reference: panelpay_core::PaymentReference::parse("ETG-1-ABC").unwrap(),
                amount: Money::from_naira(20_000),
                email: "ada@example.com".to_string(),
                callback_url: None,
                metadata: Value::Null,
            })
            .await
            .unwrap();

        assert_eq!(
            session.checkout_url,
            "https://tickets.example/payment/etegram/checkout?ref=ETG-1-ABC"
        );
    }
}
