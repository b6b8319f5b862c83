//! Paystack client.
//!
//! - verify: `GET {base}/transaction/verify/{reference}`, amounts in kobo
//! - initialize: `POST {base}/transaction/initialize`, amounts in kobo
//!
//! Both calls authenticate with `Authorization: Bearer {PAYSTACK_SECRET_KEY}`.

use super::{endpoint, numeric, send_json, text, to_money};
use crate::config::PaystackConfig;
use panelpay_core::BoxFuture;
use panelpay_core::Provider;
use panelpay_core::gateway::{
    CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway, ProviderVerification,
    VerifyRequest,
};
use serde::Deserialize;
use serde_json::{Value, json};

/// Paystack API client.
#[derive(Debug, Clone)]
pub struct PaystackGateway {
    client: reqwest::Client,
    base_url: String,
    secret_key: Option<String>,
}

/// Paystack wraps every answer in `{status, message, data}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: bool,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Transaction {
    status: String,
    #[serde(default)]
    amount: Value,
    #[serde(default)]
    reference: Value,
    #[serde(default)]
    paid_at: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    metadata: Value,
}

#[derive(Debug, Deserialize)]
struct Authorization {
    authorization_url: String,
    #[serde(default)]
    access_code: Option<String>,
}

impl PaystackGateway {
    /// Create a client from configuration.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &PaystackConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            secret_key: config.secret_key.clone(),
        }
    }

    fn secret(&self) -> Result<&str, GatewayError> {
        self.secret_key.as_deref().ok_or(GatewayError::ConfigMissing)
    }

    async fn verify_reference(
        &self,
        request: VerifyRequest,
    ) -> Result<ProviderVerification, GatewayError> {
        let secret = self.secret()?;
        let url = endpoint(
            &self.base_url,
            ["transaction", "verify", request.reference.as_str()],
        )?;

        let envelope: Envelope<Transaction> =
            send_json(self.client.get(url).bearer_auth(secret)).await?;

        verification_from(envelope, request.reference.as_str())
    }

    async fn open_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession, GatewayError> {
        let secret = self.secret()?;
        let url = endpoint(&self.base_url, ["transaction", "initialize"])?;

        let mut body = json!({
            "email": request.email,
            "amount": request.amount.kobo(),
            "currency": "NGN",
            "reference": request.reference.as_str(),
            "metadata": request.metadata,
        });
        if let Some(callback_url) = &request.callback_url {
            body["callback_url"] = json!(callback_url);
        }

        let envelope: Envelope<Authorization> =
            send_json(self.client.post(url).bearer_auth(secret).json(&body)).await?;

        match envelope {
            Envelope {
                status: true,
                data: Some(data),
                ..
            } => Ok(CheckoutSession {
                checkout_url: data.authorization_url,
                access_code: data.access_code,
            }),
            Envelope { message, .. } => Err(GatewayError::Rejected(
                message.unwrap_or_else(|| "Paystack initialization failed".to_string()),
            )),
        }
    }
}

fn verification_from(
    envelope: Envelope<Transaction>,
    reference: &str,
) -> Result<ProviderVerification, GatewayError> {
    let data = match envelope {
        Envelope {
            status: true,
            data: Some(data),
            ..
        } => data,
        Envelope { message, .. } => {
            return Err(GatewayError::Rejected(
                message.unwrap_or_else(|| "Paystack verification failed".to_string()),
            ));
        }
    };

    let amount = numeric(&data.amount)
        .and_then(|kobo| to_money(kobo, 1.0))
        .ok_or_else(|| GatewayError::InvalidResponse("missing or invalid amount".to_string()))?;

    Ok(ProviderVerification {
        reference: text(&data.reference).unwrap_or_else(|| reference.to_string()),
        status: data.status,
        amount,
        paid_at: data.paid_at,
        channel: data.channel,
        metadata: data.metadata,
    })
}

impl PaymentGateway for PaystackGateway {
    fn provider(&self) -> Provider {
        Provider::Paystack
    }

    fn verify(
        &self,
        request: VerifyRequest,
    ) -> BoxFuture<'_, Result<ProviderVerification, GatewayError>> {
        Box::pin(self.verify_reference(request))
    }

    fn initialize(
        &self,
        request: CheckoutRequest,
    ) -> BoxFuture<'_, Result<CheckoutSession, GatewayError>> {
        Box::pin(self.open_checkout(request))
    }
}
