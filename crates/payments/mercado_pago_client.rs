use std::collections::HashMap;

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use tracing::error;

use crate::domain::value_objects::enums::payment_methods::PaymentMethod;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_API_BASE_URL: &str = "https://api.mercadopago.com";

/// Minimal Mercado Pago client built on reqwest.
pub struct MercadoPagoClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    webhook_secret: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub item_id: String,
    pub title: String,
    pub unit_price_minor: i32,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub external_reference: String,
    pub callback_url: String,
    pub notification_url: Option<String>,
    pub payer_email: Option<String>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutPreference {
    pub id: String,
    pub init_point: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPayment {
    pub id: String,
    pub status: String,
    pub external_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: serde_json::Value,
    status: String,
    external_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct PreferenceItem<'a> {
    id: &'a str,
    title: &'a str,
    quantity: u32,
    currency_id: &'a str,
    unit_price: f64,
}

impl CheckoutRequest {
    fn to_body(&self) -> serde_json::Value {
        let excluded: Vec<serde_json::Value> = self
            .payment_method
            .excluded_payment_types()
            .into_iter()
            .map(|id| json!({ "id": id }))
            .collect();

        let mut body = json!({
            "items": [PreferenceItem {
                id: &self.item_id,
                title: &self.title,
                quantity: 1,
                currency_id: &self.currency,
                unit_price: f64::from(self.unit_price_minor) / 100.0,
            }],
            "payment_methods": {
                "excluded_payment_types": excluded,
                "installments": 1,
            },
            "back_urls": {
                "success": self.callback_url,
                "failure": self.callback_url,
                "pending": self.callback_url,
            },
            "auto_return": "approved",
            "external_reference": self.external_reference,
            "metadata": self.metadata,
        });

        if let Some(url) = &self.notification_url {
            body["notification_url"] = json!(url);
        }
        if let Some(email) = &self.payer_email {
            body["payer"] = json!({ "email": email });
        }
        body
    }
}

impl MercadoPagoClient {
    pub fn new(access_token: String, webhook_secret: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_API_BASE_URL.to_string(), access_token, webhook_secret)
    }

    pub fn with_base_url(
        base_url: String,
        access_token: String,
        webhook_secret: Option<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            webhook_secret: webhook_secret.filter(|secret| !secret.is_empty()),
        }
    }

    pub fn has_webhook_secret(&self) -> bool {
        self.webhook_secret.is_some()
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (gateway_error, gateway_message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => (envelope.error, envelope.message),
            Err(_) => (None, None),
        };

        error!(
            status = %status,
            gateway_request_id = ?request_id,
            gateway_error = ?gateway_error,
            gateway_message = ?gateway_message,
            response_body = %body,
            context = %context,
            "mercado pago api request failed"
        );

        anyhow::bail!(
            "Mercado Pago API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// Creates a checkout preference restricted to the requested instrument.
    pub async fn create_preference(&self, request: &CheckoutRequest) -> Result<CheckoutPreference> {
        let resp = self
            .http
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(&self.access_token)
            .header(CONTENT_TYPE, "application/json")
            .header("X-Idempotency-Key", &request.external_reference)
            .json(&request.to_body())
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create preference").await?;

        let preference: CheckoutPreference = resp
            .json()
            .await
            .context("failed to parse checkout preference")?;
        Ok(preference)
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        let resp = self
            .http
            .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "get payment").await?;

        let payment: PaymentResponse = resp.json().await.context("failed to parse payment")?;
        let id = match payment.id {
            serde_json::Value::String(id) => id,
            other => other.to_string(),
        };

        Ok(GatewayPayment {
            id,
            status: payment.status,
            external_reference: payment.external_reference,
        })
    }

    /// Verifies `x-signature: ts=<unix>,v1=<hex>` against the manifest
    /// `id:<data.id>;request-id:<x-request-id>;ts:<ts>;`. Passes when no
    /// secret is configured.
    pub fn verify_webhook_signature(
        &self,
        signature_header: &str,
        request_id: Option<&str>,
        data_id: Option<&str>,
    ) -> Result<()> {
        let Some(secret) = &self.webhook_secret else {
            return Ok(());
        };

        let mut timestamp: Option<&str> = None;
        let mut signature: Option<&str> = None;

        for part in signature_header.split(',') {
            let part = part.trim();
            if let Some(rest) = part.strip_prefix("ts=") {
                timestamp = Some(rest);
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signature = Some(rest);
            }
        }

        let timestamp = timestamp.ok_or_else(|| anyhow::anyhow!("missing ts in x-signature"))?;
        let signature = signature.ok_or_else(|| anyhow::anyhow!("missing v1 in x-signature"))?;

        let manifest = webhook_manifest(data_id, request_id, timestamp);
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
        mac.update(manifest.as_bytes());
        let provided = hex::decode(signature).context("x-signature v1 is not hex")?;

        mac.verify_slice(&provided)
            .map_err(|_| anyhow::anyhow!("invalid webhook signature"))
    }
}

fn webhook_manifest(data_id: Option<&str>, request_id: Option<&str>, timestamp: &str) -> String {
    let mut manifest = String::new();
    if let Some(id) = data_id.filter(|id| !id.is_empty()) {
        let id = if id.chars().all(|c| c.is_ascii_alphanumeric()) {
            id.to_ascii_lowercase()
        } else {
            id.to_string()
        };
        manifest.push_str(&format!("id:{id};"));
    }
    if let Some(request_id) = request_id.filter(|id| !id.is_empty()) {
        manifest.push_str(&format!("request-id:{request_id};"));
    }
    manifest.push_str(&format!("ts:{timestamp};"));
    manifest
}
