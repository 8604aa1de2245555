//! Thin Stripe REST client implementing the `PaymentGateway` port, plus
//! webhook signature verification.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::{
    app_error::{AppError, AppResult},
    infra::http_client,
    use_cases::billing::{
        GatewayCheckoutSession, GatewayCustomer, GatewaySubscription, NewCheckoutSession,
        PaymentGateway,
    },
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Signature timestamps older than this are rejected.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
}

impl StripeClient {
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            client: http_client::build_client(),
            secret_key,
        }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key.expose_secret()));
        format!("Basic {encoded}")
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to read Stripe response: {e}")))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Stripe API error");

            if let Ok(error) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(AppError::Upstream(
                    error.error.message.unwrap_or(error.error.error_type),
                ));
            }
            return Err(AppError::Upstream(format!("Stripe API error: {status}")));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse Stripe response");
            AppError::Upstream(format!("Failed to parse Stripe response: {e}"))
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self
            .client
            .get(format!("{STRIPE_API_BASE}/{path}"))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe request failed: {e}")))?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Webhook signature verification
    // ========================================================================

    /// Verifies a `stripe-signature` header (`t=...,v1=...`) against the raw
    /// payload: HMAC-SHA256 over `"{t}.{payload}"`, constant-time compare,
    /// bounded timestamp age.
    pub fn verify_webhook_signature(
        payload: &str,
        signature_header: &str,
        webhook_secret: &str,
    ) -> AppResult<()> {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp = Some(value),
                "v1" => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| AppError::InvalidInput("Missing timestamp in signature".into()))?;
        if signatures.is_empty() {
            return Err(AppError::InvalidInput("Missing signature".into()));
        }

        let signed_payload = format!("{timestamp}.{payload}");
        let mut mac = Hmac::<Sha256>::new_from_slice(webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal("HMAC error".into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        for signature in signatures {
            if constant_time_compare(signature, &expected) {
                let ts: i64 = timestamp
                    .parse()
                    .map_err(|_| AppError::InvalidInput("Invalid timestamp".into()))?;
                let now = chrono::Utc::now().timestamp();
                if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
                    return Err(AppError::InvalidInput("Timestamp too old".into()));
                }
                return Ok(());
            }
        }

        Err(AppError::InvalidInput("Invalid signature".into()))
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: &NewCheckoutSession,
    ) -> AppResult<GatewayCheckoutSession> {
        let mut params: Vec<(String, String)> = vec![
            ("line_items[0][price]".into(), request.price_id.clone()),
            ("line_items[0][quantity]".into(), "1".into()),
            ("mode".into(), request.mode.as_str().into()),
            ("success_url".into(), request.success_url.clone()),
            ("cancel_url".into(), request.cancel_url.clone()),
            ("billing_address_collection".into(), "auto".into()),
            ("metadata[plan]".into(), request.plan_label.clone()),
        ];
        if request.allow_promotion_codes {
            params.push(("allow_promotion_codes".into(), "true".into()));
        }
        if let Some(email) = &request.customer_email {
            params.push(("customer_email".into(), email.clone()));
        }

        let response = self
            .client
            .post(format!("{STRIPE_API_BASE}/checkout/sessions"))
            .header("Authorization", self.auth_header())
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe request failed: {e}")))?;

        self.handle_response(response).await
    }

    async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> AppResult<Option<GatewayCheckoutSession>> {
        let response = self
            .client
            .get(format!("{STRIPE_API_BASE}/checkout/sessions/{session_id}"))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe request failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.handle_response(response).await.map(Some)
    }

    async fn get_subscription(&self, subscription_id: &str) -> AppResult<GatewaySubscription> {
        self.get(&format!("subscriptions/{subscription_id}")).await
    }

    async fn get_customer(&self, customer_id: &str) -> AppResult<GatewayCustomer> {
        self.get(&format!("customers/{customer_id}")).await
    }
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(rename = "type")]
    error_type: String,
    message: Option<String>,
}
