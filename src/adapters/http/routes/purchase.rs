//! Purchase webhook endpoint.

use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use secrecy::ExposeSecret;
use serde_json::json;

use crate::{
    adapters::http::{app_state::AppState, extract::lenient_parse},
    app_error::{AppError, AppResult},
    infra::stripe_client::StripeClient,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/purchase-webhook", post(purchase_webhook))
}

async fn purchase_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> AppResult<impl IntoResponse> {
    // Signature verification is opt-in: enforced only when a webhook secret
    // is configured.
    if let Some(secret) = &app_state.config.stripe_webhook_secret {
        let signature = headers
            .get("stripe-signature")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::InvalidInput("Missing Stripe signature".into()))?;
        StripeClient::verify_webhook_signature(&body, signature, secret.expose_secret())?;
    }

    let payload = lenient_parse(body.as_bytes());
    let outcome = app_state.billing_use_cases.process_webhook(&payload).await?;

    let mut response = json!({ "ok": true, "message": outcome.message });
    if let Some(email) = outcome.email {
        response["email"] = json!(email);
    }
    if let Some(plan) = outcome.plan {
        response["plan"] = json!(plan);
    }
    Ok(Json(response))
}
