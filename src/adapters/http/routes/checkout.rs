//! Checkout session creation and the polling confirmation fallback.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    adapters::http::{app_state::AppState, extract::LenientJson},
    app_error::{AppError, AppResult},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateCheckoutPayload {
    #[serde(rename = "priceId")]
    price_id: Option<String>,
    plan: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfirmQuery {
    session_id: Option<String>,
    #[serde(rename = "sessionId")]
    session_id_alt: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-checkout", post(create_checkout))
        .route("/confirm-checkout", get(confirm_checkout))
}

async fn create_checkout(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    LenientJson(payload): LenientJson<CreateCheckoutPayload>,
) -> AppResult<impl IntoResponse> {
    let price_id = payload
        .price_id
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Price ID required".into()))?;

    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&app_state.config.site_origin);

    let created = app_state
        .billing_use_cases
        .create_checkout(
            price_id,
            payload.plan.as_deref(),
            payload.email.as_deref(),
            origin,
        )
        .await?;

    Ok(Json(json!({
        "ok": true,
        "url": created.url,
        "sessionId": created.session_id,
    })))
}

async fn confirm_checkout(
    State(app_state): State<AppState>,
    Query(query): Query<ConfirmQuery>,
) -> AppResult<impl IntoResponse> {
    let session_id = query
        .session_id
        .or(query.session_id_alt)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InvalidInput("Missing session_id".into()))?;

    let confirmed = app_state
        .billing_use_cases
        .confirm_checkout(&session_id)
        .await?;

    Ok(Json(json!({
        "ok": true,
        "email": confirmed.email,
        "result": confirmed.result,
    })))
}
