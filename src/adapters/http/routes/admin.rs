//! Manual pro-user activation, guarded by a shared admin secret.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::Deserialize;
use serde_json::json;

use crate::{
    adapters::http::{app_state::AppState, extract::LenientJson},
    app_error::AppResult,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AddProUserPayload {
    secret: Option<String>,
    email: Option<String>,
    plan: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/add-pro-user", post(add_pro_user))
}

async fn add_pro_user(
    State(app_state): State<AppState>,
    LenientJson(payload): LenientJson<AddProUserPayload>,
) -> AppResult<impl IntoResponse> {
    let user = app_state
        .billing_use_cases
        .add_pro_user(
            payload.secret.as_deref(),
            payload.email.as_deref(),
            payload.plan.as_deref(),
        )
        .await?;

    Ok(Json(json!({
        "ok": true,
        "message": "Pro user added successfully",
        "user": user,
    })))
}
