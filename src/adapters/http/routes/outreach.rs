//! Waitlist and support intake endpoints.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::post};
use serde::Deserialize;
use serde_json::json;

use crate::{
    adapters::http::{app_state::AppState, extract::LenientJson},
    app_error::AppResult,
    use_cases::outreach::SupportSubmission,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubscribePayload {
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SupportPayload {
    email: Option<String>,
    message: Option<String>,
    #[serde(rename = "pageUrl")]
    page_url: Option<String>,
    #[serde(rename = "userAgent")]
    user_agent: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/support", post(support))
}

async fn subscribe(
    State(app_state): State<AppState>,
    LenientJson(payload): LenientJson<SubscribePayload>,
) -> AppResult<impl IntoResponse> {
    let message = app_state
        .outreach_use_cases
        .subscribe(payload.email.as_deref().unwrap_or(""))
        .await?;

    Ok(Json(json!({ "ok": true, "message": message })))
}

async fn support(
    State(app_state): State<AppState>,
    LenientJson(payload): LenientJson<SupportPayload>,
) -> AppResult<impl IntoResponse> {
    app_state
        .outreach_use_cases
        .submit_support(SupportSubmission {
            email: payload.email.unwrap_or_default(),
            message: payload.message.unwrap_or_default(),
            page_url: payload.page_url,
            user_agent: payload.user_agent,
        })
        .await?;

    Ok(Json(json!({ "ok": true, "message": "Support request sent" })))
}
