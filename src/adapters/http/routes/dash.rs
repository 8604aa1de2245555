//! Private metrics dashboard and its server-side telemetry proxy.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use secrecy::ExposeSecret;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
};

const DASHBOARD_HTML: &str = include_str!("../../../../assets/dash.html");

const NO_CACHE: &str = "no-store, no-cache, must-revalidate";
const BASIC_CHALLENGE: &str = r#"Basic realm="Lexiflow Dashboard""#;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dash", get(dash))
        .route("/metrics", get(metrics))
}

async fn dash(State(app_state): State<AppState>, headers: HeaderMap) -> Response {
    let authorized = basic_credentials(&headers).is_some_and(|(user, pass)| {
        user == app_state.config.dashboard_user
            && pass == app_state.config.dashboard_pass.expose_secret()
    });

    if !authorized {
        let message = if headers.contains_key(header::AUTHORIZATION) {
            "Invalid credentials"
        } else {
            "Authentication required"
        };
        return (
            StatusCode::UNAUTHORIZED,
            [
                (header::WWW_AUTHENTICATE, BASIC_CHALLENGE),
                (header::CACHE_CONTROL, NO_CACHE),
            ],
            message,
        )
            .into_response();
    }

    (
        [
            (
                header::CACHE_CONTROL,
                "no-store, no-cache, must-revalidate, proxy-revalidate",
            ),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
            (
                HeaderName::from_static("x-robots-tag"),
                "noindex, nofollow, noarchive",
            ),
        ],
        Html(DASHBOARD_HTML),
    )
        .into_response()
}

async fn metrics(State(app_state): State<AppState>) -> AppResult<impl IntoResponse> {
    let telemetry = app_state
        .telemetry
        .as_ref()
        .ok_or_else(|| AppError::Config("TELEMETRY_BACKEND_URL not configured".into()))?;

    let data = telemetry.fetch_overall().await?;

    // Always fresh stats; the dashboard polls this endpoint.
    Ok((
        [
            (header::CACHE_CONTROL, NO_CACHE),
            (header::PRAGMA, "no-cache"),
        ],
        Json(data),
    ))
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    use base64::Engine;

    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}
