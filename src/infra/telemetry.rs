//! Read-side client for the telemetry backend, proxied to keep the backend
//! URL and token off the client.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::error;

use crate::{
    app_error::{AppError, AppResult},
    infra::http_client,
};

#[derive(Clone)]
pub struct TelemetryClient {
    client: Client,
    base_url: String,
    read_token: Option<SecretString>,
}

impl TelemetryClient {
    pub fn new(base_url: &str, read_token: Option<SecretString>) -> Self {
        Self {
            client: http_client::build_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            read_token,
        }
    }

    /// Fetches the overall analytics snapshot. Failures are logged with the
    /// backend's response but surfaced generically.
    pub async fn fetch_overall(&self) -> AppResult<Value> {
        let url = format!("{}/analytics/overall", self.base_url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.read_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to fetch metrics: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "telemetry backend error");
            return Err(AppError::Upstream(format!("Backend returned {}", status.as_u16())));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid metrics response: {e}")))
    }
}
