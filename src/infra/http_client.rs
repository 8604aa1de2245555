//! Outbound HTTP client factory with consistent timeouts.
//!
//! Every upstream client (store, payment provider, telemetry) goes through
//! `build_client()` so slow third parties cannot pin a request handler past
//! the transport deadline.

use reqwest::Client;
use std::time::Duration;

/// Connect timeout (TCP handshake + TLS).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request/response timeout, sized for external API calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Panics if the client cannot be built (TLS misconfiguration); acceptable
/// in singleton constructors since the app cannot run without HTTP clients.
pub fn build_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build HTTP client")
}
