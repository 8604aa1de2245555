use std::sync::Arc;

use crate::{
    infra::{config::AppConfig, telemetry::TelemetryClient},
    use_cases::{billing::BillingUseCases, outreach::OutreachUseCases},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub billing_use_cases: Arc<BillingUseCases>,
    pub outreach_use_cases: Arc<OutreachUseCases>,
    /// Absent when no telemetry backend is configured; the metrics proxy
    /// then reports a configuration error.
    pub telemetry: Option<Arc<TelemetryClient>>,
}
