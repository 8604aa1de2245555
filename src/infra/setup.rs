use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{http::app_state::AppState, persistence::supabase::SupabaseStore},
    infra::{config::AppConfig, stripe_client::StripeClient, telemetry::TelemetryClient},
    use_cases::{billing::BillingUseCases, outreach::OutreachUseCases, store::RecordStore},
};

pub fn init_app_state() -> anyhow::Result<AppState> {
    let config = Arc::new(AppConfig::from_env());

    let store: Arc<dyn RecordStore> = Arc::new(SupabaseStore::new(
        config.supabase_url.as_str(),
        config.supabase_service_role_key.clone(),
    ));
    let licensing_store: Arc<dyn RecordStore> = Arc::new(SupabaseStore::new(
        config.licensing_url.as_str(),
        config.licensing_service_role_key.clone(),
    ));
    let gateway = Arc::new(StripeClient::new(config.stripe_secret_key.clone()));

    let telemetry = config
        .telemetry_backend_url
        .as_ref()
        .map(|url| Arc::new(TelemetryClient::new(url.as_str(), config.telemetry_read_token.clone())));

    let billing_use_cases = Arc::new(BillingUseCases::new(
        store.clone(),
        licensing_store,
        gateway,
        config.admin_secret.clone(),
    ));
    let outreach_use_cases = Arc::new(OutreachUseCases::new(
        store,
        config.subscriptions_table.clone(),
        config.support_table.clone(),
    ));

    Ok(AppState {
        config,
        billing_use_cases,
        outreach_use_cases,
        telemetry,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lexiflow_site=debug,tower_http=debug".into());

    let console_layer = fmt::layer().with_target(false).with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init()
        .ok();
}
