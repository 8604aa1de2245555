//! In-memory doubles and a state builder for HTTP-level tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{Value, json};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    infra::{config::AppConfig, telemetry::TelemetryClient},
    use_cases::{
        billing::{
            BillingUseCases, GatewayCheckoutSession, GatewayCustomer, GatewaySubscription,
            NewCheckoutSession, PaymentGateway,
        },
        outreach::OutreachUseCases,
        store::{RecordStore, UpsertOutcome, WriteDisposition},
    },
};

// ============================================================================
// InMemoryRecordStore
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub table: String,
    pub record: Value,
    pub conflict_key: String,
}

/// Records every upsert and returns scripted dispositions (defaulting to
/// `Created` once the script runs out).
#[derive(Default)]
pub struct InMemoryRecordStore {
    writes: Mutex<Vec<RecordedWrite>>,
    dispositions: Mutex<Vec<WriteDisposition>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dispositions(dispositions: Vec<WriteDisposition>) -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            dispositions: Mutex::new(dispositions),
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn last_write(&self) -> Option<RecordedWrite> {
        self.writes.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn upsert(
        &self,
        table: &str,
        record: &Value,
        conflict_key: &str,
    ) -> AppResult<UpsertOutcome> {
        self.writes.lock().unwrap().push(RecordedWrite {
            table: table.to_string(),
            record: record.clone(),
            conflict_key: conflict_key.to_string(),
        });

        let mut dispositions = self.dispositions.lock().unwrap();
        let disposition = if dispositions.is_empty() {
            WriteDisposition::Created
        } else {
            dispositions.remove(0)
        };

        Ok(UpsertOutcome {
            disposition,
            body: json!([record]),
        })
    }
}

// ============================================================================
// StubPaymentGateway
// ============================================================================

/// Preset gateway responses keyed by id; unknown ids behave like upstream
/// failures (or a missing session for checkout lookup).
#[derive(Default)]
pub struct StubPaymentGateway {
    sessions: Mutex<HashMap<String, GatewayCheckoutSession>>,
    subscriptions: Mutex<HashMap<String, GatewaySubscription>>,
    customers: Mutex<HashMap<String, GatewayCustomer>>,
    create_result: Mutex<Option<GatewayCheckoutSession>>,
    created_requests: Mutex<Vec<NewCheckoutSession>>,
}

impl StubPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, session: GatewayCheckoutSession) -> Self {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
        self
    }

    pub fn with_subscription(self, subscription: GatewaySubscription) -> Self {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id.clone(), subscription);
        self
    }

    pub fn with_customer(self, customer: GatewayCustomer) -> Self {
        self.customers
            .lock()
            .unwrap()
            .insert(customer.id.clone(), customer);
        self
    }

    pub fn with_create_result(self, session: GatewayCheckoutSession) -> Self {
        *self.create_result.lock().unwrap() = Some(session);
        self
    }

    pub fn created_requests(&self) -> Vec<NewCheckoutSession> {
        self.created_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for StubPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: &NewCheckoutSession,
    ) -> AppResult<GatewayCheckoutSession> {
        self.created_requests.lock().unwrap().push(request.clone());
        self.create_result
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Upstream("no scripted checkout session".into()))
    }

    async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> AppResult<Option<GatewayCheckoutSession>> {
        Ok(self.sessions.lock().unwrap().get(session_id).cloned())
    }

    async fn get_subscription(&self, subscription_id: &str) -> AppResult<GatewaySubscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| AppError::Upstream("no scripted subscription".into()))
    }

    async fn get_customer(&self, customer_id: &str) -> AppResult<GatewayCustomer> {
        self.customers
            .lock()
            .unwrap()
            .get(customer_id)
            .cloned()
            .ok_or_else(|| AppError::Upstream("no scripted customer".into()))
    }
}

// ============================================================================
// Config + state builder
// ============================================================================

pub fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        site_origin: "https://lexiflow.app".to_string(),
        supabase_url: "http://127.0.0.1:54321".parse().unwrap(),
        supabase_service_role_key: SecretString::from("test-service-key"),
        licensing_url: "http://127.0.0.1:54321".parse().unwrap(),
        licensing_service_role_key: SecretString::from("test-service-key"),
        stripe_secret_key: SecretString::from("sk_test_xxx"),
        stripe_webhook_secret: None,
        admin_secret: Some(SecretString::from("test-admin-secret")),
        dashboard_user: "admin".to_string(),
        dashboard_pass: SecretString::from("hunter2"),
        subscriptions_table: "email_subscriptions".to_string(),
        support_table: "waitlist_emails".to_string(),
        telemetry_backend_url: None,
        telemetry_read_token: None,
    }
}

pub struct TestAppStateBuilder {
    config: AppConfig,
    store: Arc<InMemoryRecordStore>,
    gateway: Arc<StubPaymentGateway>,
    telemetry: Option<Arc<TelemetryClient>>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            config: test_config(),
            store: Arc::new(InMemoryRecordStore::new()),
            gateway: Arc::new(StubPaymentGateway::new()),
            telemetry: None,
        }
    }

    pub fn with_config(mut self, configure: impl FnOnce(&mut AppConfig)) -> Self {
        configure(&mut self.config);
        self
    }

    pub fn with_store(mut self, store: Arc<InMemoryRecordStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_gateway(mut self, gateway: Arc<StubPaymentGateway>) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<TelemetryClient>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn build(self) -> AppState {
        // Both store handles point at the same double; the licensing split
        // only matters against real config.
        let store: Arc<dyn RecordStore> = self.store.clone();
        let licensing_store: Arc<dyn RecordStore> = self.store;

        let billing_use_cases = Arc::new(BillingUseCases::new(
            store.clone(),
            licensing_store,
            self.gateway,
            self.config.admin_secret.clone(),
        ));
        let outreach_use_cases = Arc::new(OutreachUseCases::new(
            store,
            self.config.subscriptions_table.clone(),
            self.config.support_table.clone(),
        ));

        AppState {
            config: Arc::new(self.config),
            billing_use_cases,
            outreach_use_cases,
            telemetry: self.telemetry,
        }
    }
}
