//! Checkout creation, purchase-webhook processing, the polling confirmation
//! fallback, and manual admin activation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{now_rfc3339, rfc3339_from_unix},
    email::{is_valid_email, normalize_email},
    plan::{Plan, classify_checkout, classify_legacy},
    purchase_event::{CustomerDetails, PurchaseEvent},
    use_cases::store::RecordStore,
};

const USERS_TABLE: &str = "users";
const SUBSCRIPTION_GRACE_DAYS: i64 = 30;

// ============================================================================
// Payment gateway port
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    Payment,
    Subscription,
}

impl CheckoutMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutMode::Payment => "payment",
            CheckoutMode::Subscription => "subscription",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewCheckoutSession {
    pub price_id: String,
    pub mode: CheckoutMode,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
    pub allow_promotion_codes: bool,
    pub plan_label: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayCheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub mode: Option<String>,
    pub payment_status: Option<String>,
    pub status: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    pub subscription: Option<String>,
    pub amount_total: Option<i64>,
}

impl GatewayCheckoutSession {
    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .filter(|e| !e.is_empty())
            .or(self.customer_email.as_deref())
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid") || self.status.as_deref() == Some("complete")
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GatewaySubscription {
    pub id: String,
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayCustomer {
    pub id: String,
    pub email: Option<String>,
}

/// Outbound payment-provider operations this system performs.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: &NewCheckoutSession,
    ) -> AppResult<GatewayCheckoutSession>;

    /// Returns `None` when the provider does not know the session id.
    async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> AppResult<Option<GatewayCheckoutSession>>;

    async fn get_subscription(&self, subscription_id: &str) -> AppResult<GatewaySubscription>;

    async fn get_customer(&self, customer_id: &str) -> AppResult<GatewayCustomer>;
}

// ============================================================================
// Use cases
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreatedCheckout {
    pub url: String,
    pub session_id: String,
}

#[derive(Debug, Clone)]
pub struct WebhookOutcome {
    pub message: &'static str,
    pub email: Option<String>,
    pub plan: Option<Plan>,
}

impl WebhookOutcome {
    fn acknowledged(message: &'static str) -> Self {
        Self {
            message,
            email: None,
            plan: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmedCheckout {
    pub email: String,
    pub result: Value,
}

pub struct BillingUseCases {
    store: Arc<dyn RecordStore>,
    /// Separate store handle for the confirmation path, which may point at a
    /// licensing-specific project.
    licensing_store: Arc<dyn RecordStore>,
    gateway: Arc<dyn PaymentGateway>,
    admin_secret: Option<SecretString>,
}

impl BillingUseCases {
    pub fn new(
        store: Arc<dyn RecordStore>,
        licensing_store: Arc<dyn RecordStore>,
        gateway: Arc<dyn PaymentGateway>,
        admin_secret: Option<SecretString>,
    ) -> Self {
        Self {
            store,
            licensing_store,
            gateway,
            admin_secret,
        }
    }

    // ------------------------------------------------------------------
    // Checkout session creation
    // ------------------------------------------------------------------

    pub async fn create_checkout(
        &self,
        price_id: &str,
        plan: Option<&str>,
        email: Option<&str>,
        origin: &str,
    ) -> AppResult<CreatedCheckout> {
        let mode = if plan == Some("monthly") {
            CheckoutMode::Subscription
        } else {
            CheckoutMode::Payment
        };

        let request = NewCheckoutSession {
            price_id: price_id.to_string(),
            mode,
            success_url: format!("{origin}/success?session_id={{CHECKOUT_SESSION_ID}}"),
            cancel_url: format!("{origin}/#pricing"),
            customer_email: email.map(str::to_string),
            allow_promotion_codes: true,
            plan_label: plan.unwrap_or("unknown").to_string(),
        };

        let session = self.gateway.create_checkout_session(&request).await?;
        let url = session
            .url
            .ok_or_else(|| AppError::Upstream("Checkout session has no redirect URL".into()))?;

        Ok(CreatedCheckout {
            url,
            session_id: session.id,
        })
    }

    // ------------------------------------------------------------------
    // Purchase webhook
    // ------------------------------------------------------------------

    pub async fn process_webhook(&self, payload: &Value) -> AppResult<WebhookOutcome> {
        match PurchaseEvent::classify(payload) {
            PurchaseEvent::CheckoutCompleted(session) => {
                let email = validated_email(session.email())?;
                let plan = classify_checkout(session.amount_minor(), session.recurrence_interval());

                let record = json!({
                    "email": email,
                    "is_pro": true,
                    "plan": plan,
                    "activated_at": now_rfc3339(),
                    "subscription_expires_at": grace_period_end(),
                    "purchase_data": {
                        "source": "stripe",
                        "session_id": session.id,
                        "amount": session.amount_total,
                    },
                });
                self.store.upsert(USERS_TABLE, &record, "email").await?;

                info!(%email, %plan, "subscription activated");
                Ok(WebhookOutcome::acknowledged("Subscription activated"))
            }

            PurchaseEvent::RecurringPaymentSucceeded(invoice) => {
                let raw = match invoice.customer_email.filter(|e| !e.is_empty()) {
                    Some(email) => email,
                    // No email on the invoice; resolve it via the customer.
                    None => {
                        let customer_id = invoice.customer.ok_or_else(invalid_email)?;
                        let customer = self.gateway.get_customer(&customer_id).await?;
                        customer.email.ok_or_else(invalid_email)?
                    }
                };
                let email = validated_email(Some(raw.as_str()))?;

                let record = json!({
                    "email": email,
                    "is_pro": true,
                    "subscription_expires_at": grace_period_end(),
                });
                self.store.upsert(USERS_TABLE, &record, "email").await?;

                info!(%email, "subscription extended");
                Ok(WebhookOutcome::acknowledged("Subscription extended"))
            }

            PurchaseEvent::SubscriptionDeleted(subscription) => {
                let customer_id = subscription.customer.ok_or_else(invalid_email)?;
                let customer = self.gateway.get_customer(&customer_id).await?;
                let email = validated_email(customer.email.as_deref())?;

                let record = json!({
                    "email": email,
                    "is_pro": false,
                });
                self.store.upsert(USERS_TABLE, &record, "email").await?;

                info!(%email, "subscription cancelled");
                Ok(WebhookOutcome::acknowledged("Subscription cancelled"))
            }

            PurchaseEvent::Informational(event_type) => {
                info!(%event_type, "event received, no action needed");
                Ok(WebhookOutcome::acknowledged("Event logged"))
            }

            PurchaseEvent::Unhandled(event_type) => {
                warn!(%event_type, "unhandled webhook event type");
                Ok(WebhookOutcome::acknowledged("Event received"))
            }

            PurchaseEvent::Legacy(purchase) => {
                let raw = purchase
                    .email()
                    .ok_or_else(|| AppError::InvalidInput("Invalid webhook payload".into()))?;
                let email = normalize_email(raw);
                if !is_valid_email(&email) {
                    return Err(AppError::InvalidInput("Invalid email format".into()));
                }

                let plan = classify_legacy(purchase.product_name.as_deref(), purchase.price_minor());
                let record = json!({
                    "email": email,
                    "is_pro": true,
                    "plan": plan,
                    "activated_at": now_rfc3339(),
                    "purchase_data": {
                        "source": "gumroad",
                        "sale_id": purchase.sale_id,
                        "product_name": purchase.product_name,
                    },
                });
                self.store.upsert(USERS_TABLE, &record, "email").await?;

                info!(%email, %plan, "legacy purchase processed");
                Ok(WebhookOutcome {
                    message: "Purchase processed successfully",
                    email: Some(email),
                    plan: Some(plan),
                })
            }
        }
    }

    // ------------------------------------------------------------------
    // Confirmation fallback (polling path when webhooks are not wired up)
    // ------------------------------------------------------------------

    pub async fn confirm_checkout(&self, session_id: &str) -> AppResult<ConfirmedCheckout> {
        let session = self
            .gateway
            .get_checkout_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".into()))?;

        let raw = session.email().unwrap_or("");
        if !is_valid_email(raw) {
            return Err(AppError::InvalidInput(
                "Could not determine email from session".into(),
            ));
        }
        let email = normalize_email(raw);

        if !session.is_paid() {
            return Err(AppError::InvalidInput("Payment not completed".into()));
        }

        // Subscription sessions expire at the current billing-period end;
        // anything else (or a failed lookup) gets the fixed grace period.
        let mut expires_at = None;
        if session.mode.as_deref() == Some("subscription") {
            if let Some(subscription_id) = &session.subscription {
                match self.gateway.get_subscription(subscription_id).await {
                    Ok(subscription) => {
                        expires_at = subscription.current_period_end.and_then(rfc3339_from_unix);
                    }
                    Err(err) => {
                        warn!(error = %err, %subscription_id, "subscription lookup failed, using fallback expiry");
                    }
                }
            }
        }
        let expires_at = expires_at.unwrap_or_else(grace_period_end);

        let record = json!({
            "email": email,
            "is_pro": true,
            "activated_at": now_rfc3339(),
            "subscription_expires_at": expires_at,
            "purchase_data": {
                "source": "stripe",
                "session_id": session.id,
                "amount": session.amount_total,
            },
        });
        let outcome = self
            .licensing_store
            .upsert(USERS_TABLE, &record, "email")
            .await?;

        Ok(ConfirmedCheckout {
            email,
            result: outcome.body,
        })
    }

    // ------------------------------------------------------------------
    // Manual admin activation
    // ------------------------------------------------------------------

    pub async fn add_pro_user(
        &self,
        presented_secret: Option<&str>,
        email: Option<&str>,
        plan: Option<&str>,
    ) -> AppResult<Value> {
        // Fail closed: without a configured secret nothing is accepted.
        let Some(expected) = &self.admin_secret else {
            warn!("admin activation rejected: no admin secret configured");
            return Err(AppError::Unauthorized);
        };
        if presented_secret != Some(expected.expose_secret()) {
            warn!("admin activation rejected: secret mismatch");
            return Err(AppError::Unauthorized);
        }

        let email = normalize_email(email.unwrap_or(""));
        if email.is_empty() || !is_valid_email(&email) {
            return Err(AppError::InvalidInput("Invalid email format".into()));
        }
        let plan = Plan::parse_or_pro(plan.unwrap_or("pro"));

        info!(%email, %plan, "manually adding pro user");

        let record = json!({
            "email": email,
            "is_pro": true,
            "plan": plan,
            "activated_at": now_rfc3339(),
            "purchase_data": {
                "source": "manual",
                "added_by": "admin",
            },
        });
        let outcome = self.store.upsert(USERS_TABLE, &record, "email").await?;

        Ok(outcome.body)
    }
}

fn validated_email(raw: Option<&str>) -> AppResult<String> {
    let raw = raw.ok_or_else(invalid_email)?;
    if !is_valid_email(raw) {
        return Err(invalid_email());
    }
    Ok(normalize_email(raw))
}

fn invalid_email() -> AppError {
    AppError::InvalidInput("Invalid email".into())
}

fn grace_period_end() -> String {
    (Utc::now() + Duration::days(SUBSCRIPTION_GRACE_DAYS))
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
