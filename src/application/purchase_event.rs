//! Classification of inbound purchase-webhook payloads.
//!
//! Payloads arrive in two shapes: a provider event envelope (`type` +
//! `data.object`) or a flat legacy storefront notification. Classification is
//! a closed enum so a newly observed event type shows up as `Unhandled` in
//! review instead of silently matching a stringly branch. Payload structs use
//! all-`Option` fields; absent or malformed fields surface as missing-field
//! validation errors downstream, never as parse failures.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug)]
pub enum PurchaseEvent {
    /// Initial purchase completed; activate the subscription.
    CheckoutCompleted(CheckoutSessionPayload),
    /// Recurring payment succeeded; extend the subscription.
    RecurringPaymentSucceeded(InvoicePayload),
    /// Subscription cancelled; revoke access.
    SubscriptionDeleted(SubscriptionPayload),
    /// Known event type that needs no action, logged only.
    Informational(String),
    /// Unknown event type, acknowledged so the provider does not retry.
    Unhandled(String),
    /// Flat legacy storefront payload (no event envelope).
    Legacy(LegacyPurchase),
}

impl PurchaseEvent {
    pub fn classify(body: &Value) -> PurchaseEvent {
        let envelope = body
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .zip(body.pointer("/data/object").filter(|o| !o.is_null()));

        if let Some((event_type, object)) = envelope {
            return match event_type {
                "checkout.session.completed" => {
                    PurchaseEvent::CheckoutCompleted(from_object(object))
                }
                "invoice.payment_succeeded" => {
                    PurchaseEvent::RecurringPaymentSucceeded(from_object(object))
                }
                "customer.subscription.deleted" => {
                    PurchaseEvent::SubscriptionDeleted(from_object(object))
                }
                "payment_intent.succeeded" | "invoice.payment_failed" => {
                    PurchaseEvent::Informational(event_type.to_string())
                }
                other => PurchaseEvent::Unhandled(other.to_string()),
            };
        }

        PurchaseEvent::Legacy(serde_json::from_value(body.clone()).unwrap_or_default())
    }
}

fn from_object<T: DeserializeOwned + Default>(object: &Value) -> T {
    serde_json::from_value(object.clone()).unwrap_or_default()
}

// ============================================================================
// Envelope payloads
// ============================================================================

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CheckoutSessionPayload {
    pub id: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    pub amount_total: Option<i64>,
    pub amount: Option<i64>,
    pub recurring: Option<Recurrence>,
    pub subscription_details: Option<SubscriptionDetails>,
}

impl CheckoutSessionPayload {
    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .filter(|e| !e.is_empty())
            .or(self.customer_email.as_deref())
    }

    pub fn amount_minor(&self) -> i64 {
        self.amount_total.or(self.amount).unwrap_or(0)
    }

    pub fn recurrence_interval(&self) -> Option<&str> {
        self.recurring
            .as_ref()
            .or_else(|| {
                self.subscription_details
                    .as_ref()
                    .and_then(|d| d.interval.as_ref())
            })
            .map(Recurrence::interval)
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

/// Recurrence arrives either as `{"interval": "month"}` or as the bare
/// interval string, depending on which object carried it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Recurrence {
    Nested { interval: String },
    Raw(String),
}

impl Recurrence {
    pub fn interval(&self) -> &str {
        match self {
            Recurrence::Nested { interval } => interval,
            Recurrence::Raw(interval) => interval,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SubscriptionDetails {
    pub interval: Option<Recurrence>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct InvoicePayload {
    pub customer_email: Option<String>,
    pub customer: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct SubscriptionPayload {
    pub customer: Option<String>,
}

// ============================================================================
// Legacy storefront payload
// ============================================================================

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LegacyPurchase {
    pub email: Option<String>,
    pub purchaser: Option<Purchaser>,
    pub sale_id: Option<String>,
    pub product_name: Option<String>,
    pub price: Option<Value>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Purchaser {
    pub email: Option<String>,
}

impl LegacyPurchase {
    pub fn email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .filter(|e| !e.is_empty())
            .or_else(|| self.purchaser.as_ref().and_then(|p| p.email.as_deref()))
    }

    /// Price in minor units. The storefront sends it as either a number or a
    /// string with possible trailing junk; unparsable values count as zero.
    pub fn price_minor(&self) -> i64 {
        match &self.price {
            Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
            Some(Value::String(s)) => leading_integer(s),
            _ => 0,
        }
    }
}

/// Parses the leading integer of a string ("4900 USD" -> 4900), zero when
/// there is none.
fn leading_integer(s: &str) -> i64 {
    let trimmed = s.trim();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_checkout_completed() {
        let body = json!({
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_123",
                "customer_details": {"email": "a@b.co"},
                "amount_total": 4900
            }}
        });
        match PurchaseEvent::classify(&body) {
            PurchaseEvent::CheckoutCompleted(session) => {
                assert_eq!(session.email(), Some("a@b.co"));
                assert_eq!(session.amount_minor(), 4900);
            }
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn customer_details_email_wins_over_top_level() {
        let session: CheckoutSessionPayload = serde_json::from_value(json!({
            "customer_email": "top@b.co",
            "customer_details": {"email": "nested@b.co"}
        }))
        .unwrap();
        assert_eq!(session.email(), Some("nested@b.co"));
    }

    #[test]
    fn recurrence_accepts_both_shapes() {
        let nested: CheckoutSessionPayload =
            serde_json::from_value(json!({"recurring": {"interval": "month"}})).unwrap();
        assert_eq!(nested.recurrence_interval(), Some("month"));

        let raw: CheckoutSessionPayload =
            serde_json::from_value(json!({"subscription_details": {"interval": "year"}})).unwrap();
        assert_eq!(raw.recurrence_interval(), Some("year"));
    }

    #[test]
    fn known_no_op_events_are_informational() {
        for t in ["payment_intent.succeeded", "invoice.payment_failed"] {
            let body = json!({"type": t, "data": {"object": {}}});
            assert!(matches!(
                PurchaseEvent::classify(&body),
                PurchaseEvent::Informational(_)
            ));
        }
    }

    #[test]
    fn unknown_event_type_is_unhandled() {
        let body = json!({"type": "charge.refunded", "data": {"object": {}}});
        match PurchaseEvent::classify(&body) {
            PurchaseEvent::Unhandled(t) => assert_eq!(t, "charge.refunded"),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn envelope_without_object_falls_back_to_legacy() {
        let body = json!({"type": "checkout.session.completed", "email": "a@b.co"});
        assert!(matches!(
            PurchaseEvent::classify(&body),
            PurchaseEvent::Legacy(_)
        ));
    }

    #[test]
    fn flat_payload_is_legacy_with_purchaser_fallback() {
        let body = json!({"purchaser": {"email": "buyer@b.co"}, "sale_id": "s1"});
        match PurchaseEvent::classify(&body) {
            PurchaseEvent::Legacy(legacy) => assert_eq!(legacy.email(), Some("buyer@b.co")),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn legacy_price_parses_numbers_and_strings() {
        let with = |price: Value| LegacyPurchase {
            price: Some(price),
            ..Default::default()
        };
        assert_eq!(with(json!(4900)).price_minor(), 4900);
        assert_eq!(with(json!("4900")).price_minor(), 4900);
        assert_eq!(with(json!("4900 USD")).price_minor(), 4900);
        assert_eq!(with(json!("free")).price_minor(), 0);
        assert_eq!(LegacyPurchase::default().price_minor(), 0);
    }
}
