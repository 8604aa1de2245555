//! Subscription tier labels and the two purchase classifiers.
//!
//! Checkout sessions carry an amount and an optional recurrence interval;
//! legacy storefront payloads carry a product name and a price string. Both
//! shapes still arrive in production, so both classifiers are kept.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Price floor (in minor units) above which a one-time purchase is treated
/// as a lifetime license.
pub const LIFETIME_PRICE_FLOOR: i64 = 4900;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Pro,
    Monthly,
    Yearly,
    Lifetime,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Pro => "pro",
            Plan::Monthly => "monthly",
            Plan::Yearly => "yearly",
            Plan::Lifetime => "lifetime",
        }
    }

    /// Parses a plan label, falling back to `Pro` for unknown strings.
    pub fn parse_or_pro(label: &str) -> Plan {
        match label {
            "monthly" => Plan::Monthly,
            "yearly" => Plan::Yearly,
            "lifetime" => Plan::Lifetime,
            _ => Plan::Pro,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a checkout event by recurrence interval and amount.
/// First match wins: month, year, lifetime price floor, then `pro`.
pub fn classify_checkout(amount_minor: i64, recurrence_interval: Option<&str>) -> Plan {
    match recurrence_interval {
        Some("month") => Plan::Monthly,
        Some("year") => Plan::Yearly,
        _ if amount_minor >= LIFETIME_PRICE_FLOOR => Plan::Lifetime,
        _ => Plan::Pro,
    }
}

/// Classifies a legacy storefront payload by product name keywords, with
/// price-based fallbacks at the same lifetime floor.
pub fn classify_legacy(product_name: Option<&str>, price_minor: i64) -> Plan {
    let name = product_name.unwrap_or("").to_lowercase();

    if name.contains("lifetime") || price_minor >= LIFETIME_PRICE_FLOOR {
        Plan::Lifetime
    } else if name.contains("monthly") || price_minor < 1000 {
        Plan::Monthly
    } else {
        Plan::Pro
    }
}
