pub mod billing;
pub mod outreach;
pub mod store;

use chrono::{DateTime, SecondsFormat, Utc};

/// RFC 3339 with millisecond precision and `Z`, the format the store's
/// existing rows use.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn rfc3339_from_unix(secs: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}
