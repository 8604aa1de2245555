//! Lenient request-body extraction.
//!
//! Bodies arrive as JSON objects, JSON strings of uneven quality, or nothing
//! at all. Unparsable or non-object input degrades to an empty mapping so
//! callers see precise missing-field errors instead of a parse failure.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::app_error::AppError;

pub struct LenientJson<T>(pub T);

impl<T, S> FromRequest<S> for LenientJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| AppError::InvalidInput("Unable to read request body".into()))?;

        let payload = serde_json::from_value(lenient_parse(&bytes))
            .map_err(|e| AppError::InvalidInput(format!("Invalid request body: {e}")))?;

        Ok(Self(payload))
    }
}

/// Parses bytes as a JSON object, degrading to an empty object on anything
/// else.
pub fn lenient_parse(bytes: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value @ Value::Object(_)) => value,
        _ => Value::Object(Default::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_objects() {
        assert_eq!(
            lenient_parse(br#"{"email": "a@b.co"}"#),
            json!({"email": "a@b.co"})
        );
    }

    #[test]
    fn degrades_garbage_to_empty_object() {
        assert_eq!(lenient_parse(b"not json"), json!({}));
        assert_eq!(lenient_parse(b""), json!({}));
        assert_eq!(lenient_parse(b"[1, 2]"), json!({}));
        assert_eq!(lenient_parse(br#""just a string""#), json!({}));
    }
}
