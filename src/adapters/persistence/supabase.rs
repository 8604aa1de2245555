//! PostgREST-backed implementation of the record store.
//!
//! Writes go out as merge-duplicates upserts. The merge directive does not
//! cover every field combination for every caller, so a 409 from the store
//! triggers an explicit field patch scoped by the conflict key, with the key
//! itself removed from the patch body.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, error};

use crate::{
    app_error::{AppError, AppResult},
    infra::http_client,
    use_cases::store::{RecordStore, UpsertOutcome, WriteDisposition},
};

pub struct SupabaseStore {
    client: Client,
    base_url: String,
    service_key: SecretString,
}

impl SupabaseStore {
    pub fn new(base_url: &str, service_key: SecretString) -> Self {
        Self {
            client: http_client::build_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.service_key.expose_secret();
        request.header("apikey", key).bearer_auth(key)
    }

    async fn patch_existing(
        &self,
        table: &str,
        record: &Value,
        conflict_key: &str,
    ) -> AppResult<UpsertOutcome> {
        let key_value = record
            .get(conflict_key)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::Internal(format!("record is missing conflict key '{conflict_key}'"))
            })?;

        let mut patch = record
            .as_object()
            .cloned()
            .ok_or_else(|| AppError::Internal("record must be a JSON object".into()))?;
        patch.remove(conflict_key);

        debug!(table, conflict_key, "store reported conflict, retrying as patch");

        let response = self
            .authed(self.client.patch(self.table_url(table)))
            .query(&[(conflict_key, format!("eq.{key_value}"))])
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await
            .map_err(store_unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(extract_store_error(status, response).await);
        }

        Ok(UpsertOutcome {
            disposition: WriteDisposition::Merged,
            body: decode_body(response).await,
        })
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    async fn upsert(
        &self,
        table: &str,
        record: &Value,
        conflict_key: &str,
    ) -> AppResult<UpsertOutcome> {
        let response = self
            .authed(self.client.post(self.table_url(table)))
            .query(&[("on_conflict", conflict_key)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(record)
            .send()
            .await
            .map_err(store_unreachable)?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            return self.patch_existing(table, record, conflict_key).await;
        }
        if !status.is_success() {
            return Err(extract_store_error(status, response).await);
        }

        let disposition = if status == StatusCode::CREATED {
            WriteDisposition::Created
        } else {
            WriteDisposition::Merged
        };

        Ok(UpsertOutcome {
            disposition,
            body: decode_body(response).await,
        })
    }
}

async fn decode_body(response: Response) -> Value {
    response.json().await.unwrap_or(Value::Null)
}

/// Best-effort extraction of the store's `message`/`error` body field,
/// falling back to the HTTP status text.
async fn extract_store_error(status: StatusCode, response: Response) -> AppError {
    let payload: Option<Value> = response.json().await.ok();
    let message = payload
        .as_ref()
        .and_then(|p| {
            p.get("message")
                .and_then(Value::as_str)
                .or_else(|| p.get("error").and_then(Value::as_str))
        })
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("store request failed")
                .to_string()
        });

    error!(status = %status, %message, "store error");
    AppError::Upstream(message)
}

fn store_unreachable(err: reqwest::Error) -> AppError {
    AppError::Upstream(format!("Store request failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Query, RawQuery, State},
        http::StatusCode,
        routing::{patch, post},
    };
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeStore {
        post_count: Mutex<usize>,
        conflict_on_post: bool,
        patches: Mutex<Vec<(String, Value)>>,
    }

    async fn fake_insert(
        State(store): State<Arc<FakeStore>>,
        Json(record): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        *store.post_count.lock().unwrap() += 1;
        if store.conflict_on_post {
            return (
                StatusCode::CONFLICT,
                Json(json!({"message": "duplicate key value"})),
            );
        }
        (StatusCode::CREATED, Json(json!([record])))
    }

    async fn fake_patch(
        State(store): State<Arc<FakeStore>>,
        RawQuery(query): RawQuery,
        Json(patch_body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        store
            .patches
            .lock()
            .unwrap()
            .push((query.unwrap_or_default(), patch_body));
        (StatusCode::OK, Json(json!([{"patched": true}])))
    }

    async fn spawn_fake_store(store: Arc<FakeStore>) -> String {
        let app = Router::new()
            .route("/rest/v1/{table}", post(fake_insert).patch(fake_patch))
            .with_state(store);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn store_client(base_url: &str) -> SupabaseStore {
        SupabaseStore::new(base_url, SecretString::from("service-key"))
    }

    #[tokio::test]
    async fn created_row_reports_created_disposition() {
        let fake = Arc::new(FakeStore::default());
        let base_url = spawn_fake_store(fake.clone()).await;

        let outcome = store_client(&base_url)
            .upsert("users", &json!({"email": "a@b.co", "is_pro": true}), "email")
            .await
            .unwrap();

        assert_eq!(outcome.disposition, WriteDisposition::Created);
        assert_eq!(*fake.post_count.lock().unwrap(), 1);
        assert!(fake.patches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn conflict_falls_back_to_patch_excluding_key() {
        let fake = Arc::new(FakeStore {
            conflict_on_post: true,
            ..Default::default()
        });
        let base_url = spawn_fake_store(fake.clone()).await;

        let record = json!({"email": "a@b.co", "is_pro": true, "plan": "lifetime"});
        let outcome = store_client(&base_url)
            .upsert("users", &record, "email")
            .await
            .unwrap();

        assert_eq!(outcome.disposition, WriteDisposition::Merged);

        let patches = fake.patches.lock().unwrap();
        assert_eq!(patches.len(), 1);
        let (query, body) = &patches[0];
        assert!(query.contains("email=eq.a%40b.co"), "query was {query}");
        assert!(body.get("email").is_none(), "conflict key must be excluded");
        assert_eq!(body["is_pro"], json!(true));
        assert_eq!(body["plan"], json!("lifetime"));
    }

    #[tokio::test]
    async fn store_error_message_is_surfaced() {
        async fn failing_insert(
            Query(_): Query<HashMap<String, String>>,
        ) -> (StatusCode, Json<Value>) {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"message": "column does not exist"})),
            )
        }
        let app = Router::new().route("/rest/v1/{table}", post(failing_insert));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let err = store_client(&format!("http://{addr}"))
            .upsert("users", &json!({"email": "a@b.co"}), "email")
            .await
            .unwrap_err();

        match err {
            AppError::Upstream(message) => assert_eq!(message, "column does not exist"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
