use async_trait::async_trait;
use serde_json::Value;

use crate::app_error::AppResult;

/// Whether the store created a fresh row or merged into an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDisposition {
    Created,
    Merged,
}

#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub disposition: WriteDisposition,
    /// Decoded representation body returned by the store (null when the
    /// store returned no content).
    pub body: Value,
}

/// Create-or-merge writes against the hosted record store.
///
/// Implementations must fall back to a field patch scoped by `conflict_key`
/// (excluding the key itself from the patch body) when the store reports a
/// conflict the merge directive did not cover.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn upsert(
        &self,
        table: &str,
        record: &Value,
        conflict_key: &str,
    ) -> AppResult<UpsertOutcome>;
}
