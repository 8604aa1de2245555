//! Waitlist subscription and support intake.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::info;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::now_rfc3339,
    email::{is_valid_email, normalize_email},
    use_cases::store::{RecordStore, WriteDisposition},
};

const PAGE_URL_MAX_CHARS: usize = 2048;
const USER_AGENT_MAX_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub struct SupportSubmission {
    pub email: String,
    pub message: String,
    pub page_url: Option<String>,
    pub user_agent: Option<String>,
}

pub struct OutreachUseCases {
    store: Arc<dyn RecordStore>,
    subscriptions_table: String,
    support_table: String,
}

impl OutreachUseCases {
    pub fn new(
        store: Arc<dyn RecordStore>,
        subscriptions_table: String,
        support_table: String,
    ) -> Self {
        Self {
            store,
            subscriptions_table,
            support_table,
        }
    }

    /// Adds an email to the waitlist. Idempotent: resubmitting reports
    /// "Already subscribed" instead of failing.
    pub async fn subscribe(&self, email_raw: &str) -> AppResult<&'static str> {
        let email = normalize_email(email_raw);
        if email.is_empty() {
            return Err(AppError::InvalidInput("Email is required".into()));
        }
        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput("Invalid email format".into()));
        }

        let record = json!({
            "email": email,
            "created_at": now_rfc3339(),
        });
        let outcome = self
            .store
            .upsert(&self.subscriptions_table, &record, "email")
            .await?;

        info!(%email, "waitlist subscription stored");
        Ok(match outcome.disposition {
            WriteDisposition::Created => "Subscribed",
            WriteDisposition::Merged => "Already subscribed",
        })
    }

    pub async fn submit_support(&self, submission: SupportSubmission) -> AppResult<()> {
        let email = normalize_email(&submission.email);
        if email.is_empty() {
            return Err(AppError::InvalidInput("Email is required".into()));
        }
        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput("Invalid email format".into()));
        }

        let message = submission.message.trim().to_string();
        if message.is_empty() {
            return Err(AppError::InvalidInput("Message is required".into()));
        }

        let mut record = Map::new();
        record.insert("email".into(), Value::String(email.clone()));
        record.insert("support_message".into(), Value::String(message));
        record.insert("last_support_at".into(), Value::String(now_rfc3339()));
        record.insert("source".into(), Value::String("support".into()));

        if let Some(user_agent) = non_empty(submission.user_agent, USER_AGENT_MAX_CHARS) {
            record.insert("user_agent".into(), Value::String(user_agent));
        }
        if let Some(page_url) = non_empty(submission.page_url, PAGE_URL_MAX_CHARS) {
            record.insert("page_url".into(), Value::String(page_url));
        }

        self.store
            .upsert(&self.support_table, &Value::Object(record), "email")
            .await?;

        info!(%email, "support request stored");
        Ok(())
    }
}

fn non_empty(value: Option<String>, max_chars: usize) -> Option<String> {
    let value = value?;
    let truncated: String = value.chars().take(max_chars).collect();
    if truncated.is_empty() {
        None
    } else {
        Some(truncated)
    }
}
