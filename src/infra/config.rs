use std::env;
use std::net::SocketAddr;

use secrecy::SecretString;
use tracing::warn;
use url::Url;

const DEFAULT_SITE_ORIGIN: &str = "https://lexiflow.app";
const DEFAULT_DASHBOARD_USER: &str = "admin";
const DEFAULT_DASHBOARD_PASS: &str = "lexiflow2025";

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Fallback origin for checkout redirect URLs when the request carries
    /// no `Origin` header.
    pub site_origin: String,
    pub supabase_url: Url,
    pub supabase_service_role_key: SecretString,
    /// Licensing-project overrides used by the confirmation path; fall back
    /// to the base store when unset.
    pub licensing_url: Url,
    pub licensing_service_role_key: SecretString,
    pub stripe_secret_key: SecretString,
    /// When set, inbound webhooks must carry a valid `stripe-signature`.
    pub stripe_webhook_secret: Option<SecretString>,
    /// Absent secret means the admin endpoint rejects everything.
    pub admin_secret: Option<SecretString>,
    pub dashboard_user: String,
    pub dashboard_pass: SecretString,
    pub subscriptions_table: String,
    pub support_table: String,
    pub telemetry_backend_url: Option<Url>,
    pub telemetry_read_token: Option<SecretString>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = env::var("BIND_ADDR")
            .unwrap_or("127.0.0.1:3000".to_string())
            .parse()
            .expect("BIND_ADDR must be a valid socket address");

        let site_origin = env::var("SITE_ORIGIN").unwrap_or(DEFAULT_SITE_ORIGIN.to_string());

        let supabase_url: Url = env::var("SUPABASE_URL")
            .expect("SUPABASE_URL must be set")
            .parse()
            .expect("SUPABASE_URL must be a valid URL");
        let supabase_service_role_key: SecretString = env::var("SUPABASE_SERVICE_ROLE_KEY")
            .expect("SUPABASE_SERVICE_ROLE_KEY must be set")
            .into();

        let licensing_url: Url = match non_empty_var("SUPABASE_LICENSING_URL") {
            Some(raw) => raw.parse().expect("SUPABASE_LICENSING_URL must be a valid URL"),
            None => supabase_url.clone(),
        };
        let licensing_service_role_key: SecretString =
            non_empty_var("SUPABASE_LICENSING_SERVICE_ROLE_KEY")
                .or_else(|| non_empty_var("SUPABASE_LICENSING_KEY"))
                .map(Into::into)
                .unwrap_or_else(|| supabase_service_role_key.clone());

        let stripe_secret_key: SecretString = env::var("STRIPE_SECRET_KEY")
            .expect("STRIPE_SECRET_KEY must be set")
            .into();

        let stripe_webhook_secret: Option<SecretString> =
            non_empty_var("STRIPE_WEBHOOK_SECRET").map(Into::into);
        if stripe_webhook_secret.is_none() {
            warn!("STRIPE_WEBHOOK_SECRET not set, webhook signature verification is disabled");
        }

        let admin_secret: Option<SecretString> = non_empty_var("ADMIN_SECRET").map(Into::into);
        if admin_secret.is_none() {
            warn!("ADMIN_SECRET not set, manual pro-user activation is disabled");
        }

        let dashboard_user = match non_empty_var("HQ_USER") {
            Some(user) => user,
            None => {
                warn!("HQ_USER not set, dashboard uses the default username");
                DEFAULT_DASHBOARD_USER.to_string()
            }
        };
        let dashboard_pass: SecretString = match non_empty_var("HQ_PASS") {
            Some(pass) => pass.into(),
            None => {
                warn!("HQ_PASS not set, dashboard uses the insecure default password");
                DEFAULT_DASHBOARD_PASS.into()
            }
        };

        let subscriptions_table = env::var("SUPABASE_SUBSCRIPTIONS_TABLE")
            .unwrap_or("email_subscriptions".to_string());
        let support_table =
            env::var("SUPABASE_WAITLIST_TABLE").unwrap_or("waitlist_emails".to_string());

        let telemetry_backend_url: Option<Url> = non_empty_var("TELEMETRY_BACKEND_URL")
            .map(|raw| raw.parse().expect("TELEMETRY_BACKEND_URL must be a valid URL"));
        let telemetry_read_token: Option<SecretString> =
            non_empty_var("TELEMETRY_READ_TOKEN").map(Into::into);

        Self {
            bind_addr,
            site_origin,
            supabase_url,
            supabase_service_role_key,
            licensing_url,
            licensing_service_role_key,
            stripe_secret_key,
            stripe_webhook_secret,
            admin_secret,
            dashboard_user,
            dashboard_pass,
            subscriptions_table,
            support_table,
            telemetry_backend_url,
            telemetry_read_token,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}
