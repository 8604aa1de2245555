pub mod admin;
pub mod checkout;
pub mod dash;
pub mod outreach;
pub mod purchase;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(checkout::router())
        .merge(purchase::router())
        .merge(outreach::router())
        .merge(admin::router())
        .merge(dash::router())
}
