pub mod app_error;
pub mod email;
pub mod plan;
pub mod purchase_event;
pub mod use_cases;
