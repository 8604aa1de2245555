use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Server configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    /// A store or payment-provider call failed or returned non-success.
    /// Carries the best-effort message extracted from the upstream body.
    #[error("{0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;
