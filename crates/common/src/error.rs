use thiserror::Error;

#[derive(Debug, Error)]
pub enum MlsError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MlsError {
    /// Whether retrying the same operation could plausibly succeed.
    /// Only store-side failures qualify; bad input and misconfiguration never heal.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

pub type MlsResult<T> = Result<T, MlsError>;
