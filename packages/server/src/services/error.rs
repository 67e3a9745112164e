use common::generator::ImageParamError;
use common::{GeneratorError, StorageError};
use sea_orm::DbErr;
use thiserror::Error;

/// Refusal message for the recipe generation path.
pub const RECIPE_REFUSAL: &str = "I'm sorry, but I can't assist with that request.";

/// Refusal message for the image and chat paths.
pub const GENERAL_REFUSAL: &str = "Sorry, I can't help with that request.";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InappropriateRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("history entry belongs to another user")]
    WrongOwner,

    #[error("access denied")]
    AccessDenied,

    #[error("{0}")]
    InvalidInput(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("storage failure: {0}")]
    Storage(StorageError),

    #[error("database failure: {0}")]
    Database(#[from] DbErr),

    #[error("internal failure: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Classify a generator failure. Refusals carry `refusal` as their message.
    pub fn from_generator(err: GeneratorError, refusal: &str) -> Self {
        match err {
            GeneratorError::ContentPolicy(detail) => {
                tracing::info!(%detail, "Generator refused request");
                ServiceError::InappropriateRequest(refusal.to_string())
            }
            e if e.is_transient() => ServiceError::Transient(e.to_string()),
            e => ServiceError::Internal(e.to_string()),
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        if err.is_transient() {
            ServiceError::Transient(err.to_string())
        } else {
            ServiceError::Storage(err)
        }
    }
}

impl From<ImageParamError> for ServiceError {
    fn from(err: ImageParamError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}
