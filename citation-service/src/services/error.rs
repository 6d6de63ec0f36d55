use service_core::error::AppError;
use thiserror::Error;

use crate::models::InvalidDoi;
use crate::services::ownership::OwnershipError;
use crate::services::store::{StoreError, UniqueField};
use crate::utils::PasswordPolicyError;

const FORBIDDEN_MESSAGE: &str = "Not authorized to perform this action";

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Bad signature, malformed payload, unexpected algorithm or expired.
    #[error("Could not validate credentials")]
    InvalidToken,

    /// No credential presented, or the token names an unknown account.
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Inactive user")]
    InactiveUser,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// The policy engine denied the path and action.
    #[error("Policy denied access")]
    PolicyForbidden,

    /// The record exists but belongs to somebody else.
    #[error("Not the owner of this record")]
    NotOwner,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("DOI cannot be changed on update")]
    DoiMismatch,

    #[error("{0} already registered")]
    RegistrationConflict(UniqueField),

    #[error("{0}")]
    WeakPassword(#[from] PasswordPolicyError),

    #[error("Invalid DOI format")]
    InvalidDoiFormat,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(field) => ServiceError::RegistrationConflict(field),
            other => ServiceError::Store(other),
        }
    }
}

impl From<OwnershipError> for ServiceError {
    fn from(err: OwnershipError) -> Self {
        match err {
            OwnershipError::NotFound(resource) => ServiceError::NotFound(resource),
            OwnershipError::NotOwner => ServiceError::NotOwner,
        }
    }
}

impl From<InvalidDoi> for ServiceError {
    fn from(_: InvalidDoi) -> Self {
        ServiceError::InvalidDoiFormat
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidToken
            | ServiceError::Unauthenticated
            | ServiceError::InvalidCredentials => AppError::Unauthorized(anyhow::anyhow!(err)),
            ServiceError::InactiveUser => AppError::BadRequest(anyhow::anyhow!(err)),
            // Both gates render the same way; the variants stay apart for callers.
            ServiceError::PolicyForbidden | ServiceError::NotOwner => {
                AppError::Forbidden(anyhow::anyhow!(FORBIDDEN_MESSAGE))
            }
            ServiceError::NotFound(_) => AppError::NotFound(anyhow::anyhow!(err)),
            ServiceError::RegistrationConflict(_) => AppError::Conflict(anyhow::anyhow!(err)),
            ServiceError::DoiMismatch
            | ServiceError::WeakPassword(_)
            | ServiceError::InvalidDoiFormat
            | ServiceError::InvalidInput(_) => AppError::Unprocessable(anyhow::anyhow!(err)),
            ServiceError::Store(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
