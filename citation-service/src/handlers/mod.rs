pub mod admin;
pub mod health;
pub mod highlights;
pub mod metrics;
pub mod summaries;
pub mod users;
pub mod well_known;

use service_core::error::AppError;

use crate::utils::validation::validate_positive_id;

/// Path identifiers must be greater than zero.
pub(crate) fn positive_id(id: i64) -> Result<i64, AppError> {
    validate_positive_id(id)
        .map(|()| id)
        .map_err(|_| AppError::Unprocessable(anyhow::anyhow!("id must be greater than 0")))
}
