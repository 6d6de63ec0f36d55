use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::Summary;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SummaryRequest {
    #[validate(url(message = "Invalid URL"))]
    #[schema(example = "https://example.com/article")]
    pub url: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SummaryUpdateRequest {
    #[validate(url(message = "Invalid URL"))]
    #[schema(example = "https://example.com/article")]
    pub url: String,
    pub summary: String,
}

/// Returned by create and delete.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SummaryRef {
    pub id: i64,
    pub url: String,
}

impl From<Summary> for SummaryRef {
    fn from(summary: Summary) -> Self {
        Self {
            id: summary.id,
            url: summary.url,
        }
    }
}
