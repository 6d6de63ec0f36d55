use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Text summary of a web page. `summary` starts empty and is filled in
/// by the background summarizer.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Summary {
    pub id: i64,
    pub url: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}
