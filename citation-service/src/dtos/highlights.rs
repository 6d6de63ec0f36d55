use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::models::{Highlight, HighlightContent};

fn validate_highlight_content(content: &HighlightContent) -> Result<(), ValidationError> {
    if content.values().all(|region| region.is_finite()) {
        Ok(())
    } else {
        Err(ValidationError::new("rect_not_finite"))
    }
}

/// Body for create and update. `doi` is normalised by the handler.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct HighlightRequest {
    #[schema(example = "10.1234/example.5678")]
    pub doi: String,

    #[validate(custom(
        function = "validate_highlight_content",
        message = "Each rect needs four finite numbers"
    ))]
    pub highlight: HighlightContent,

    #[validate(length(max = 5000, message = "Comment is too long"))]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PublicHighlightQuery {
    /// Only highlights on this DOI
    pub doi: Option<String>,
}

/// Owner's view, includes the username.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HighlightView {
    pub id: i64,
    pub username: String,
    pub doi: String,
    pub highlight: HighlightContent,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HighlightView {
    pub fn new(highlight: Highlight, username: &str) -> Self {
        Self {
            id: highlight.id,
            username: username.to_string(),
            doi: highlight.doi.to_string(),
            highlight: highlight.highlight,
            comment: highlight.comment,
            created_at: highlight.created_at,
        }
    }
}

/// Anonymous view, no ownership data.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicHighlightView {
    pub id: i64,
    pub doi: String,
    pub highlight: HighlightContent,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Highlight> for PublicHighlightView {
    fn from(highlight: Highlight) -> Self {
        Self {
            id: highlight.id,
            doi: highlight.doi.to_string(),
            highlight: highlight.highlight,
            comment: highlight.comment,
            created_at: highlight.created_at,
        }
    }
}

/// Returned by create and delete.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HighlightRef {
    pub id: i64,
    #[schema(example = "10.1234/example.5678")]
    pub doi: String,
}

impl From<Highlight> for HighlightRef {
    fn from(highlight: Highlight) -> Self {
        Self {
            id: highlight.id,
            doi: highlight.doi.to_string(),
        }
    }
}
