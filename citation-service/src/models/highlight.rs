use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use utoipa::ToSchema;

use super::Doi;

/// One highlighted region of a PDF page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HighlightRegion {
    /// `[x0, y0, x1, y1]` in page coordinates
    #[schema(value_type = Vec<f64>)]
    pub rect: [f64; 4],
    pub text: String,
}

impl HighlightRegion {
    pub fn is_finite(&self) -> bool {
        self.rect.iter().all(|v| v.is_finite())
    }
}

/// Arbitrary key (usually a page or selection id) to region.
pub type HighlightContent = BTreeMap<String, HighlightRegion>;

#[derive(Debug, Clone, FromRow)]
pub struct Highlight {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(try_from = "String")]
    pub doi: Doi,
    #[sqlx(json)]
    pub highlight: HighlightContent,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHighlight {
    pub user_id: i64,
    pub doi: Doi,
    pub highlight: HighlightContent,
    pub comment: Option<String>,
}

/// Replacement content for an existing highlight. `doi` is not applied,
/// it must equal the stored one.
#[derive(Debug, Clone)]
pub struct HighlightChanges {
    pub doi: Doi,
    pub highlight: HighlightContent,
    pub comment: Option<String>,
}

impl Highlight {
    pub fn apply(&mut self, changes: HighlightChanges) {
        self.highlight = changes.highlight;
        self.comment = changes.comment;
    }

    /// Concatenated text of every region, in key order.
    pub fn text(&self) -> String {
        self.highlight
            .values()
            .map(|region| region.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Display for Highlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Highlight {} on {}", self.id, self.doi)
    }
}
