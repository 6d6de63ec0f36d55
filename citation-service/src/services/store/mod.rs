//! Persistence boundary.
//!
//! Services only see the [`CredentialStore`] and [`SummaryStore`] traits.
//! [`PgStore`] is the production backend, [`MemoryStore`] backs tests and
//! local runs without a database. Both enforce username and email
//! uniqueness themselves, so a registration race always ends in
//! [`StoreError::Duplicate`] for the loser.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Doi, Highlight, HighlightChanges, NewHighlight, NewUser, Summary, User, UserFlags, UserLookup,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueField::Username => f.write_str("Username"),
            UniqueField::Email => f.write_str("Email"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate {0}")]
    Duplicate(UniqueField),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user(&self, lookup: &UserLookup) -> Result<Option<User>, StoreError>;

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError>;

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    async fn update_user_flags(
        &self,
        lookup: &UserLookup,
        flags: UserFlags,
    ) -> Result<Option<User>, StoreError>;

    /// Returns the deleted account. Its highlights go with it.
    async fn delete_user(&self, lookup: &UserLookup) -> Result<Option<User>, StoreError>;

    async fn create_highlight(&self, highlight: NewHighlight) -> Result<Highlight, StoreError>;

    async fn get_highlight(&self, id: i64) -> Result<Option<Highlight>, StoreError>;

    async fn list_user_highlights(&self, user_id: i64) -> Result<Vec<Highlight>, StoreError>;

    async fn list_highlights(&self, doi: Option<&Doi>) -> Result<Vec<Highlight>, StoreError>;

    /// Applies `changes` only while the row still belongs to `owner_id` and
    /// still carries `changes.doi`. `None` when either condition no longer
    /// holds or the row is gone.
    async fn update_owned_highlight(
        &self,
        id: i64,
        owner_id: i64,
        changes: HighlightChanges,
    ) -> Result<Option<Highlight>, StoreError>;

    /// Deletes only while the row still belongs to `owner_id`.
    async fn delete_owned_highlight(
        &self,
        id: i64,
        owner_id: i64,
    ) -> Result<Option<Highlight>, StoreError>;
}

#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn create_summary(&self, url: &str) -> Result<Summary, StoreError>;

    async fn get_summary(&self, id: i64) -> Result<Option<Summary>, StoreError>;

    async fn list_summaries(&self) -> Result<Vec<Summary>, StoreError>;

    async fn update_summary(
        &self,
        id: i64,
        url: &str,
        summary: &str,
    ) -> Result<Option<Summary>, StoreError>;

    async fn set_summary_text(&self, id: i64, summary: &str) -> Result<bool, StoreError>;

    async fn delete_summary(&self, id: i64) -> Result<Option<Summary>, StoreError>;
}
