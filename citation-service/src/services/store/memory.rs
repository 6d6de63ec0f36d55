use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{CredentialStore, StoreError, SummaryStore, UniqueField};
use crate::models::{
    Doi, Highlight, HighlightChanges, NewHighlight, NewUser, Summary, User, UserFlags, UserLookup,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    highlights: BTreeMap<i64, Highlight>,
    summaries: BTreeMap<i64, Summary>,
    next_user_id: i64,
    next_highlight_id: i64,
    next_summary_id: i64,
}

impl Tables {
    fn find_user(&self, lookup: &UserLookup) -> Option<&User> {
        match lookup {
            UserLookup::Id(id) => self.users.get(id),
            UserLookup::Username(username) => {
                self.users.values().find(|u| &u.username == username)
            }
            UserLookup::Email(email) => self.users.values().find(|u| &u.email == email),
        }
    }

    fn find_user_id(&self, lookup: &UserLookup) -> Option<i64> {
        self.find_user(lookup).map(|u| u.id)
    }
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// In-process store. Every write takes the single lock, so check and
/// insert are atomic just like a unique index.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(UniqueField::Username));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }

        let id = next_id(&mut tables.next_user_id);
        let user = User {
            id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            disabled: false,
            is_admin: false,
            hashed_password: user.hashed_password,
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, lookup: &UserLookup) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.find_user(lookup).cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().any(|u| u.email == email))
    }

    async fn update_user_flags(
        &self,
        lookup: &UserLookup,
        flags: UserFlags,
    ) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(id) = tables.find_user_id(lookup) else {
            return Ok(None);
        };

        Ok(tables.users.get_mut(&id).map(|user| {
            flags.apply(user);
            user.clone()
        }))
    }

    async fn delete_user(&self, lookup: &UserLookup) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(id) = tables.find_user_id(lookup) else {
            return Ok(None);
        };

        tables.highlights.retain(|_, h| h.user_id != id);
        Ok(tables.users.remove(&id))
    }

    async fn create_highlight(&self, highlight: NewHighlight) -> Result<Highlight, StoreError> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.next_highlight_id);
        let highlight = Highlight {
            id,
            user_id: highlight.user_id,
            doi: highlight.doi,
            highlight: highlight.highlight,
            comment: highlight.comment,
            created_at: Utc::now(),
        };
        tables.highlights.insert(id, highlight.clone());
        Ok(highlight)
    }

    async fn get_highlight(&self, id: i64) -> Result<Option<Highlight>, StoreError> {
        Ok(self.tables.read().await.highlights.get(&id).cloned())
    }

    async fn list_user_highlights(&self, user_id: i64) -> Result<Vec<Highlight>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .highlights
            .values()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_highlights(&self, doi: Option<&Doi>) -> Result<Vec<Highlight>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .highlights
            .values()
            .filter(|h| doi.map_or(true, |doi| &h.doi == doi))
            .cloned()
            .collect())
    }

    async fn update_owned_highlight(
        &self,
        id: i64,
        owner_id: i64,
        changes: HighlightChanges,
    ) -> Result<Option<Highlight>, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.highlights.get_mut(&id) {
            Some(h) if h.user_id == owner_id && h.doi == changes.doi => {
                h.apply(changes);
                Ok(Some(h.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_owned_highlight(
        &self,
        id: i64,
        owner_id: i64,
    ) -> Result<Option<Highlight>, StoreError> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .highlights
            .get(&id)
            .is_some_and(|h| h.user_id == owner_id);

        if owned {
            Ok(tables.highlights.remove(&id))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl SummaryStore for MemoryStore {
    async fn create_summary(&self, url: &str) -> Result<Summary, StoreError> {
        let mut tables = self.tables.write().await;
        let id = next_id(&mut tables.next_summary_id);
        let summary = Summary {
            id,
            url: url.to_string(),
            summary: String::new(),
            created_at: Utc::now(),
        };
        tables.summaries.insert(id, summary.clone());
        Ok(summary)
    }

    async fn get_summary(&self, id: i64) -> Result<Option<Summary>, StoreError> {
        Ok(self.tables.read().await.summaries.get(&id).cloned())
    }

    async fn list_summaries(&self) -> Result<Vec<Summary>, StoreError> {
        Ok(self.tables.read().await.summaries.values().cloned().collect())
    }

    async fn update_summary(
        &self,
        id: i64,
        url: &str,
        summary: &str,
    ) -> Result<Option<Summary>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.summaries.get_mut(&id).map(|s| {
            s.url = url.to_string();
            s.summary = summary.to_string();
            s.clone()
        }))
    }

    async fn set_summary_text(&self, id: i64, summary: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .summaries
            .get_mut(&id)
            .map(|s| s.summary = summary.to_string())
            .is_some())
    }

    async fn delete_summary(&self, id: i64) -> Result<Option<Summary>, StoreError> {
        Ok(self.tables.write().await.summaries.remove(&id))
    }
}
