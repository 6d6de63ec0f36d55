use std::sync::Arc;

use crate::models::{Doi, Highlight, HighlightChanges, HighlightContent, NewHighlight, User};
use crate::services::ownership::{assert_owner, assert_same_doi};
use crate::services::store::CredentialStore;
use crate::services::ServiceError;

/// Highlight CRUD with the instance level ownership gate.
#[derive(Clone)]
pub struct HighlightService {
    store: Arc<dyn CredentialStore>,
}

impl HighlightService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        owner: &User,
        doi: Doi,
        highlight: HighlightContent,
        comment: Option<String>,
    ) -> Result<Highlight, ServiceError> {
        let created = self
            .store
            .create_highlight(NewHighlight {
                user_id: owner.id,
                doi,
                highlight,
                comment,
            })
            .await?;

        tracing::info!(
            highlight_id = created.id,
            user_id = owner.id,
            doi = %created.doi,
            "Highlight created"
        );
        Ok(created)
    }

    /// Owner only read.
    pub async fn get_owned(&self, id: i64, owner: &User) -> Result<Highlight, ServiceError> {
        let record = self.store.get_highlight(id).await?;
        Ok(assert_owner(record, owner.id)?)
    }

    /// Anonymous read of a single record.
    pub async fn get_public(&self, id: i64) -> Result<Highlight, ServiceError> {
        self.store
            .get_highlight(id)
            .await?
            .ok_or(ServiceError::NotFound("Highlight"))
    }

    pub async fn list_for_user(&self, owner: &User) -> Result<Vec<Highlight>, ServiceError> {
        Ok(self.store.list_user_highlights(owner.id).await?)
    }

    pub async fn list_public(&self, doi: Option<&Doi>) -> Result<Vec<Highlight>, ServiceError> {
        Ok(self.store.list_highlights(doi).await?)
    }

    /// Existence, ownership, DOI match, then apply.
    pub async fn update(
        &self,
        id: i64,
        owner: &User,
        changes: HighlightChanges,
    ) -> Result<Highlight, ServiceError> {
        let stored = assert_owner(self.store.get_highlight(id).await?, owner.id)?;
        assert_same_doi(&stored.doi, &changes.doi)?;

        // Conditional write: a concurrent delete surfaces as NotFound.
        let updated = self
            .store
            .update_owned_highlight(id, owner.id, changes)
            .await?
            .ok_or(ServiceError::NotFound("Highlight"))?;

        tracing::info!(highlight_id = id, user_id = owner.id, "Highlight updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: i64, owner: &User) -> Result<Highlight, ServiceError> {
        assert_owner(self.store.get_highlight(id).await?, owner.id)?;

        let deleted = self
            .store
            .delete_owned_highlight(id, owner.id)
            .await?
            .ok_or(ServiceError::NotFound("Highlight"))?;

        tracing::info!(highlight_id = id, user_id = owner.id, "Highlight deleted");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HighlightRegion, NewUser};
    use crate::services::store::MemoryStore;

    async fn setup() -> (HighlightService, User, User) {
        let store = MemoryStore::new();
        let mut users = Vec::new();
        for (name, email) in [("alice", "a@x.com"), ("bob", "b@x.com")] {
            users.push(
                store
                    .create_user(NewUser {
                        username: name.into(),
                        email: email.into(),
                        full_name: None,
                        hashed_password: "$argon2id$stub".into(),
                    })
                    .await
                    .unwrap(),
            );
        }
        let bob = users.pop().unwrap();
        let alice = users.pop().unwrap();
        (HighlightService::new(Arc::new(store)), alice, bob)
    }

    fn content(text: &str) -> HighlightContent {
        let mut content = HighlightContent::new();
        content.insert(
            "1".into(),
            HighlightRegion {
                rect: [10.0, 20.0, 110.0, 40.0],
                text: text.into(),
            },
        );
        content
    }

    fn doi() -> Doi {
        Doi::parse("10.1234/example.5678").unwrap()
    }

    #[tokio::test]
    async fn non_owner_cannot_update_or_delete() {
        let (service, alice, bob) = setup().await;
        let created = service
            .create(&alice, doi(), content("original"), Some("mine".into()))
            .await
            .unwrap();

        let err = service
            .update(
                created.id,
                &bob,
                HighlightChanges {
                    doi: doi(),
                    highlight: content("hijacked"),
                    comment: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotOwner));

        let err = service.delete(created.id, &bob).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotOwner));

        let err = service.get_owned(created.id, &bob).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotOwner));

        let unchanged = service.get_owned(created.id, &alice).await.unwrap();
        assert_eq!(unchanged.text(), "original");
        assert_eq!(unchanged.comment.as_deref(), Some("mine"));
    }

    #[tokio::test]
    async fn doi_change_is_rejected_and_nothing_applied() {
        let (service, alice, _) = setup().await;
        let created = service
            .create(&alice, doi(), content("original"), None)
            .await
            .unwrap();

        let err = service
            .update(
                created.id,
                &alice,
                HighlightChanges {
                    doi: Doi::parse("10.9999/elsewhere").unwrap(),
                    highlight: content("changed"),
                    comment: Some("changed".into()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DoiMismatch));

        let stored = service.get_public(created.id).await.unwrap();
        assert_eq!(stored.text(), "original");
        assert!(stored.comment.is_none());
    }

    #[tokio::test]
    async fn existence_is_checked_before_ownership() {
        let (service, alice, _) = setup().await;
        let err = service
            .update(
                999,
                &alice,
                HighlightChanges {
                    doi: doi(),
                    highlight: content("x"),
                    comment: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Highlight")));
    }

    #[tokio::test]
    async fn owner_update_keeps_identity_fields() {
        let (service, alice, _) = setup().await;
        let created = service
            .create(&alice, doi(), content("original"), None)
            .await
            .unwrap();

        let updated = service
            .update(
                created.id,
                &alice,
                HighlightChanges {
                    doi: Doi::parse("DOI:10.1234/EXAMPLE.5678").unwrap(),
                    highlight: content("revised"),
                    comment: Some("note".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.user_id, alice.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.text(), "revised");
    }

    #[tokio::test]
    async fn delete_is_permanent() {
        let (service, alice, _) = setup().await;
        let created = service
            .create(&alice, doi(), content("gone"), None)
            .await
            .unwrap();

        service.delete(created.id, &alice).await.unwrap();
        assert!(matches!(
            service.get_public(created.id).await,
            Err(ServiceError::NotFound("Highlight"))
        ));
        assert!(matches!(
            service.delete(created.id, &alice).await,
            Err(ServiceError::NotFound("Highlight"))
        ));
    }

    #[tokio::test]
    async fn public_listing_filters_by_doi() {
        let (service, alice, bob) = setup().await;
        service.create(&alice, doi(), content("a"), None).await.unwrap();
        service
            .create(&bob, Doi::parse("10.5555/other").unwrap(), content("b"), None)
            .await
            .unwrap();

        assert_eq!(service.list_public(None).await.unwrap().len(), 2);
        assert_eq!(service.list_public(Some(&doi())).await.unwrap().len(), 1);
        assert_eq!(service.list_for_user(&bob).await.unwrap().len(), 1);
    }
}
