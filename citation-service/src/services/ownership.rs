//! Instance level authorization.
//!
//! Runs after the policy engine has allowed the coarse action. Checks, in
//! order: the record exists, the caller owns it, and (for updates) the
//! DOI has not changed.

use thiserror::Error;

use crate::models::{Doi, Highlight};
use crate::services::ServiceError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Not the owner of this record")]
    NotOwner,
}

/// A record with a single owning account.
pub trait Owned {
    const KIND: &'static str;

    fn owner_id(&self) -> i64;
}

impl Owned for Highlight {
    const KIND: &'static str = "Highlight";

    fn owner_id(&self) -> i64 {
        self.user_id
    }
}

/// Existence then ownership. Hands the record back on success.
pub fn assert_owner<T: Owned>(record: Option<T>, acting_user_id: i64) -> Result<T, OwnershipError> {
    let record = record.ok_or(OwnershipError::NotFound(T::KIND))?;

    if record.owner_id() != acting_user_id {
        tracing::warn!(
            kind = T::KIND,
            owner_id = record.owner_id(),
            acting_user_id,
            "Ownership check failed"
        );
        return Err(OwnershipError::NotOwner);
    }

    Ok(record)
}

/// DOI is the partition key of an annotation set and cannot move.
pub fn assert_same_doi(stored: &Doi, requested: &Doi) -> Result<(), ServiceError> {
    if stored == requested {
        Ok(())
    } else {
        Err(ServiceError::DoiMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn highlight(owner: i64) -> Highlight {
        Highlight {
            id: 10,
            user_id: owner,
            doi: Doi::parse("10.1234/example.5678").unwrap(),
            highlight: Default::default(),
            comment: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn missing_record_is_not_found() {
        assert_eq!(
            assert_owner::<Highlight>(None, 1).unwrap_err(),
            OwnershipError::NotFound("Highlight")
        );
    }

    #[test]
    fn other_owner_is_rejected() {
        assert_eq!(
            assert_owner(Some(highlight(1)), 2).unwrap_err(),
            OwnershipError::NotOwner
        );
    }

    #[test]
    fn owner_gets_record_back() {
        let record = assert_owner(Some(highlight(1)), 1).unwrap();
        assert_eq!(record.id, 10);
    }

    #[test]
    fn doi_must_match_after_normalisation() {
        let stored = Doi::parse("10.1234/example.5678").unwrap();
        let same = Doi::parse("https://doi.org/10.1234/EXAMPLE.5678").unwrap();
        let other = Doi::parse("10.1234/other").unwrap();

        assert!(assert_same_doi(&stored, &same).is_ok());
        assert!(matches!(
            assert_same_doi(&stored, &other),
            Err(ServiceError::DoiMismatch)
        ));
    }
}
