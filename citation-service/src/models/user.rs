use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Stored account. Carries the password hash, so it is never serialised
/// directly; handlers render [`SanitizedUser`] instead.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub disabled: bool,
    pub is_admin: bool,
    pub hashed_password: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied at registration, after hashing.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub hashed_password: String,
}

/// How an admin addresses an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserLookup {
    Id(i64),
    Username(String),
    Email(String),
}

impl std::fmt::Display for UserLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserLookup::Id(id) => write!(f, "id={}", id),
            UserLookup::Username(username) => write!(f, "username={}", username),
            UserLookup::Email(email) => write!(f, "email={}", email),
        }
    }
}

/// Partial update of the admin controlled flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserFlags {
    pub disabled: Option<bool>,
    pub is_admin: Option<bool>,
}

impl UserFlags {
    pub fn apply(&self, user: &mut User) {
        if let Some(disabled) = self.disabled {
            user.disabled = disabled;
        }
        if let Some(is_admin) = self.is_admin {
            user.is_admin = is_admin;
        }
    }
}

/// Public view of an account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SanitizedUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub disabled: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for SanitizedUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            disabled: user.disabled,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            full_name: None,
            disabled: false,
            is_admin: false,
            hashed_password: "$argon2id$secret".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn sanitized_user_drops_hash() {
        let json = serde_json::to_value(SanitizedUser::from(user())).unwrap();
        assert_eq!(json["username"], "alice");
        assert!(json.get("hashed_password").is_none());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn flags_apply_only_present_fields() {
        let mut u = user();
        UserFlags {
            disabled: Some(true),
            is_admin: None,
        }
        .apply(&mut u);
        assert!(u.disabled);
        assert!(!u.is_admin);
    }
}
