use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::models::{NewUser, User, UserFlags, UserLookup};
use crate::services::metrics::{record_login, record_registration};
use crate::services::store::{CredentialStore, StoreError, UniqueField};
use crate::services::{JwtService, ServiceError, TokenResponse};
use crate::utils::{CredentialHasher, Password, PasswordHashString, PasswordPolicy};

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub password: Password,
}

/// Account lifecycle: registration, login and the admin directory.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn CredentialStore>,
    hasher: Arc<dyn CredentialHasher>,
    jwt: JwtService,
    password_policy: PasswordPolicy,
    // Verified against when the username is unknown, so a miss costs a
    // full hash verification too.
    decoy_hash: Arc<OnceCell<PasswordHashString>>,
}

const DECOY_PASSWORD: &str = "decoy-password-never-issued";

/// Registration metric label for a failed insert. Only a lost uniqueness
/// race is a conflict.
fn insert_failure_outcome(error: &StoreError) -> &'static str {
    match error {
        StoreError::Duplicate(_) => "conflict",
        StoreError::Database(_) | StoreError::Migration(_) => "error",
    }
}

impl UserService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: Arc<dyn CredentialHasher>,
        jwt: JwtService,
        password_policy: PasswordPolicy,
    ) -> Self {
        Self {
            store,
            hasher,
            jwt,
            password_policy,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Strength, username, email, hash, insert. Nothing is hashed or
    /// written once a check has failed.
    #[tracing::instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> Result<User, ServiceError> {
        if let Err(reason) = self.password_policy.validate(registration.password.as_str()) {
            record_registration("weak_password");
            return Err(ServiceError::WeakPassword(reason));
        }

        if self.store.username_exists(&registration.username).await? {
            record_registration("conflict");
            return Err(ServiceError::RegistrationConflict(UniqueField::Username));
        }

        if self.store.email_exists(&registration.email).await? {
            record_registration("conflict");
            return Err(ServiceError::RegistrationConflict(UniqueField::Email));
        }

        let hashed_password = self.hash_blocking(registration.password.clone()).await?;

        // The store's unique constraint settles races the pre-checks missed.
        let user = self
            .store
            .create_user(NewUser {
                username: registration.username,
                email: registration.email,
                full_name: registration.full_name,
                hashed_password: hashed_password.into_string(),
            })
            .await
            .map_err(|e| {
                record_registration(insert_failure_outcome(&e));
                ServiceError::from(e)
            })?;

        record_registration("created");
        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    // Argon2 is CPU bound; keep it off the async workers.
    async fn hash_blocking(&self, password: Password) -> Result<PasswordHashString, ServiceError> {
        let hasher = Arc::clone(&self.hasher);
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| anyhow::anyhow!("Hashing task failed: {}", e))??;
        Ok(hash)
    }

    async fn verify_blocking(
        &self,
        password: Password,
        hash: PasswordHashString,
    ) -> Result<bool, ServiceError> {
        let hasher = Arc::clone(&self.hasher);
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| anyhow::anyhow!("Verification task failed: {}", e))?;
        Ok(matches)
    }

    async fn verify_decoy(&self, password: Password) -> Result<(), ServiceError> {
        let hasher = Arc::clone(&self.hasher);
        let decoy = Arc::clone(&self.decoy_hash);
        tokio::task::spawn_blocking(move || -> Result<(), anyhow::Error> {
            let hash = decoy
                .get_or_try_init(|| hasher.hash(&Password::new(DECOY_PASSWORD.to_string())))?;
            hasher.verify(&password, hash);
            Ok(())
        })
        .await
        .map_err(|e| anyhow::anyhow!("Verification task failed: {}", e))??;
        Ok(())
    }

    /// Unknown user and wrong password fail identically.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &Password,
    ) -> Result<User, ServiceError> {
        let user = self
            .store
            .find_user(&UserLookup::Username(username.to_string()))
            .await?;

        let Some(user) = user else {
            self.verify_decoy(password.clone()).await?;
            record_login("invalid_credentials");
            return Err(ServiceError::InvalidCredentials);
        };

        let hash = PasswordHashString::new(user.hashed_password.clone());
        if !self.verify_blocking(password.clone(), hash).await? {
            record_login("invalid_credentials");
            return Err(ServiceError::InvalidCredentials);
        }

        if user.disabled {
            record_login("inactive");
            return Err(ServiceError::InactiveUser);
        }

        record_login("success");
        Ok(user)
    }

    pub async fn login(
        &self,
        username: &str,
        password: &Password,
    ) -> Result<TokenResponse, ServiceError> {
        let user = self.authenticate(username, password).await?;
        let token = self.jwt.issue_access_token(&user.username)?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(token)
    }

    pub async fn find(&self, lookup: &UserLookup) -> Result<User, ServiceError> {
        self.store
            .find_user(lookup)
            .await?
            .ok_or(ServiceError::NotFound("User"))
    }

    pub async fn update_flags(
        &self,
        lookup: &UserLookup,
        flags: UserFlags,
    ) -> Result<User, ServiceError> {
        let user = self
            .store
            .update_user_flags(lookup, flags)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        tracing::info!(
            user_id = user.id,
            disabled = user.disabled,
            is_admin = user.is_admin,
            "User flags updated"
        );
        Ok(user)
    }

    pub async fn delete(&self, lookup: &UserLookup) -> Result<User, ServiceError> {
        let user = self
            .store
            .delete_user(lookup)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        tracing::info!(user_id = user.id, "User deleted");
        Ok(user)
    }

    /// Promote the listed accounts to admin. Missing accounts are skipped.
    pub async fn grant_admin(&self, usernames: &[String]) -> Result<usize, ServiceError> {
        let mut granted = 0;
        for username in usernames {
            let flags = UserFlags {
                disabled: None,
                is_admin: Some(true),
            };
            match self
                .store
                .update_user_flags(&UserLookup::Username(username.clone()), flags)
                .await?
            {
                Some(user) => {
                    tracing::info!(user_id = user.id, "Admin flag granted at startup");
                    granted += 1;
                }
                None => tracing::warn!(username = %username, "Admin bootstrap user not found"),
            }
        }
        Ok(granted)
    }
}
