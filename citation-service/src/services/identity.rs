use std::sync::Arc;

use crate::models::{User, UserLookup};
use crate::services::store::CredentialStore;
use crate::services::{JwtService, ServiceError};

/// Turns a bearer token into the account it names.
#[derive(Clone)]
pub struct IdentityResolver {
    jwt: JwtService,
    store: Arc<dyn CredentialStore>,
}

impl IdentityResolver {
    pub fn new(jwt: JwtService, store: Arc<dyn CredentialStore>) -> Self {
        Self { jwt, store }
    }

    /// `InvalidToken` for a bad token, `Unauthenticated` when the subject no
    /// longer exists, `InactiveUser` when the account is disabled.
    pub async fn resolve(&self, token: &str) -> Result<User, ServiceError> {
        let claims = self.jwt.verify(token)?;

        let user = self
            .store
            .find_user(&UserLookup::Username(claims.sub))
            .await?
            .ok_or(ServiceError::Unauthenticated)?;

        if user.disabled {
            tracing::info!(user_id = user.id, "Token presented for disabled account");
            return Err(ServiceError::InactiveUser);
        }

        Ok(user)
    }
}
