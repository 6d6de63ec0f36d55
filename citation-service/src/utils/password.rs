use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::fmt;

/// Newtype for plaintext passwords. `Debug` is redacted so a password
/// never ends up in a log line through `?request`.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(**redacted**)")
    }
}

/// Newtype for a PHC formatted password hash
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for PasswordHashString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHashString(**redacted**)")
    }
}

/// One-way credential hashing.
///
/// `verify` never fails: a digest that cannot be parsed simply does not
/// match any password.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &Password) -> Result<PasswordHashString, anyhow::Error>;

    fn verify(&self, password: &Password, hash: &PasswordHashString) -> bool;
}

/// Argon2id with the crate's default cost parameters and a fresh random
/// salt per call, embedded in the PHC string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &Password) -> Result<PasswordHashString, anyhow::Error> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = Argon2::default()
            .hash_password(password.as_str().as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        Ok(PasswordHashString::new(password_hash))
    }

    fn verify(&self, password: &Password, hash: &PasswordHashString) -> bool {
        let parsed_hash = match PasswordHash::new(hash.as_str()) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is malformed");
                return false;
            }
        };

        Argon2::default()
            .verify_password(password.as_str().as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let hasher = Argon2Hasher::new();
        let password = Password::new("mySecurePassword123".to_string());
        let hash = hasher.hash(&password).expect("Failed to hash password");

        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(!hash.as_str().contains("mySecurePassword123"));
    }

    #[test]
    fn test_verify_password_correct_and_incorrect() {
        let hasher = Argon2Hasher::new();
        let password = Password::new("mySecurePassword123".to_string());
        let hash = hasher.hash(&password).expect("Failed to hash password");

        assert!(hasher.verify(&password, &hash));
        assert!(!hasher.verify(&Password::new("wrongPassword".to_string()), &hash));
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let hasher = Argon2Hasher::new();
        let password = Password::new("mySecurePassword123".to_string());
        let hash1 = hasher.hash(&password).expect("Failed to hash password");
        let hash2 = hasher.hash(&password).expect("Failed to hash password");

        // Random salt per call
        assert_ne!(hash1.as_str(), hash2.as_str());
        assert!(hasher.verify(&password, &hash1));
        assert!(hasher.verify(&password, &hash2));
    }

    #[test]
    fn test_malformed_hash_is_false_not_error() {
        let hasher = Argon2Hasher::new();
        let password = Password::new("anything".to_string());

        assert!(!hasher.verify(&password, &PasswordHashString::new("not-a-phc-string".into())));
        assert!(!hasher.verify(&password, &PasswordHashString::new(String::new())));
    }

    #[test]
    fn test_debug_output_is_redacted() {
        let password = Password::new("hunter2".to_string());
        assert!(!format!("{:?}", password).contains("hunter2"));
    }
}
