pub mod password;
pub mod password_policy;
pub mod validation;

pub use password::{Argon2Hasher, CredentialHasher, Password, PasswordHashString};
pub use password_policy::{PasswordPolicy, PasswordPolicyError};
pub use validation::ValidatedJson;
