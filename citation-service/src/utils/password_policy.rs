//! Password strength rules applied at registration.

/// Reasons a password is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordPolicyError {
    TooShort {
        min_length: usize,
        actual_length: usize,
    },
    MissingUppercase,
    MissingNumber,
    MissingSpecial,
}

impl std::fmt::Display for PasswordPolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PasswordPolicyError::TooShort {
                min_length,
                actual_length,
            } => {
                write!(
                    f,
                    "Password must be at least {} characters (got {})",
                    min_length, actual_length
                )
            }
            PasswordPolicyError::MissingUppercase => {
                write!(f, "Password must contain at least one uppercase letter")
            }
            PasswordPolicyError::MissingNumber => {
                write!(f, "Password must contain at least one number")
            }
            PasswordPolicyError::MissingSpecial => {
                write!(f, "Password must contain at least one special character")
            }
        }
    }
}

impl std::error::Error for PasswordPolicyError {}

#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_number: bool,
    pub require_special: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            require_uppercase: true,
            require_number: true,
            require_special: true,
        }
    }
}

impl PasswordPolicy {
    pub fn with_min_length(min_length: usize) -> Self {
        Self {
            min_length,
            ..Self::default()
        }
    }

    /// Returns the first rule the password breaks.
    pub fn validate(&self, password: &str) -> Result<(), PasswordPolicyError> {
        let length = password.chars().count();
        if length < self.min_length {
            return Err(PasswordPolicyError::TooShort {
                min_length: self.min_length,
                actual_length: length,
            });
        }

        if self.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
            return Err(PasswordPolicyError::MissingUppercase);
        }

        if self.require_number && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(PasswordPolicyError::MissingNumber);
        }

        if self.require_special && !password.chars().any(|c| c.is_ascii_punctuation()) {
            return Err(PasswordPolicyError::MissingSpecial);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lenient() -> PasswordPolicy {
        PasswordPolicy {
            min_length: 4,
            require_uppercase: false,
            require_number: false,
            require_special: false,
        }
    }

    #[test]
    fn test_strong_password_passes_default_policy() {
        assert!(PasswordPolicy::default().validate("Str0ng!Pass").is_ok());
    }

    #[test]
    fn test_too_short() {
        let err = PasswordPolicy::default().validate("Ab1!").unwrap_err();
        assert_eq!(
            err,
            PasswordPolicyError::TooShort {
                min_length: 8,
                actual_length: 4
            }
        );
        assert_eq!(
            err.to_string(),
            "Password must be at least 8 characters (got 4)"
        );
    }

    #[test]
    fn test_first_violation_is_reported() {
        let policy = PasswordPolicy::default();
        assert_eq!(
            policy.validate("lowercase1!"),
            Err(PasswordPolicyError::MissingUppercase)
        );
        assert_eq!(
            policy.validate("NoDigits!!"),
            Err(PasswordPolicyError::MissingNumber)
        );
        assert_eq!(
            policy.validate("NoSpecial12"),
            Err(PasswordPolicyError::MissingSpecial)
        );
    }

    #[test]
    fn test_lenient_policy() {
        assert!(lenient().validate("abcd").is_ok());
        assert!(lenient().validate("abc").is_err());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let policy = PasswordPolicy::with_min_length(8);
        // 7 characters, more than 8 bytes
        assert!(matches!(
            policy.validate("Ünïc0d!"),
            Err(PasswordPolicyError::TooShort { actual_length: 7, .. })
        ));
    }
}
