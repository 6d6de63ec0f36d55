use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::JwtConfig;
use crate::services::ServiceError;

/// JWT service for token generation and validation
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
    access_token_expiry_minutes: i64,
}

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (username)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Token response returned to client
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();

        // Pin the algorithm; tokens declaring anything else are rejected.
        let mut validation = Validation::new(config.algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        tracing::info!(algorithm = ?config.algorithm, "JWT service initialized");

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: config.algorithm,
            validation,
            access_token_expiry_minutes: config.access_token_expiry_minutes,
        }
    }

    pub fn access_token_ttl(&self) -> Result<Duration, ServiceError> {
        Duration::try_minutes(self.access_token_expiry_minutes).ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!("Access token lifetime out of range"))
        })
    }

    /// Sign a token for `subject` that expires after `ttl`.
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, ServiceError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(ttl).ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!("Token expiry overflows the calendar"))
        })?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to encode token: {}", e)))
    }

    /// Issue an access token with the configured lifetime.
    pub fn issue_access_token(&self, subject: &str) -> Result<TokenResponse, ServiceError> {
        let ttl = self.access_token_ttl()?;
        let access_token = self.issue(subject, ttl)?;

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: ttl.num_seconds(),
        })
    }

    /// Check signature, algorithm and expiry and return the claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, ServiceError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| {
                tracing::debug!(error = %e, "Token rejected");
                ServiceError::InvalidToken
            },
        )?;

        // jsonwebtoken accepts exp == now; an expiry that has been reached is spent.
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(ServiceError::InvalidToken);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn config(algorithm: Algorithm, secret: &str) -> JwtConfig {
        JwtConfig {
            secret: SecretString::new(secret.to_string()),
            algorithm,
            access_token_expiry_minutes: 15,
        }
    }

    fn service() -> JwtService {
        JwtService::new(&config(Algorithm::HS256, "test-secret-key"))
    }

    #[test]
    fn test_issue_and_verify() -> Result<(), anyhow::Error> {
        let jwt = service();
        let token = jwt.issue("alice", Duration::minutes(5))?;
        let claims = jwt.verify(&token)?;

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp - claims.iat, 300);
        Ok(())
    }

    #[test]
    fn test_access_token_response() -> Result<(), anyhow::Error> {
        let jwt = service();
        let response = jwt.issue_access_token("alice")?;

        assert_eq!(response.token_type, "bearer");
        assert_eq!(response.expires_in, 15 * 60);
        assert_eq!(jwt.verify(&response.access_token)?.sub, "alice");
        Ok(())
    }

    #[test]
    fn test_expired_token_is_invalid() -> Result<(), anyhow::Error> {
        let jwt = service();
        let token = jwt.issue("alice", Duration::seconds(-1))?;

        assert!(matches!(jwt.verify(&token), Err(ServiceError::InvalidToken)));
        Ok(())
    }

    #[tokio::test]
    async fn test_token_fails_once_ttl_elapses() -> Result<(), anyhow::Error> {
        let jwt = service();
        let token = jwt.issue("alice", Duration::seconds(1))?;
        assert!(jwt.verify(&token).is_ok());

        tokio::time::sleep(std::time::Duration::from_millis(2100)).await;
        assert!(matches!(jwt.verify(&token), Err(ServiceError::InvalidToken)));
        Ok(())
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error_not_a_panic() {
        let mut huge = config(Algorithm::HS256, "test-secret-key");
        huge.access_token_expiry_minutes = i64::MAX;
        let jwt = JwtService::new(&huge);

        assert!(matches!(jwt.access_token_ttl(), Err(ServiceError::Internal(_))));
        assert!(matches!(
            jwt.issue_access_token("alice"),
            Err(ServiceError::Internal(_))
        ));
        assert!(matches!(
            service().issue("alice", Duration::MAX),
            Err(ServiceError::Internal(_))
        ));
    }

    #[test]
    fn test_wrong_secret_is_invalid() -> Result<(), anyhow::Error> {
        let token = service().issue("alice", Duration::minutes(5))?;
        let other = JwtService::new(&config(Algorithm::HS256, "another-secret"));

        assert!(matches!(other.verify(&token), Err(ServiceError::InvalidToken)));
        Ok(())
    }

    #[test]
    fn test_unexpected_algorithm_is_rejected() -> Result<(), anyhow::Error> {
        // Same secret, different HMAC variant
        let hs384 = JwtService::new(&config(Algorithm::HS384, "test-secret-key"));
        let token = hs384.issue("alice", Duration::minutes(5))?;

        assert!(matches!(service().verify(&token), Err(ServiceError::InvalidToken)));
        Ok(())
    }

    #[test]
    fn test_garbage_and_tampered_tokens() -> Result<(), anyhow::Error> {
        let jwt = service();
        assert!(matches!(jwt.verify("not.a.token"), Err(ServiceError::InvalidToken)));
        assert!(matches!(jwt.verify(""), Err(ServiceError::InvalidToken)));

        // Splice another subject's payload under alice's signature
        let token = jwt.issue("alice", Duration::minutes(5))?;
        let forged = jwt.issue("admin", Duration::minutes(5))?;
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = forged.split('.').nth(1).unwrap_or_default();
        assert!(matches!(
            jwt.verify(&parts.join(".")),
            Err(ServiceError::InvalidToken)
        ));
        Ok(())
    }

    #[test]
    fn test_missing_subject_is_rejected() -> Result<(), anyhow::Error> {
        #[derive(Serialize)]
        struct NoSubject {
            exp: i64,
        }

        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoSubject {
                exp: Utc::now().timestamp() + 300,
            },
            &EncodingKey::from_secret(b"test-secret-key"),
        )?;

        assert!(matches!(service().verify(&token), Err(ServiceError::InvalidToken)));
        Ok(())
    }
}
