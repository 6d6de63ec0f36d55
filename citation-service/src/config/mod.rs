use jsonwebtoken::Algorithm;
use secrecy::{ExposeSecret, SecretString};
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

/// One year.
pub const MAX_ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone)]
pub struct CitationConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub testing: bool,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub summarizer: SummarizerConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Token signing settings. Algorithm and secret are fixed for the life of
/// the process.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub algorithm: Algorithm,
    pub access_token_expiry_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct PasswordConfig {
    pub min_length: usize,
}

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    /// Remote summarisation endpoint. Summaries stay empty when unset.
    pub url: Option<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    /// Accounts promoted to admin at startup, if they exist.
    pub admin_usernames: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub register_attempts: u32,
    pub register_window_seconds: u64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

impl CitationConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = CitationConfig {
            common: common_config,
            environment,
            testing: parse_value("TESTING", &get_env("TESTING", Some("false"), false)?)?,
            service_name: get_env("SERVICE_NAME", Some("citation-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: optional_env("OTEL_EXPORTER_OTLP_ENDPOINT"),
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_value(
                    "DATABASE_MAX_CONNECTIONS",
                    &get_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?,
                )?,
                min_connections: parse_value(
                    "DATABASE_MIN_CONNECTIONS",
                    &get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?,
                )?,
            },
            jwt: JwtConfig {
                // No default in any environment: a missing secret stops startup.
                secret: SecretString::new(get_env("JWT_SECRET_KEY", None, true)?),
                algorithm: parse_algorithm(&get_env("JWT_ALGORITHM", Some("HS256"), is_prod)?)?,
                access_token_expiry_minutes: parse_value(
                    "ACCESS_TOKEN_EXPIRE_MINUTES",
                    &get_env("ACCESS_TOKEN_EXPIRE_MINUTES", Some("15"), is_prod)?,
                )?,
            },
            password: PasswordConfig {
                min_length: parse_value(
                    "PASSWORD_MIN_LENGTH",
                    &get_env("PASSWORD_MIN_LENGTH", Some("8"), is_prod)?,
                )?,
            },
            summarizer: SummarizerConfig {
                url: optional_env("SUMMARIZER_URL"),
                timeout_seconds: parse_value(
                    "SUMMARIZER_TIMEOUT_SECONDS",
                    &get_env("SUMMARIZER_TIMEOUT_SECONDS", Some("30"), is_prod)?,
                )?,
            },
            security: SecurityConfig {
                allowed_origins: split_list(&get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?),
                admin_usernames: optional_env("ADMIN_USERNAMES")
                    .map(|v| split_list(&v))
                    .unwrap_or_default(),
            },
            rate_limit: RateLimitConfig {
                login_attempts: get_env("RATE_LIMIT_LOGIN_ATTEMPTS", Some("5"), is_prod)?
                    .parse()
                    .unwrap_or(5),
                login_window_seconds: get_env(
                    "RATE_LIMIT_LOGIN_WINDOW_SECONDS",
                    Some("900"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(900),
                register_attempts: get_env("RATE_LIMIT_REGISTER_ATTEMPTS", Some("10"), is_prod)?
                    .parse()
                    .unwrap_or(10),
                register_window_seconds: get_env(
                    "RATE_LIMIT_REGISTER_WINDOW_SECONDS",
                    Some("3600"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(3600),
                global_ip_limit: get_env("RATE_LIMIT_GLOBAL_IP_LIMIT", Some("100"), is_prod)?
                    .parse()
                    .unwrap_or(100),
                global_ip_window_seconds: get_env(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(60),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.jwt.secret.expose_secret().trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_SECRET_KEY must not be empty"
            )));
        }

        if !HMAC_ALGORITHMS.contains(&self.jwt.algorithm) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "JWT_ALGORITHM must be one of HS256, HS384, HS512"
            )));
        }

        if self.jwt.access_token_expiry_minutes <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must be positive"
            )));
        }

        if self.jwt.access_token_expiry_minutes > MAX_ACCESS_TOKEN_EXPIRY_MINUTES {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ACCESS_TOKEN_EXPIRE_MINUTES must not exceed {}",
                MAX_ACCESS_TOKEN_EXPIRY_MINUTES
            )));
        }

        if self.password.min_length == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PASSWORD_MIN_LENGTH must be positive"
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_MIN_CONNECTIONS exceeds DATABASE_MAX_CONNECTIONS"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.testing {
                tracing::warn!("TESTING is enabled in production");
            }
        }

        Ok(())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod && default.is_none() {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has an invalid value: {}", key, e))
    })
}

fn parse_algorithm(raw: &str) -> Result<Algorithm, AppError> {
    let algorithm = Algorithm::from_str(raw.trim()).map_err(|_| {
        AppError::ConfigError(anyhow::anyhow!("Unknown JWT_ALGORITHM: {}", raw))
    })?;

    if HMAC_ALGORITHMS.contains(&algorithm) {
        Ok(algorithm)
    } else {
        Err(AppError::ConfigError(anyhow::anyhow!(
            "JWT_ALGORITHM {:?} is not a shared-secret algorithm",
            algorithm
        )))
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
