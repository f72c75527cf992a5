/// Configuration management for the Minigram API
///
/// All settings come from environment variables (a `.env` file is loaded by
/// `main` beforehand). Unparseable numeric values are a startup error.
use s3_utils::S3Config;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Session token verification
    pub auth: AuthConfig,
    /// Object storage for post images and avatars
    pub storage: S3Config,
    /// Upload and paging limits
    pub limits: LimitsConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
    /// Number of actix workers
    pub workers: usize,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Apply embedded migrations on startup
    pub run_migrations: bool,
}

/// Session token verification settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 shared secret
    #[serde(skip_serializing)]
    pub jwt_secret: Option<String>,
    /// RS256 public key in PEM form
    pub jwt_public_key_pem: Option<String>,
    /// Required `iss` claim, if any
    pub jwt_issuer: Option<String>,
    /// Cookie consulted when no `Authorization` header is sent
    pub session_cookie: String,
    /// Prefix identifying identity-provider ids in route parameters
    pub external_id_prefix: String,
}

/// Upload and paging limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_image_bytes: usize,
    pub feed_default_limit: i64,
    pub feed_max_limit: i64,
    pub search_default_limit: i64,
    pub search_max_limit: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 5 * 1024 * 1024,
            feed_default_limit: 10,
            feed_max_limit: 50,
            search_default_limit: 20,
            search_max_limit: 50,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let is_production = app_env.eq_ignore_ascii_case("production");
        let defaults = LimitsConfig::default();

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("MINIGRAM_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("MINIGRAM_PORT", 8080)?,
                workers: parse_env_or_default("MINIGRAM_WORKERS", 4)?,
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if is_production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if is_production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgres://localhost/minigram".to_string()),
                max_connections: parse_env_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: parse_env_or_default("DATABASE_MIN_CONNECTIONS", 2)?,
                acquire_timeout_secs: parse_env_or_default("DATABASE_ACQUIRE_TIMEOUT_SECS", 10)?,
                run_migrations: parse_env_or_default("DATABASE_RUN_MIGRATIONS", true)?,
            },
            auth: {
                let auth = AuthConfig {
                    jwt_secret: non_empty_env("AUTH_JWT_SECRET"),
                    jwt_public_key_pem: non_empty_env("AUTH_JWT_PUBLIC_KEY_PEM"),
                    jwt_issuer: non_empty_env("AUTH_JWT_ISSUER"),
                    session_cookie: std::env::var("AUTH_SESSION_COOKIE")
                        .unwrap_or_else(|_| "__session".to_string()),
                    external_id_prefix: std::env::var("EXTERNAL_ID_PREFIX")
                        .unwrap_or_else(|_| "user_".to_string()),
                };

                if auth.jwt_secret.is_none() && auth.jwt_public_key_pem.is_none() {
                    return Err(
                        "One of AUTH_JWT_SECRET or AUTH_JWT_PUBLIC_KEY_PEM must be set".to_string(),
                    );
                }

                auth
            },
            storage: S3Config::from_env().map_err(|e| e.to_string())?,
            limits: LimitsConfig {
                max_image_bytes: parse_positive_env_or_default(
                    "UPLOAD_MAX_IMAGE_BYTES",
                    defaults.max_image_bytes,
                )?,
                feed_default_limit: parse_positive_env_or_default(
                    "FEED_DEFAULT_LIMIT",
                    defaults.feed_default_limit,
                )?,
                feed_max_limit: parse_positive_env_or_default(
                    "FEED_MAX_LIMIT",
                    defaults.feed_max_limit,
                )?,
                search_default_limit: parse_positive_env_or_default(
                    "SEARCH_DEFAULT_LIMIT",
                    defaults.search_default_limit,
                )?,
                search_max_limit: parse_positive_env_or_default(
                    "SEARCH_MAX_LIMIT",
                    defaults.search_max_limit,
                )?,
            },
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}

/// Like [`parse_env_or_default`], but zero and negative values are rejected
fn parse_positive_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: FromStr + PartialOrd + Default + Display,
    T::Err: Display,
{
    let value = parse_env_or_default(key, default)?;
    if value <= T::default() {
        return Err(format!("{} must be a positive integer, got {}", key, value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_or_default_uses_default_when_unset() {
        let value: i64 = parse_env_or_default("MINIGRAM_TEST_UNSET_LIMIT", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_env_or_default_rejects_garbage() {
        std::env::set_var("MINIGRAM_TEST_BAD_PORT", "eighty");
        let result: Result<u16, String> = parse_env_or_default("MINIGRAM_TEST_BAD_PORT", 8080);
        std::env::remove_var("MINIGRAM_TEST_BAD_PORT");

        let err = result.unwrap_err();
        assert!(err.contains("MINIGRAM_TEST_BAD_PORT"));
    }

    #[test]
    fn test_parse_env_or_default_reads_value() {
        std::env::set_var("MINIGRAM_TEST_FEED_LIMIT", " 25 ");
        let value: i64 = parse_env_or_default("MINIGRAM_TEST_FEED_LIMIT", 10).unwrap();
        std::env::remove_var("MINIGRAM_TEST_FEED_LIMIT");

        assert_eq!(value, 25);
    }

    #[test]
    fn test_limits_must_be_positive() {
        std::env::set_var("MINIGRAM_TEST_ZERO_MAX_LIMIT", "0");
        let zero: Result<i64, String> =
            parse_positive_env_or_default("MINIGRAM_TEST_ZERO_MAX_LIMIT", 50);
        std::env::remove_var("MINIGRAM_TEST_ZERO_MAX_LIMIT");
        assert!(zero.unwrap_err().contains("MINIGRAM_TEST_ZERO_MAX_LIMIT"));

        std::env::set_var("MINIGRAM_TEST_NEGATIVE_LIMIT", "-3");
        let negative: Result<i64, String> =
            parse_positive_env_or_default("MINIGRAM_TEST_NEGATIVE_LIMIT", 10);
        std::env::remove_var("MINIGRAM_TEST_NEGATIVE_LIMIT");
        assert!(negative.is_err());

        std::env::set_var("MINIGRAM_TEST_ZERO_IMAGE_BYTES", "0");
        let bytes: Result<usize, String> =
            parse_positive_env_or_default("MINIGRAM_TEST_ZERO_IMAGE_BYTES", 1024);
        std::env::remove_var("MINIGRAM_TEST_ZERO_IMAGE_BYTES");
        assert!(bytes.is_err());

        let unset: usize =
            parse_positive_env_or_default("MINIGRAM_TEST_UNSET_IMAGE_BYTES", 1024).unwrap();
        assert_eq!(unset, 1024);
    }

    #[test]
    fn test_default_limits() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.max_image_bytes, 5_242_880);
        assert_eq!(limits.feed_default_limit, 10);
        assert_eq!(limits.search_default_limit, 20);
    }
}
