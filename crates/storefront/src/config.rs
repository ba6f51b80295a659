//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string
//! - `STOREFRONT_BASE_URL` - Public URL of this API (used for the BOG callback URL)
//! - `STOREFRONT_FRONTEND_URL` - Public URL of the shop frontend (links in emails, payment redirects)
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `BOG_CLIENT_ID` - BOG OAuth client ID
//! - `BOG_CLIENT_SECRET` - BOG OAuth client secret
//! - `BOG_CALLBACK_PUBLIC_KEY` - PEM public key used to verify payment callbacks
//! - `RESEND_API_KEY` - Resend API key
//! - `CLOUDINARY_CLOUD_NAME` - Cloudinary cloud name
//! - `CLOUDINARY_API_KEY` - Cloudinary API key
//! - `CLOUDINARY_API_SECRET` - Cloudinary API secret
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_CORS_ORIGINS` - Comma-separated allowed origins (default: the frontend URL)
//! - `BOG_OAUTH_URL` - Token endpoint (default: BOG production realm)
//! - `BOG_API_URL` - Payments API base (default: `https://api.bog.ge`)
//! - `BOG_LANGUAGE` - Payment page language, `ka` or `en` (default: ka)
//! - `RESEND_FROM` - Sender address (default: `Oakhouse <no-reply@oakhouse.ge>`)
//! - `STORE_INBOX` - Where contact form messages go (default: `info@oakhouse.ge`)
//! - `CLOUDINARY_FOLDER` - Upload folder (default: products)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const DEFAULT_BOG_OAUTH_URL: &str =
    "https://oauth2.bog.ge/auth/realms/bog/protocol/openid-connect/token";
const DEFAULT_BOG_API_URL: &str = "https://api.bog.ge";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this API
    pub base_url: String,
    /// Public base URL of the shop frontend
    pub frontend_url: String,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Session signing secret
    pub session_secret: SecretString,
    pub bog: BogConfig,
    pub resend: ResendConfig,
    pub cloudinary: CloudinaryConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Bank of Georgia payment gateway configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct BogConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    /// OAuth2 token endpoint
    pub oauth_url: String,
    /// Payments API base URL, without trailing slash
    pub api_url: String,
    /// PEM-encoded RSA public key for `Callback-Signature`
    pub callback_public_key: String,
    /// `Accept-Language` for the hosted payment page
    pub language: String,
}

impl std::fmt::Debug for BogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BogConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("oauth_url", &self.oauth_url)
            .field("api_url", &self.api_url)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

/// Resend transactional email configuration.
#[derive(Clone)]
pub struct ResendConfig {
    pub api_key: SecretString,
    /// `From` header for every outgoing message
    pub from: String,
    /// Recipient of contact form submissions
    pub store_inbox: String,
}

impl std::fmt::Debug for ResendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendConfig")
            .field("api_key", &"[REDACTED]")
            .field("from", &self.from)
            .field("store_inbox", &self.store_inbox)
            .finish()
    }
}

/// Cloudinary image upload configuration.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
    pub folder: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.folder)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_url("STOREFRONT_BASE_URL")?;
        let frontend_url = get_url("STOREFRONT_FRONTEND_URL")?;
        let cors_origins = get_optional_env("STOREFRONT_CORS_ORIGINS")
            .map_or_else(|| vec![frontend_url.clone()], |raw| parse_list(&raw));
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let bog = BogConfig::from_env()?;
        let resend = ResendConfig::from_env()?;
        let cloudinary = CloudinaryConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            frontend_url,
            cors_origins,
            session_secret,
            bog,
            resend,
            cloudinary,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// URL BOG posts payment callbacks to.
    #[must_use]
    pub fn bog_callback_url(&self) -> String {
        format!("{}/api/payments/bog/callback", self.base_url)
    }
}

impl BogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let language = get_env_or_default("BOG_LANGUAGE", "ka");
        if !matches!(language.as_str(), "ka" | "en") {
            return Err(ConfigError::InvalidEnvVar(
                "BOG_LANGUAGE".to_string(),
                format!("expected 'ka' or 'en', got '{language}'"),
            ));
        }

        Ok(Self {
            client_id: get_required_env("BOG_CLIENT_ID")?,
            client_secret: get_validated_secret("BOG_CLIENT_SECRET")?,
            oauth_url: get_env_or_default("BOG_OAUTH_URL", DEFAULT_BOG_OAUTH_URL),
            api_url: trim_trailing_slash(&get_env_or_default("BOG_API_URL", DEFAULT_BOG_API_URL)),
            callback_public_key: normalize_pem(&get_required_env("BOG_CALLBACK_PUBLIC_KEY")?),
            language,
        })
    }
}

impl ResendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: get_required_secret("RESEND_API_KEY")?,
            from: get_env_or_default("RESEND_FROM", "Oakhouse <no-reply@oakhouse.ge>"),
            store_inbox: get_env_or_default("STORE_INBOX", "info@oakhouse.ge"),
        })
    }
}

impl CloudinaryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cloud_name: get_required_env("CLOUDINARY_CLOUD_NAME")?,
            api_key: get_required_env("CLOUDINARY_API_KEY")?,
            api_secret: get_required_secret("CLOUDINARY_API_SECRET")?,
            folder: get_env_or_default("CLOUDINARY_FOLDER", "products"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get a required absolute URL, stored without a trailing slash.
fn get_url(key: &str) -> Result<String, ConfigError> {
    let value = get_required_env(key)?;
    url::Url::parse(&value)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok(trim_trailing_slash(&value))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn trim_trailing_slash(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(trim_trailing_slash)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Hosting dashboards often store multi-line values with literal `\n`.
fn normalize_pem(raw: &str) -> String {
    raw.trim().replace("\\n", "\n")
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// A fully populated config for unit tests. Nothing here is reachable.
    pub(crate) fn test_config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/oakhouse_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            cors_origins: vec!["http://localhost:5173".to_string()],
            session_secret: SecretString::from("k2V9#qLm8!Zr4@Tx7$Wb1&Hn5^Pc3*Jd"),
            bog: BogConfig {
                client_id: "10001".to_string(),
                client_secret: SecretString::from("bog_client_secret_value"),
                oauth_url: "http://127.0.0.1:9/token".to_string(),
                api_url: "http://127.0.0.1:9".to_string(),
                callback_public_key: include_str!("../testdata/bog_callback_public.pem").to_string(),
                language: "ka".to_string(),
            },
            resend: ResendConfig {
                api_key: SecretString::from("re_test_key_value"),
                from: "Oakhouse <no-reply@oakhouse.ge>".to_string(),
                store_inbox: "info@oakhouse.ge".to_string(),
            },
            cloudinary: CloudinaryConfig {
                cloud_name: "oakhouse".to_string(),
                api_key: "123456789012345".to_string(),
                api_secret: SecretString::from("cloudinary_secret_value"),
                folder: "products".to_string(),
            },
            sentry_dsn: None,
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_socket_addr_and_callback_url() {
        let config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
        assert_eq!(
            config.bog_callback_url(),
            "http://localhost:3000/api/payments/bog/callback"
        );
    }

    #[test]
    fn test_parse_list_trims_entries() {
        assert_eq!(
            parse_list(" https://oakhouse.ge/ ,https://www.oakhouse.ge,, "),
            vec!["https://oakhouse.ge", "https://www.oakhouse.ge"]
        );
    }

    #[test]
    fn test_normalize_pem_expands_escaped_newlines() {
        let pem = normalize_pem("-----BEGIN PUBLIC KEY-----\\nAAAA\\n-----END PUBLIC KEY-----\n");
        assert_eq!(pem, "-----BEGIN PUBLIC KEY-----\nAAAA\n-----END PUBLIC KEY-----");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = test_config();
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("10001"));
        assert!(debug_output.contains("oakhouse"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("bog_client_secret_value"));
        assert!(!debug_output.contains("re_test_key_value"));
        assert!(!debug_output.contains("cloudinary_secret_value"));
    }
}
