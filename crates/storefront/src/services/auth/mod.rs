//! Authentication service.
//!
//! Password accounts with email verification and password reset links.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use rand::RngCore;
use sqlx::PgPool;

use oakhouse_core::Email;

use crate::db::{RepositoryError, UserRepository, VerificationTokenRepository};
use crate::models::User;
use crate::services::email::EmailClient;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length, bounds argon2 work per request.
const MAX_PASSWORD_LENGTH: usize = 128;

/// How long an email verification link stays valid.
const VERIFICATION_TTL: Duration = Duration::hours(24);

/// How long a password reset link stays valid.
const RESET_TTL: Duration = Duration::hours(1);

/// Authentication service.
///
/// Handles registration, login, email verification, and password reset.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: VerificationTokenRepository<'a>,
    email: &'a EmailClient,
    frontend_url: &'a str,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: &'a EmailClient, frontend_url: &'a str) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens: VerificationTokenRepository::new(pool),
            email,
            frontend_url,
        }
    }

    // =========================================================================
    // Registration & Login
    // =========================================================================

    /// Register a new, unverified user and email them a verification link.
    ///
    /// The account exists even if the email fails to send; the user can ask
    /// for a new link.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
        let name = validate_name(name)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(&email, name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");

        if let Err(e) = self.send_verification(&user).await {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send verification email");
        }

        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::EmailNotVerified` if the password is right but the
    /// address was never confirmed.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_verified() {
            return Err(AuthError::EmailNotVerified);
        }

        Ok(user)
    }

    // =========================================================================
    // Email Verification
    // =========================================================================

    /// Consume a verification token and mark its email as verified.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is unknown or expired.
    pub async fn verify_email(&self, token: &str) -> Result<User, AuthError> {
        let record = self
            .tokens
            .take(token.trim())
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if record.is_expired(Utc::now()) {
            return Err(AuthError::InvalidToken);
        }

        self.users
            .mark_verified(&record.email)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::InvalidToken,
                other => AuthError::Repository(other),
            })?;

        let user = self
            .users
            .get_by_email(&record.email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(user)
    }

    /// Send a fresh verification link, invalidating earlier ones.
    ///
    /// Unknown addresses succeed silently so the endpoint can't be used to
    /// probe for accounts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlreadyVerified` if the account is already verified.
    /// Returns `AuthError::Email` if the email fails to send.
    pub async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;

        let Some(user) = self.users.get_by_email(&email).await? else {
            tracing::debug!("Verification requested for unknown email");
            return Ok(());
        };

        if user.is_verified() {
            return Err(AuthError::AlreadyVerified);
        }

        self.send_verification(&user).await
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Email a password reset link if the account exists.
    ///
    /// Always succeeds for well-formed addresses; delivery failures are logged.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::Repository` if the database operation fails.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;

        let Some(user) = self.users.get_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_token();
        self.users
            .set_reset_token(user.id, &token, Utc::now() + RESET_TTL)
            .await?;

        let link = format!("{}/reset-password?token={token}", self.frontend_url);
        if let Err(e) = self
            .email
            .send_password_reset(user.email.as_str(), &user.name, &link)
            .await
        {
            tracing::error!(user_id = %user.id, error = %e, "Failed to send password reset email");
        }

        Ok(())
    }

    /// Set a new password using a reset token. The token is single use.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the new password doesn't meet requirements.
    /// Returns `AuthError::InvalidToken` if the token is unknown or expired.
    pub async fn reset_password(&self, token: &str, password: &str) -> Result<(), AuthError> {
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user_id = self
            .users
            .reset_password(token.trim(), &password_hash)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        tracing::info!(user_id = %user_id, "Password reset");
        Ok(())
    }

    async fn send_verification(&self, user: &User) -> Result<(), AuthError> {
        let token = generate_token();
        self.tokens
            .replace(&user.email, &token, Utc::now() + VERIFICATION_TTL)
            .await?;

        let link = format!("{}/verify-email?token={token}", self.frontend_url);
        self.email
            .send_verification(user.email.as_str(), &user.name, &link)
            .await?;

        Ok(())
    }
}

/// 32 random bytes, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidInput("name is required".to_string()));
    }
    if name.chars().count() > 100 {
        return Err(AuthError::InvalidInput(
            "name must be at most 100 characters".to_string(),
        ));
    }
    Ok(name)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_password_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password(&"x".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Nino  ").unwrap(), "Nino");
        assert!(matches!(validate_name("   "), Err(AuthError::InvalidInput(_))));
    }

    #[test]
    fn test_generate_token_is_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
