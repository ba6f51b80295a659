//! Admin account management.
//!
//! There is no sign-up path for admins: an account registers through the
//! shop like any customer and is then promoted here.

use oakhouse_core::{Email, EmailError};
use oakhouse_storefront::db::{RepositoryError, UserRepository};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// The email is malformed.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No account with this email.
    #[error("No user with email {0}; register through the shop first")]
    UserNotFound(String),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

/// Grant or revoke admin rights for the account with `email`.
///
/// Takes effect on the user's next request; admin rights are not cached in
/// sessions.
///
/// # Errors
///
/// Returns `AdminError::UserNotFound` if no account has this email.
pub async fn set_admin(email: &str, is_admin: bool) -> Result<(), AdminError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_admin(&email, is_admin)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UserNotFound(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    if is_admin {
        tracing::info!(user_id = %user.id, email = %user.email, "Admin rights granted");
    } else {
        tracing::info!(user_id = %user.id, email = %user.email, "Admin rights revoked");
    }
    Ok(())
}
