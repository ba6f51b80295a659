//! Email verification tokens.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use oakhouse_core::Email;

use super::RepositoryError;

/// A stored verification token.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationToken {
    pub email: Email,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl VerificationToken {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Repository for `storefront.verification_token`.
pub struct VerificationTokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VerificationTokenRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Issue a token for `email`, deleting any earlier ones so only the
    /// newest link works.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn replace(
        &self,
        email: &Email,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM storefront.verification_token WHERE email = $1")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
            INSERT INTO storefront.verification_token (email, token, expires_at)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(email)
        .bind(token)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove and return a token. Consumed whether or not it has expired.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn take(&self, token: &str) -> Result<Option<VerificationToken>, RepositoryError> {
        let row = sqlx::query_as::<_, VerificationToken>(
            r"
            DELETE FROM storefront.verification_token
            WHERE token = $1
            RETURNING email, token, expires_at
            ",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_is_expired_boundary() {
        let now = Utc::now();
        let token = VerificationToken {
            email: Email::parse("nino@example.ge").unwrap(),
            token: "abc".to_string(),
            expires_at: now,
        };
        assert!(token.is_expired(now));
        assert!(!token.is_expired(now - Duration::seconds(1)));
    }
}
