//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use oakhouse_core::{Email, UserId};

/// A customer or admin account.
///
/// Never carries the password hash; see `UserRepository::get_with_password`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    /// When the address was confirmed, `None` until then.
    pub email_verified: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.email_verified.is_some()
    }
}
