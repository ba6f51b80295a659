//! Session-related types.

use serde::{Deserialize, Serialize};

use oakhouse_core::{Email, UserId};

use super::User;

/// Session-stored user identity.
///
/// Admin rights are not stored here; `RequireAdmin` reads them from the
/// database on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
