//! Session middleware configuration.
//!
//! Customer logins are kept in `PostgreSQL` via tower-sessions. The session
//! only stores the user's id and email; see [`CurrentUser`].
//!
//! The API and the shop frontend are served from the same site
//! (`api.oakhouse.ge` and `oakhouse.ge`), so a `Lax` cookie is sent on the
//! frontend's credentialed `fetch` calls.
//!
//! [`CurrentUser`]: crate::models::CurrentUser

use sqlx::PgPool;
use tower_sessions::cookie::{SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "oakhouse_session";

/// Sessions expire after 30 days without a request.
const SESSION_IDLE_DAYS: i64 = 30;

/// Create the session layer with `PostgreSQL` store.
///
/// The `tower_sessions.session` table is created by the storefront
/// migrations, not by the store at runtime.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_IDLE_DAYS)))
        .with_secure(secure_cookies(&config.base_url))
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Mark cookies `Secure` whenever the API is served over HTTPS.
fn secure_cookies(base_url: &str) -> bool {
    base_url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_cookies_follow_scheme() {
        assert!(secure_cookies("https://api.oakhouse.ge"));
        assert!(!secure_cookies("http://localhost:3000"));
    }
}
