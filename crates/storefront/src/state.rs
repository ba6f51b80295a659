//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::services::bog::{BogClient, BogError, CallbackVerifier};
use crate::services::catalog::ProductCache;
use crate::services::cloudinary::{CloudinaryClient, CloudinaryError};
use crate::services::email::{EmailClient, EmailError};

/// Error creating the shared API clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("BOG client: {0}")]
    Bog(#[from] BogError),
    #[error("email client: {0}")]
    Email(#[from] EmailError),
    #[error("cloudinary client: {0}")]
    Cloudinary(#[from] CloudinaryError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    bog: BogClient,
    callback_verifier: CallbackVerifier,
    email: EmailClient,
    cloudinary: CloudinaryClient,
    products: ProductCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if an API client can't be built or the BOG callback
    /// key is not a valid RSA public key.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let bog = BogClient::new(&config.bog)?;
        let callback_verifier = CallbackVerifier::from_pem(&config.bog.callback_public_key)?;
        let email = EmailClient::new(&config.resend)?;
        let cloudinary = CloudinaryClient::new(&config.cloudinary)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                bog,
                callback_verifier,
                email,
                cloudinary,
                products: ProductCache::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the BOG payments client.
    #[must_use]
    pub fn bog(&self) -> &BogClient {
        &self.inner.bog
    }

    #[must_use]
    pub fn callback_verifier(&self) -> &CallbackVerifier {
        &self.inner.callback_verifier
    }

    /// Get a reference to the Resend client.
    #[must_use]
    pub fn email(&self) -> &EmailClient {
        &self.inner.email
    }

    #[must_use]
    pub fn cloudinary(&self) -> &CloudinaryClient {
        &self.inner.cloudinary
    }

    /// Get a reference to the product read cache.
    #[must_use]
    pub fn products(&self) -> &ProductCache {
        &self.inner.products
    }
}
