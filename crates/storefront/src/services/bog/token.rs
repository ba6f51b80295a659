//! OAuth2 access token cache for the BOG API.
//!
//! One token is shared by the whole process. A token is served from cache
//! until it is within `skew` of expiring; after that the next caller
//! refreshes it while everyone else waits on the same lock and then reuses
//! the new token. At most one token request is in flight at any time.

use std::future::Future;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::instrument;

use super::{BogError, error_from_response};

/// Refresh this long before the gateway's expiry.
pub const DEFAULT_SKEW: Duration = Duration::from_secs(60);

/// A bearer token and when it stops being valid.
#[derive(Clone)]
pub struct AccessToken {
    value: SecretString,
    expires_at: Instant,
}

impl AccessToken {
    /// A token valid for `expires_in` from now.
    #[must_use]
    pub fn new(value: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            value: SecretString::from(value.into()),
            expires_at: Instant::now() + expires_in,
        }
    }

    /// The raw bearer value.
    #[must_use]
    pub fn secret(&self) -> &str {
        self.value.expose_secret()
    }

    /// Check if the token will expire within `skew`.
    #[must_use]
    pub fn expires_within(&self, skew: Duration) -> bool {
        Instant::now() + skew >= self.expires_at
    }

    fn same_as(&self, other: &Self) -> bool {
        self.value.expose_secret() == other.value.expose_secret()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Where fresh tokens come from.
pub trait TokenSource: Send + Sync {
    /// Request a new token from the authorization server.
    fn fetch_token(&self) -> impl Future<Output = Result<AccessToken, BogError>> + Send;
}

/// Cache of a single bearer token.
pub struct TokenCache<S> {
    source: S,
    skew: Duration,
    slot: Mutex<Option<AccessToken>>,
}

impl<S: TokenSource> TokenCache<S> {
    #[must_use]
    pub fn new(source: S, skew: Duration) -> Self {
        Self {
            source,
            skew,
            slot: Mutex::new(None),
        }
    }

    /// A token that is valid for at least `skew`, refreshing if needed.
    ///
    /// # Errors
    ///
    /// Returns the source's error if a refresh was needed and failed. The
    /// cache is left empty so the next caller tries again.
    pub async fn token(&self) -> Result<AccessToken, BogError> {
        let mut slot = self.slot.lock().await;

        if let Some(token) = slot.as_ref()
            && !token.expires_within(self.skew)
        {
            return Ok(token.clone());
        }

        *slot = None;
        let token = self.source.fetch_token().await?;
        tracing::debug!("BOG access token refreshed");
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token, but only if it is still `stale`.
    ///
    /// A caller holding an old token must not evict a newer one that another
    /// request already fetched.
    pub async fn invalidate(&self, stale: &AccessToken) {
        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(|cached| cached.same_as(stale)) {
            *slot = None;
        }
    }

    /// Run `call` with a token, retrying once with a fresh token if it
    /// fails with [`BogError::Unauthorized`].
    ///
    /// # Errors
    ///
    /// Returns the token error, or `call`'s error from the last attempt.
    pub async fn with_token<T, F, Fut>(&self, mut call: F) -> Result<T, BogError>
    where
        F: FnMut(AccessToken) -> Fut,
        Fut: Future<Output = Result<T, BogError>>,
    {
        let token = self.token().await?;
        match call(token.clone()).await {
            Err(BogError::Unauthorized) => {
                tracing::warn!("BOG rejected the cached token, retrying with a fresh one");
                self.invalidate(&token).await;
                let fresh = self.token().await?;
                call(fresh).await
            }
            other => other,
        }
    }
}

/// Client-credentials grant against the BOG OAuth2 endpoint.
pub struct OAuthTokenSource {
    http: reqwest::Client,
    url: String,
    client_id: String,
    client_secret: SecretString,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Lifetime in seconds.
    expires_in: u64,
    #[serde(default)]
    token_type: Option<String>,
}

impl OAuthTokenSource {
    #[must_use]
    pub const fn new(
        http: reqwest::Client,
        url: String,
        client_id: String,
        client_secret: SecretString,
    ) -> Self {
        Self {
            http,
            url,
            client_id,
            client_secret,
        }
    }
}

impl TokenSource for OAuthTokenSource {
    #[instrument(skip(self), fields(client_id = %self.client_id))]
    async fn fetch_token(&self) -> Result<AccessToken, BogError> {
        let response = self
            .http
            .post(&self.url)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            // A 401 here means bad client credentials, not a stale token,
            // so it must not trigger the retry in `with_token`.
            return Err(match error_from_response(response).await {
                BogError::Unauthorized => BogError::Api {
                    status: 401,
                    message: "invalid BOG client credentials".to_string(),
                },
                other => other,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| BogError::Parse(format!("token response: {e}")))?;

        if let Some(kind) = body.token_type.as_deref()
            && !kind.eq_ignore_ascii_case("bearer")
        {
            return Err(BogError::Parse(format!("unexpected token type '{kind}'")));
        }

        Ok(AccessToken::new(
            body.access_token,
            Duration::from_secs(body.expires_in),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::task::JoinSet;

    use super::*;

    /// Hands out `token-1`, `token-2`, ... and counts requests.
    struct CountingSource {
        calls: AtomicUsize,
        lifetime: Duration,
        fail_first: bool,
        delay: Duration,
    }

    impl CountingSource {
        fn new(lifetime: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                lifetime,
                fail_first: false,
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> Result<AccessToken, BogError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail_first && n == 1 {
                return Err(BogError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            Ok(AccessToken::new(format!("token-{n}"), self.lifetime))
        }
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_fresh_token_is_served_from_cache() {
        let cache = TokenCache::new(CountingSource::new(HOUR), DEFAULT_SKEW);

        let first = cache.token().await.unwrap();
        let second = cache.token().await.unwrap();

        assert_eq!(first.secret(), "token-1");
        assert_eq!(second.secret(), "token-1");
        assert_eq!(cache.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_token_inside_skew_is_refreshed() {
        // 30s lifetime is already inside the 60s skew.
        let cache = TokenCache::new(CountingSource::new(Duration::from_secs(30)), DEFAULT_SKEW);

        assert_eq!(cache.token().await.unwrap().secret(), "token-1");
        assert_eq!(cache.token().await.unwrap().secret(), "token-2");
        assert_eq!(cache.source.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_refresh() {
        let mut source = CountingSource::new(HOUR);
        source.delay = Duration::from_millis(50);
        let cache = Arc::new(TokenCache::new(source, DEFAULT_SKEW));

        let mut tasks = JoinSet::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            tasks.spawn(async move { cache.token().await.unwrap().secret().to_string() });
        }

        let mut seen = Vec::new();
        while let Some(result) = tasks.join_next().await {
            seen.push(result.unwrap());
        }

        assert_eq!(seen.len(), 16);
        assert!(seen.iter().all(|t| t == "token-1"));
        assert_eq!(cache.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_invalidates_and_retries_once() {
        let cache = TokenCache::new(CountingSource::new(HOUR), DEFAULT_SKEW);
        let attempts = AtomicUsize::new(0);

        let used = cache
            .with_token(|token| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(BogError::Unauthorized)
                    } else {
                        Ok(token.secret().to_string())
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(used, "token-2");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(cache.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_second_unauthorized_is_returned() {
        let cache = TokenCache::new(CountingSource::new(HOUR), DEFAULT_SKEW);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), BogError> = cache
            .with_token(|_token| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(BogError::Unauthorized) }
            })
            .await;

        assert!(matches!(result, Err(BogError::Unauthorized)));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let cache = TokenCache::new(CountingSource::new(HOUR), DEFAULT_SKEW);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), BogError> = cache
            .with_token(|_token| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(BogError::Api {
                        status: 500,
                        message: "boom".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(BogError::Api { status: 500, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(cache.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_with_outdated_token_keeps_newer_one() {
        let cache = TokenCache::new(CountingSource::new(HOUR), DEFAULT_SKEW);

        let old = cache.token().await.unwrap();
        cache.invalidate(&old).await;
        let new = cache.token().await.unwrap();
        assert_eq!(new.secret(), "token-2");

        // A slow request still holding token-1 reports a 401.
        cache.invalidate(&old).await;

        assert_eq!(cache.token().await.unwrap().secret(), "token-2");
        assert_eq!(cache.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_is_retried_by_next_caller() {
        let mut source = CountingSource::new(HOUR);
        source.fail_first = true;
        let cache = TokenCache::new(source, DEFAULT_SKEW);

        assert!(matches!(
            cache.token().await,
            Err(BogError::Api { status: 503, .. })
        ));
        assert_eq!(cache.token().await.unwrap().secret(), "token-2");
        assert_eq!(cache.source.calls(), 2);
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = AccessToken::new("super-secret-bearer", HOUR);
        let debug = format!("{token:?}");
        assert!(!debug.contains("super-secret-bearer"));
        assert!(debug.contains("[REDACTED]"));
    }
}
