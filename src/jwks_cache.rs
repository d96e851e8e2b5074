use std::time::Duration;
use std::time::Instant;

use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::jwk::JwkSet;
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::warn;

use crate::config::ValidatorConfig;
use crate::error::fetch_failure_message;
use crate::error::Error;
use crate::error::Result;

struct CachedJwks {
    jwks: JwkSet,
    fetched_at: Instant,
}

impl CachedJwks {
    fn new(jwks: JwkSet) -> Self {
        Self {
            jwks,
            fetched_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() >= ttl
    }

    fn in_cooldown(&self, cooldown: Duration) -> bool {
        self.fetched_at.elapsed() < cooldown
    }
}

/// Outcome of the most recent fetch that did not produce a key set
struct FailedFetch {
    message: String,
    failed_at: Instant,
}

impl FailedFetch {
    fn in_cooldown(&self, cooldown: Duration) -> bool {
        self.failed_at.elapsed() < cooldown
    }
}

#[derive(Default)]
struct CacheState {
    jwks: Option<CachedJwks>,
    last_failure: Option<FailedFetch>,
    /// Bumped on every fetch, successful or not
    attempts: u64,
}

/// Cache for the team's signing keys, looked up by key id
///
/// The key set is fetched lazily on first use, refetched once it is older
/// than the TTL, and refreshed when a token names a key id the cached set
/// does not contain (at most once per cooldown). Callers waiting on a
/// refresh share its outcome, including a failed fetch.
pub(crate) struct JwksCache {
    state: RwLock<CacheState>,
    certs_url: String,
    ttl: Duration,
    refresh_cooldown: Duration,
    fetch_timeout: Duration,
    client: Client,
}

impl JwksCache {
    /// Create a new JWKS cache for the certs endpoint of the configured team
    pub(crate) fn new(config: &ValidatorConfig) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            certs_url: config.certs_url(),
            ttl: config.jwks_cache_ttl,
            refresh_cooldown: config.refresh_cooldown,
            fetch_timeout: config.fetch_timeout,
            client: config.http_client.clone().unwrap_or_default(),
        }
    }

    /// Get the key with the given id, fetching the key set from the network if
    /// it is not cached, expired, or does not know the id
    pub(crate) async fn get_key(&self, kid: &str) -> Result<Jwk> {
        let seen_attempts = match self.try_get_cached(kid).await {
            Ok(found) => return found,
            Err(attempts) => attempts,
        };

        self.refresh(kid, seen_attempts).await
    }

    /// Answer from the cache if it can settle the lookup without a fetch,
    /// otherwise hand back the fetch count observed
    async fn try_get_cached(&self, kid: &str) -> std::result::Result<Result<Jwk>, u64> {
        let state = self.state.read().await;
        self.lookup(&state, kid).ok_or(state.attempts)
    }

    fn lookup(&self, state: &CacheState, kid: &str) -> Option<Result<Jwk>> {
        let fresh = state
            .jwks
            .as_ref()
            .filter(|cached| !cached.is_expired(self.ttl));

        if let Some(jwk) = fresh.and_then(|cached| cached.jwks.find(kid)) {
            return Some(Ok(jwk.clone()));
        }

        if let Some(failure) = state
            .last_failure
            .as_ref()
            .filter(|failure| failure.in_cooldown(self.refresh_cooldown))
        {
            debug!(kid, "Last key set fetch failed, refresh still in cooldown");
            return Some(Err(Error::JwksCacheError(failure.message.clone())));
        }

        match fresh {
            Some(cached) if cached.in_cooldown(self.refresh_cooldown) => {
                debug!(kid, "Unknown key id, refresh still in cooldown");
                Some(Err(Error::KeyNotMatchInJwks))
            }
            _ => None,
        }
    }

    /// Refetch the key set and look the key id up in the fresh copy
    async fn refresh(&self, kid: &str, seen_attempts: u64) -> Result<Jwk> {
        let mut state = self.state.write().await;

        // Another task fetched while we waited for the lock, share its outcome
        if state.attempts != seen_attempts {
            return Self::outcome_of_last_fetch(&state, kid);
        }

        if let Some(found) = self.lookup(&state, kid) {
            return found;
        }

        state.attempts += 1;
        match self.fetch_jwks().await {
            Ok(jwks) => {
                state.jwks = Some(CachedJwks::new(jwks));
                state.last_failure = None;
            }
            Err(message) => {
                state.last_failure = Some(FailedFetch {
                    message,
                    failed_at: Instant::now(),
                });
            }
        }

        Self::outcome_of_last_fetch(&state, kid)
    }

    fn outcome_of_last_fetch(state: &CacheState, kid: &str) -> Result<Jwk> {
        if let Some(failure) = &state.last_failure {
            return Err(Error::JwksCacheError(failure.message.clone()));
        }

        state
            .jwks
            .as_ref()
            .and_then(|cached| cached.jwks.find(kid))
            .cloned()
            .ok_or(Error::KeyNotMatchInJwks)
    }

    /// Fetch the key set from the team's certs endpoint
    async fn fetch_jwks(&self) -> std::result::Result<JwkSet, String> {
        debug!(url = %self.certs_url, "Fetching Cloudflare Access signing keys");

        let result: std::result::Result<JwkSet, reqwest::Error> = async {
            self.client
                .get(&self.certs_url)
                .timeout(self.fetch_timeout)
                .send()
                .await?
                .error_for_status()?
                .json::<JwkSet>()
                .await
        }
        .await;

        let jwks = result
            .inspect_err(|error| warn!(url = %self.certs_url, %error, "Failed to fetch JWKS"))
            .map_err(fetch_failure_message)?;

        debug!(keys = jwks.keys.len(), "Fetched Cloudflare Access signing keys");
        Ok(jwks)
    }
}
