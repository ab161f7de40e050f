// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Refresh policy
//!
//! - Keys are cached with a configurable TTL
//! - Refreshes are single-flight: callers that find the cache stale queue on
//!   one lock and re-check the cache once they hold it
//! - A token signed with an unknown `kid` forces one refresh, at most once per
//!   `min_refresh_interval` (key rotation)
//! - Stale cache is used on fetch failure (fail-open for availability)
//! - A failed fetch is not retried within `min_refresh_interval`; callers in
//!   that window get the stale set, or the recorded error without one

use std::sync::Arc;
use std::time::{Duration, Instant};

use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::{Mutex, RwLock};

use super::error::AuthError;

/// Default JWKS cache TTL (5 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Minimum spacing between forced (unknown `kid`) refreshes.
const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Timeout for a single JWKS fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// Most recent failed fetch.
struct FailedFetch {
    at: Instant,
    error: AuthError,
}

/// JWKS manager with caching.
///
/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct JwksManager {
    jwks_url: String,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// Held for the duration of a fetch; remembers the last failure so
    /// queued callers do not retry within `min_refresh_interval`
    refresh_lock: Arc<Mutex<Option<FailedFetch>>>,
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager.
    ///
    /// # Arguments
    /// - `jwks_url`: The JWKS endpoint (e.g. `https://<project>.supabase.co/auth/v1/.well-known/jwks.json`)
    /// - `client`: shared HTTP client
    pub fn new(jwks_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            cache: Arc::new(RwLock::new(None)),
            refresh_lock: Arc::new(Mutex::new(None)),
            client,
        }
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Create with a custom minimum interval between forced refreshes.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Return the cached set if it is younger than `max_age`.
    async fn cached_within(&self, max_age: Duration) -> Option<JwkSet> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < max_age)
            .map(|entry| entry.jwks.clone())
    }

    /// Fetch JWKS (with caching).
    async fn get_jwks(&self) -> Result<JwkSet, AuthError> {
        if let Some(jwks) = self.cached_within(self.cache_ttl).await {
            return Ok(jwks);
        }
        self.refresh_single_flight(self.cache_ttl).await
    }

    /// Refresh unless another caller refreshed within `max_age`, or a fetch
    /// failed within `min_refresh_interval`, while we waited for the lock.
    async fn refresh_single_flight(&self, max_age: Duration) -> Result<JwkSet, AuthError> {
        let mut last_failure = self.refresh_lock.lock().await;

        if let Some(jwks) = self.cached_within(max_age).await {
            return Ok(jwks);
        }

        if let Some(failure) = last_failure
            .as_ref()
            .filter(|failure| failure.at.elapsed() < self.min_refresh_interval)
        {
            return self.stale_or(failure.error.clone()).await;
        }

        match self.fetch_jwks().await {
            Ok(jwks) => {
                *last_failure = None;
                let mut cache = self.cache.write().await;
                *cache = Some(CacheEntry {
                    jwks: jwks.clone(),
                    fetched_at: Instant::now(),
                });
                tracing::debug!(url = %self.jwks_url, keys = jwks.keys.len(), "JWKS refreshed");
                Ok(jwks)
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %self.jwks_url, "JWKS refresh failed");
                *last_failure = Some(FailedFetch {
                    at: Instant::now(),
                    error: e.clone(),
                });
                self.stale_or(e).await
            }
        }
    }

    /// The cached set regardless of age, else `error`.
    async fn stale_or(&self, error: AuthError) -> Result<JwkSet, AuthError> {
        match &*self.cache.read().await {
            Some(entry) => {
                tracing::debug!("Using stale JWKS");
                Ok(entry.jwks.clone())
            }
            None => Err(error),
        }
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetch(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::JwksFetch(e.to_string()))
    }

    /// Get a decoding key for a token header's `kid`.
    ///
    /// Without a `kid`, the first usable key in the set is returned. An
    /// unknown `kid` forces one (rate-limited) refresh before giving up.
    pub async fn decoding_key(
        &self,
        kid: Option<&str>,
    ) -> Result<(DecodingKey, Algorithm), AuthError> {
        let jwks = self.get_jwks().await?;

        let Some(kid) = kid else {
            return jwks
                .keys
                .iter()
                .find_map(|jwk| jwk_to_decoding_key(jwk).ok())
                .ok_or(AuthError::NoMatchingKey);
        };

        if let Some(jwk) = jwks.find(kid) {
            return jwk_to_decoding_key(jwk);
        }

        tracing::debug!(kid, "Unknown key id, refreshing JWKS");
        let jwks = self.refresh_single_flight(self.min_refresh_interval).await?;
        jwks.find(kid)
            .ok_or(AuthError::NoMatchingKey)
            .and_then(jwk_to_decoding_key)
    }

    /// Make sure a key set is available, fetching only when the cache is
    /// stale and no fetch failed within `min_refresh_interval`.
    pub async fn ensure_fresh(&self) -> Result<(), AuthError> {
        self.get_jwks().await.map(|_| ())
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        self.cached_within(self.cache_ttl).await.is_some()
    }
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    let key_alg = jwk.common.key_algorithm;

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|_| AuthError::NoMatchingKey)?;
            let alg = match key_alg {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };
            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|_| AuthError::NoMatchingKey)?;
            let alg = match key_alg {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };
            Ok((key, alg))
        }
        AlgorithmParameters::OctetKey(oct) => {
            let secret = Base64UrlUnpadded::decode_vec(oct.value.trim_end_matches('='))
                .map_err(|_| AuthError::NoMatchingKey)?;
            let alg = match key_alg {
                Some(KeyAlgorithm::HS384) => Algorithm::HS384,
                Some(KeyAlgorithm::HS512) => Algorithm::HS512,
                _ => Algorithm::HS256,
            };
            Ok((DecodingKey::from_secret(&secret), alg))
        }
        _ => Err(AuthError::NoMatchingKey),
    }
}
