//! Lazily fetched, periodically refreshed JSON Web Key Sets.
//!
//! Readers load the current snapshot lock-free; refreshes are serialized by
//! an async mutex so a burst of unknown `kid`s causes one fetch, not many.
//! While a refresh is in flight, or after one has failed, lookups that the
//! cached keys can answer are served from the cache without touching the
//! network.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;
use warden_core::ProviderKind;

use crate::error::{IdentityError, IdentityResult};
use crate::http;

/// Path of the discovery document below an issuer.
pub const DISCOVERY_PATH: &str = ".well-known/openid-configuration";

/// Where the key set comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwksSource {
    /// A fixed key set URL.
    Direct(Url),
    /// Resolve `jwks_uri` from the issuer's discovery document.
    Discovery {
        /// Issuer base URL.
        issuer: Url,
    },
}

#[derive(Deserialize)]
struct DiscoveryDocument {
    jwks_uri: String,
}

#[derive(Deserialize)]
struct RawKeySet {
    keys: Vec<serde_json::Value>,
}

#[derive(Clone)]
struct Snapshot {
    keys: JwkSet,
    fetched_at: Instant,
    /// Set when the latest refresh attempt failed.
    failed_at: Option<Instant>,
}

impl Snapshot {
    fn fetched(keys: JwkSet) -> Self {
        Self {
            keys,
            fetched_at: Instant::now(),
            failed_at: None,
        }
    }

    fn backing_off(&self, interval: Duration) -> bool {
        self.failed_at.is_some_and(|at| at.elapsed() < interval)
    }
}

/// Cache of one issuer's signing keys.
pub struct JwksCache {
    provider: ProviderKind,
    client: reqwest::Client,
    source: JwksSource,
    refresh_after: Duration,
    min_refresh_interval: Duration,
    current: ArcSwapOption<Snapshot>,
    /// Serializes refreshes; holds the resolved key set URL once known.
    refresh_lock: Mutex<Option<Url>>,
}

impl fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwksCache")
            .field("provider", &self.provider)
            .field("source", &self.source)
            .field("refresh_after", &self.refresh_after)
            .field("min_refresh_interval", &self.min_refresh_interval)
            .field("cached_keys", &self.cached_key_count())
            .finish_non_exhaustive()
    }
}

impl JwksCache {
    /// Create an empty cache. Nothing is fetched until the first lookup.
    #[must_use]
    pub fn new(
        provider: ProviderKind,
        client: reqwest::Client,
        source: JwksSource,
        refresh_after: Duration,
        min_refresh_interval: Duration,
    ) -> Self {
        Self {
            provider,
            client,
            source,
            refresh_after,
            min_refresh_interval,
            current: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(None),
        }
    }

    /// Number of keys in the current snapshot.
    #[must_use]
    pub fn cached_key_count(&self) -> usize {
        self.current.load().as_ref().map_or(0, |s| s.keys.keys.len())
    }

    /// Find the key for `kid`, fetching or refreshing the set as needed.
    ///
    /// Without a `kid` the set must hold exactly one key.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Rejected`] for an unknown key id and
    /// [`IdentityError::Unavailable`] when the key set cannot be fetched.
    pub async fn key_for(&self, kid: Option<&str>) -> IdentityResult<Jwk> {
        let cached = self.current.load_full();
        let stale = cached.as_ref().and_then(|s| select(&s.keys, kid));

        if let Some(snapshot) = &cached {
            let age = snapshot.fetched_at.elapsed();
            if age < self.refresh_after {
                if let Some(jwk) = &stale {
                    return Ok(jwk.clone());
                }
                if age < self.min_refresh_interval {
                    debug!(provider = %self.provider, kid, "Unknown key id, refresh rate limited");
                    return Err(self.unknown_key());
                }
                debug!(provider = %self.provider, kid, "Unknown key id, refreshing key set early");
            }
            if snapshot.backing_off(self.min_refresh_interval) {
                debug!(provider = %self.provider, kid, "Key set refresh backing off");
                return stale.ok_or_else(|| self.refresh_failed());
            }
        }

        let guard = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                if let Some(jwk) = &stale {
                    debug!(provider = %self.provider, kid, "Key set refresh in progress, using cached keys");
                    return Ok(jwk.clone());
                }
                self.refresh_lock.lock().await
            },
        };

        match self.refresh(guard, cached.as_ref()).await {
            Ok(snapshot) => select(&snapshot.keys, kid).ok_or_else(|| self.unknown_key()),
            Err(err) => match stale {
                Some(jwk) => {
                    warn!(provider = %self.provider, error = %err, "Key set refresh failed, using cached keys");
                    Ok(jwk)
                },
                None => Err(err),
            },
        }
    }

    async fn refresh(
        &self,
        mut resolved: MutexGuard<'_, Option<Url>>,
        seen: Option<&Arc<Snapshot>>,
    ) -> IdentityResult<Arc<Snapshot>> {
        // Another task may have refreshed while this one waited.
        if let Some(current) = self.current.load_full() {
            if seen.is_none_or(|seen| !Arc::ptr_eq(seen, &current)) {
                if current.failed_at.is_some() {
                    return Err(self.refresh_failed());
                }
                return Ok(current);
            }
        }

        match self.fetch(&mut resolved).await {
            Ok(keys) => {
                let snapshot = Arc::new(Snapshot::fetched(keys));
                self.current.store(Some(Arc::clone(&snapshot)));
                Ok(snapshot)
            },
            Err(err) => {
                if let Some(current) = self.current.load_full() {
                    let mut failed = Snapshot::clone(&current);
                    failed.failed_at = Some(Instant::now());
                    self.current.store(Some(Arc::new(failed)));
                }
                Err(err)
            },
        }
    }

    async fn fetch(&self, resolved: &mut Option<Url>) -> IdentityResult<JwkSet> {
        let url = match resolved.as_ref() {
            Some(url) => url.clone(),
            None => {
                let url = self.resolve_jwks_url().await?;
                *resolved = Some(url.clone());
                url
            },
        };

        let keys = self.fetch_keys(&url).await?;
        debug!(provider = %self.provider, url = %url, keys = keys.keys.len(), "Refreshed signing key set");
        Ok(keys)
    }

    async fn resolve_jwks_url(&self) -> IdentityResult<Url> {
        let issuer = match &self.source {
            JwksSource::Direct(url) => return Ok(url.clone()),
            JwksSource::Discovery { issuer } => issuer,
        };
        let url = http::join(issuer, DISCOVERY_PATH);
        let document: DiscoveryDocument = self.get_json(&url, "discovery document").await?;
        http::parse_base_url("jwks_uri", &document.jwks_uri)
            .map_err(|_| IdentityError::unavailable(self.provider, "discovery document has an invalid jwks_uri"))
    }

    async fn fetch_keys(&self, url: &Url) -> IdentityResult<JwkSet> {
        let raw: RawKeySet = self.get_json(url.as_str(), "signing key set").await?;
        let keys = raw
            .keys
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Jwk>(value) {
                Ok(jwk) => Some(jwk),
                Err(e) => {
                    debug!(provider = %self.provider, error = %e, "Skipping unsupported key");
                    None
                },
            })
            .collect();
        Ok(JwkSet { keys })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str, what: &str) -> IdentityResult<T> {
        debug!(url = %url, "Fetching {what}");
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| http::transport_error(self.provider, what, &e))?;

        let status = response.status();
        if !status.is_success() {
            // Key set failures are retryable regardless of status.
            return Err(IdentityError::unavailable(
                self.provider,
                format!("{what} returned {}", status.as_u16()),
            ));
        }
        response
            .json()
            .await
            .map_err(|_| IdentityError::unavailable(self.provider, format!("{what} unreadable")))
    }

    fn unknown_key(&self) -> IdentityError {
        IdentityError::rejected(self.provider, "token signed with an unknown key")
    }

    fn refresh_failed(&self) -> IdentityError {
        IdentityError::unavailable(self.provider, "signing key set refresh failed recently")
    }
}

fn select(keys: &JwkSet, kid: Option<&str>) -> Option<Jwk> {
    match kid {
        Some(kid) => keys.find(kid).cloned(),
        None => match keys.keys.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        },
    }
}
