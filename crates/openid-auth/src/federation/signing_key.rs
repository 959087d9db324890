//! Per-issuer signing key cache.
//!
//! [`SigningKeyCache`] answers "which public key has ID `kid` at issuer `iss`"
//! without touching the network when it can. A lookup that misses triggers one
//! re-resolution of the issuer's key set, which is how key rotation is picked
//! up: a token signed with a newly published key misses, the set is refreshed,
//! and the new key is found.
//!
//! # Concurrency
//!
//! Reads go through an `arc-swap` snapshot of the issuer's key map and never
//! wait. Refreshes are serialized per issuer by an async mutex and counted by
//! a generation number. A caller that missed, then waited on the mutex while
//! another caller refreshed, reuses that outcome (including its error) instead
//! of resolving again. Issuers never wait on each other.
//!
//! A refresh whose future is dropped before completion publishes nothing; the
//! next caller in line performs it instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::key_set::{KeyRejection, KeySetResolver, ResolvedKey};
use crate::error::AuthError;

/// Keys and refresh state of a single issuer.
struct IssuerSlot {
    keys: ArcSwap<HashMap<String, ResolvedKey>>,
    rejected: ArcSwap<Vec<KeyRejection>>,
    /// Number of completed refreshes.
    generation: AtomicU64,
    /// Held while refreshing; stores the error of the last completed refresh.
    refresh: Mutex<Option<AuthError>>,
}

impl IssuerSlot {
    fn new() -> Self {
        Self {
            keys: ArcSwap::from_pointee(HashMap::new()),
            rejected: ArcSwap::from_pointee(Vec::new()),
            generation: AtomicU64::new(0),
            refresh: Mutex::new(None),
        }
    }

    fn lookup(&self, kid: &str) -> Option<ResolvedKey> {
        self.keys.load().get(kid).cloned()
    }
}

/// Caches resolved signing keys per issuer and refreshes them on miss.
pub struct SigningKeyCache {
    resolver: Arc<dyn KeySetResolver>,
    issuers: DashMap<String, Arc<IssuerSlot>>,
}

impl SigningKeyCache {
    /// Creates an empty cache backed by `resolver`.
    #[must_use]
    pub fn new(resolver: Arc<dyn KeySetResolver>) -> Self {
        Self {
            resolver,
            issuers: DashMap::new(),
        }
    }

    /// Returns the key `kid` of `issuer`.
    ///
    /// A cached key is returned immediately. Otherwise the issuer's key set is
    /// resolved once (shared with concurrent callers) and the key looked up
    /// again.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyNotFound` if the key is still absent after the
    /// refresh, or the resolver's error if the refresh failed.
    pub async fn get_key(&self, issuer: &str, kid: &str) -> Result<ResolvedKey, AuthError> {
        let slot = self.slot(issuer);

        // Read before the lookup so a refresh completing in between is detected
        let seen = slot.generation.load(Ordering::Acquire);

        if let Some(key) = slot.lookup(kid) {
            tracing::trace!(issuer = %issuer, kid = %kid, "Signing key cache hit");
            return Ok(key);
        }

        tracing::debug!(issuer = %issuer, kid = %kid, "Signing key cache miss");

        let mut last_error = slot.refresh.lock().await;

        if slot.generation.load(Ordering::Acquire) != seen {
            tracing::trace!(issuer = %issuer, kid = %kid, "Reusing concurrent refresh");
            if let Some(err) = last_error.as_ref() {
                return Err(err.clone());
            }
            return slot
                .lookup(kid)
                .ok_or_else(|| AuthError::key_not_found(issuer, kid));
        }

        let result = match self.resolver.resolve(issuer).await {
            Ok(set) => {
                let mut keys = HashMap::with_capacity(set.keys.len());
                for key in set.keys {
                    keys.entry(key.kid.clone()).or_insert(key);
                }
                slot.keys.store(Arc::new(keys));
                slot.rejected.store(Arc::new(set.rejected));
                *last_error = None;

                slot.lookup(kid).ok_or_else(|| {
                    tracing::debug!(issuer = %issuer, kid = %kid, "Key absent after refresh");
                    AuthError::key_not_found(issuer, kid)
                })
            }
            Err(e) => {
                tracing::warn!(issuer = %issuer, error = %e, "Signing key refresh failed");
                *last_error = Some(e.clone());
                Err(e)
            }
        };

        slot.generation.fetch_add(1, Ordering::Release);

        result
    }

    /// Drops all cached keys of `issuer`.
    pub fn invalidate(&self, issuer: &str) {
        self.issuers.remove(issuer);
        tracing::debug!(issuer = %issuer, "Invalidated signing keys");
    }

    /// Drops all cached keys.
    pub fn clear(&self) {
        self.issuers.clear();
    }

    /// Returns the number of issuers with a cache entry.
    #[must_use]
    pub fn issuer_count(&self) -> usize {
        self.issuers.len()
    }

    /// Returns the number of keys cached for `issuer`.
    #[must_use]
    pub fn key_count(&self, issuer: &str) -> usize {
        self.issuers
            .get(issuer)
            .map(|slot| slot.keys.load().len())
            .unwrap_or(0)
    }

    /// Returns the keys rejected by the last successful refresh of `issuer`.
    #[must_use]
    pub fn rejected_keys(&self, issuer: &str) -> Vec<KeyRejection> {
        self.issuers
            .get(issuer)
            .map(|slot| slot.rejected.load().as_ref().clone())
            .unwrap_or_default()
    }

    fn slot(&self, issuer: &str) -> Arc<IssuerSlot> {
        if let Some(slot) = self.issuers.get(issuer) {
            return Arc::clone(slot.value());
        }

        let entry = self
            .issuers
            .entry(issuer.to_string())
            .or_insert_with(|| Arc::new(IssuerSlot::new()));
        Arc::clone(entry.value())
    }
}
