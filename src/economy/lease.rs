//! Per-user advisory leases.
//!
//! A lease serializes concurrent commands for one player. Leases expire after a
//! TTL so a crashed handler cannot wedge a player forever.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use super::clock::Clock;

/// Identifies one successful acquisition. Only the matching token releases.
pub type LeaseToken = u64;

pub trait LeaseStore: Send + Sync {
    /// Take `key` for `ttl`. `None` if someone else holds an unexpired lease.
    fn acquire(&self, key: &str, ttl: Duration) -> Option<LeaseToken>;

    /// Drop the lease on `key` if it is still held under `token`.
    fn release(&self, key: &str, token: LeaseToken);
}

#[derive(Debug, Clone, Copy)]
struct Lease {
    token: LeaseToken,
    expires_at_ms: i64,
}

/// Process-local lease table.
pub struct InMemoryLeaseStore<C: Clock> {
    clock: C,
    leases: Arc<RwLock<HashMap<String, Lease>>>,
    next_token: AtomicU64,
}

impl<C: Clock> InMemoryLeaseStore<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            leases: Arc::new(RwLock::new(HashMap::new())),
            next_token: AtomicU64::new(1),
        }
    }

    pub fn is_held(&self, key: &str) -> bool {
        let now = self.clock.now_ms();
        match self.leases.read() {
            Ok(map) => map.get(key).is_some_and(|l| now < l.expires_at_ms),
            Err(_) => false,
        }
    }
}

impl<C: Clock> LeaseStore for InMemoryLeaseStore<C> {
    fn acquire(&self, key: &str, ttl: Duration) -> Option<LeaseToken> {
        let now = self.clock.now_ms();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let Ok(mut map) = self.leases.write() else {
            log::error!("lease table lock poisoned; refusing {}", key);
            return None;
        };
        // expired leases are dropped lazily here
        map.retain(|_, l| now < l.expires_at_ms);
        if map.contains_key(key) {
            log::debug!("lease contention on {}", key);
            return None;
        }
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        map.insert(
            key.to_string(),
            Lease {
                token,
                expires_at_ms: now.saturating_add(ttl_ms),
            },
        );
        Some(token)
    }

    fn release(&self, key: &str, token: LeaseToken) {
        let Ok(mut map) = self.leases.write() else {
            return;
        };
        match map.get(key) {
            Some(lease) if lease.token == token => {
                map.remove(key);
            }
            Some(_) => log::warn!("stale lease release on {} ignored; key has a new holder", key),
            None => {}
        }
    }
}

/// Releases its lease when dropped.
pub struct LeaseGuard<'a, L: LeaseStore + ?Sized> {
    store: &'a L,
    key: String,
    token: LeaseToken,
}

impl<'a, L: LeaseStore + ?Sized> LeaseGuard<'a, L> {
    /// `None` when the lease is already held.
    pub fn try_acquire(store: &'a L, key: &str, ttl: Duration) -> Option<Self> {
        let token = store.acquire(key, ttl)?;
        Some(Self {
            store,
            key: key.to_string(),
            token,
        })
    }
}

impl<L: LeaseStore + ?Sized> Drop for LeaseGuard<'_, L> {
    fn drop(&mut self) {
        self.store.release(&self.key, self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economy::clock::ManualClock;

    #[test]
    fn exclusive_until_release() {
        let store = InMemoryLeaseStore::new(ManualClock::new(0));
        let ttl = Duration::from_secs(60);
        let token = store.acquire("hunt:amber", ttl).unwrap();
        assert!(store.acquire("hunt:amber", ttl).is_none());
        assert!(store.acquire("hunt:lisa", ttl).is_some());
        store.release("hunt:amber", token);
        assert!(store.acquire("hunt:amber", ttl).is_some());
    }

    #[test]
    fn expires_after_ttl() {
        let clock = Arc::new(ManualClock::new(0));
        let store = InMemoryLeaseStore::new(Arc::clone(&clock));
        assert!(store.acquire("k", Duration::from_secs(60)).is_some());
        clock.advance(59_999);
        assert!(store.is_held("k"));
        assert!(store.acquire("k", Duration::from_secs(60)).is_none());
        clock.advance(1);
        assert!(!store.is_held("k"));
        assert!(store.acquire("k", Duration::from_secs(60)).is_some());
    }

    #[test]
    fn guard_releases_on_drop() {
        let store = InMemoryLeaseStore::new(ManualClock::new(0));
        {
            let guard = LeaseGuard::try_acquire(&store, "k", Duration::from_secs(5));
            assert!(guard.is_some());
            assert!(LeaseGuard::try_acquire(&store, "k", Duration::from_secs(5)).is_none());
        }
        assert!(!store.is_held("k"));
    }

    #[test]
    fn expired_holder_cannot_release_successor() {
        let clock = Arc::new(ManualClock::new(0));
        let store = InMemoryLeaseStore::new(Arc::clone(&clock));
        let ttl = Duration::from_secs(60);

        let first = LeaseGuard::try_acquire(&store, "player:amber", ttl).unwrap();
        clock.advance(60_000);
        let second = LeaseGuard::try_acquire(&store, "player:amber", ttl);
        assert!(second.is_some());

        drop(first);
        assert!(store.is_held("player:amber"));
        assert!(LeaseGuard::try_acquire(&store, "player:amber", ttl).is_none());

        drop(second);
        assert!(LeaseGuard::try_acquire(&store, "player:amber", ttl).is_some());
    }

    #[test]
    fn wrong_token_is_ignored() {
        let store = InMemoryLeaseStore::new(ManualClock::new(0));
        let token = store.acquire("k", Duration::from_secs(5)).unwrap();
        store.release("k", token + 1);
        assert!(store.is_held("k"));
        store.release("k", token);
        assert!(!store.is_held("k"));
    }
}
