//! Revocation registry (token blacklist).
//!
//! Shared by every gate invocation of one server instance. Constructed
//! explicitly and injected; the periodic sweep is driven by the owner.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

/// Raw token string -> the token's own expiry.
///
/// An entry blocks its token while `now < expires_at`; later it is inert
/// until [`RevocationRegistry::sweep`] removes it.
#[derive(Debug, Default)]
pub struct RevocationRegistry {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl RevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite. Idempotent.
    pub fn revoke(&self, token: impl Into<String>, expires_at: DateTime<Utc>) {
        self.lock().insert(token.into(), expires_at);
    }

    pub fn is_revoked(&self, token: &str) -> bool {
        self.is_revoked_at(token, Utc::now())
    }

    pub fn is_revoked_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.lock()
            .get(token)
            .is_some_and(|expires_at| now < *expires_at)
    }

    /// Drop every entry with `expires_at <= now`; returns how many were removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        before - entries.len()
    }

    /// Entries currently held, including inert ones not yet swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave a half-written entry
    // (HashMap ops are atomic from our side), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use std::thread;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn unknown_token_is_not_revoked() {
        let registry = RevocationRegistry::new();
        assert!(!registry.is_revoked_at("abc", at(0)));
    }

    #[test]
    fn revoked_until_expiry_then_inert() {
        let registry = RevocationRegistry::new();
        registry.revoke("abc", at(100));

        assert!(registry.is_revoked_at("abc", at(0)));
        assert!(registry.is_revoked_at("abc", at(99)));
        assert!(!registry.is_revoked_at("abc", at(100)));
        assert!(!registry.is_revoked_at("abc", at(101)));
    }

    #[test]
    fn revoke_is_idempotent_and_overwrites_expiry() {
        let registry = RevocationRegistry::new();
        registry.revoke("abc", at(10));
        registry.revoke("abc", at(10));
        assert_eq!(registry.len(), 1);

        registry.revoke("abc", at(50));
        assert!(registry.is_revoked_at("abc", at(20)));
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let registry = RevocationRegistry::new();
        registry.revoke("old", at(10));
        registry.revoke("edge", at(20));
        registry.revoke("live", at(30));

        assert_eq!(registry.sweep(at(20)), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_revoked_at("live", at(20)));
        assert_eq!(registry.sweep(at(20)), 0);
    }

    #[test]
    fn concurrent_readers_all_see_a_prior_revoke() {
        let registry = Arc::new(RevocationRegistry::new());
        let now = Utc::now();
        registry.revoke("tok", now + Duration::minutes(10));

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || (0..1_000).all(|_| registry.is_revoked_at("tok", now)))
            })
            .collect();

        for r in readers {
            assert!(r.join().unwrap());
        }
    }

    #[test]
    fn sweeping_concurrently_with_revokes_loses_nothing_live() {
        let registry = Arc::new(RevocationRegistry::new());
        let now = at(1_000);

        let writer = {
            let registry = registry.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    registry.revoke(format!("live-{i}"), at(2_000));
                    registry.revoke(format!("dead-{i}"), at(500));
                }
            })
        };
        let sweeper = {
            let registry = registry.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    registry.sweep(now);
                }
            })
        };

        writer.join().unwrap();
        sweeper.join().unwrap();
        registry.sweep(now);

        assert_eq!(registry.len(), 500);
        assert!((0..500).all(|i| registry.is_revoked_at(&format!("live-{i}"), now)));
    }
}
