//! Advisory training lease.
//!
//! At most one train or transform run may be in flight per corpus. The
//! lease is a record keyed by corpus id, acquired before a run starts and
//! released when the guard drops, so two callers cannot race to create
//! overlapping sessions. Leases carry a TTL: an expired lease is
//! claimable, which keeps a crashed runner from wedging the corpus.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::column_families::CF_LEASES;
use crate::db::Storage;
use crate::error::StorageError;
use crate::keys::lease_key;
use crate::store::ModelStore;

/// Persisted lease record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseRecord {
    /// Corpus the lease covers
    pub corpus_id: String,
    /// Opaque holder tag (session id or runner name)
    pub holder: String,
    /// When the lease was taken
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub acquired_at: DateTime<Utc>,
    /// When the lease lapses and becomes claimable
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl LeaseRecord {
    /// Whether the lease has lapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// RAII guard that releases the lease when dropped.
///
/// Release on drop means the lease is returned on every exit path,
/// including early returns and panics inside the run.
pub struct LeaseGuard {
    storage: Arc<Storage>,
    key: String,
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if let Err(e) = self.storage.delete(CF_LEASES, self.key.as_bytes()) {
            warn!(key = %self.key, "Failed to release training lease: {}", e);
        } else {
            debug!(key = %self.key, "Released training lease");
        }
    }
}

impl ModelStore {
    /// Acquire the advisory training lease for a corpus.
    ///
    /// Fails with `LeaseHeld` if another holder has an unexpired lease.
    /// The store is single-process (RocksDB holds the directory lock), so
    /// the read-then-write here is not racy across processes.
    pub fn acquire_lease(
        &self,
        corpus_id: &str,
        holder: &str,
        ttl_secs: u64,
    ) -> Result<LeaseGuard, StorageError> {
        let key = lease_key(corpus_id);
        let now = Utc::now();

        if let Some(bytes) = self.storage().get(CF_LEASES, key.as_bytes())? {
            let existing: LeaseRecord = serde_json::from_slice(&bytes)?;
            if !existing.is_expired(now) {
                return Err(StorageError::LeaseHeld {
                    corpus_id: corpus_id.to_string(),
                    holder: existing.holder,
                });
            }
            warn!(
                corpus_id = %corpus_id,
                stale_holder = %existing.holder,
                "Claiming expired training lease"
            );
        }

        let record = LeaseRecord {
            corpus_id: corpus_id.to_string(),
            holder: holder.to_string(),
            acquired_at: now,
            expires_at: now + Duration::seconds(ttl_secs as i64),
        };
        self.storage()
            .put(CF_LEASES, key.as_bytes(), &serde_json::to_vec(&record)?)?;
        debug!(corpus_id = %corpus_id, holder = %holder, "Acquired training lease");

        Ok(LeaseGuard {
            storage: self.storage().clone(),
            key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, ModelStore) {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::open(dir.path()).unwrap());
        (dir, ModelStore::new(storage))
    }

    #[test]
    fn test_acquire_and_release() {
        let (_dir, store) = open_store();
        let guard = store.acquire_lease("articles", "runner-1", 60).unwrap();
        drop(guard);
        // Released lease is immediately claimable
        let _guard = store.acquire_lease("articles", "runner-2", 60).unwrap();
    }

    #[test]
    fn test_second_acquire_fails_while_held() {
        let (_dir, store) = open_store();
        let _guard = store.acquire_lease("articles", "runner-1", 60).unwrap();

        let err = store.acquire_lease("articles", "runner-2", 60).unwrap_err();
        match err {
            StorageError::LeaseHeld { holder, .. } => assert_eq!(holder, "runner-1"),
            other => panic!("expected LeaseHeld, got {:?}", other),
        }
    }

    #[test]
    fn test_expired_lease_is_claimable() {
        let (_dir, store) = open_store();
        let guard = store.acquire_lease("articles", "crashed", 0).unwrap();
        // Leak the guard so the lease is not released on drop
        std::mem::forget(guard);

        let _guard = store.acquire_lease("articles", "runner-2", 60).unwrap();
    }

    #[test]
    fn test_leases_are_per_corpus() {
        let (_dir, store) = open_store();
        let _a = store.acquire_lease("articles", "runner-1", 60).unwrap();
        let _b = store.acquire_lease("press-releases", "runner-1", 60).unwrap();
    }
}
