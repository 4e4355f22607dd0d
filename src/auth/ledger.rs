//! Nonce ledger: replay protection for login messages.
//!
//! A nonce may authenticate exactly once. `check_and_mark` is the atomic
//! gate; `contains` is a cheap peek used to fail replays before any
//! signature work. Each storage backend ships a matching ledger so replay
//! protection lives wherever the deployment's state lives.
//!
//! Consumed nonces are never evicted by the memory and sled ledgers; the
//! REST ledger inherits the cache's one-year expiry.

use crate::error::{Error, Result};
use crate::store::rest::{RestCache, ONE_YEAR_SECS};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::debug;

fn nonce_key(nonce: &str) -> String {
    format!("nonce:{nonce}")
}

/// Record of consumed login nonces.
#[async_trait]
pub trait NonceLedger: Send + Sync {
    /// Peek whether `nonce` was already consumed. Never consumes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when the backing store fails.
    async fn contains(&self, nonce: &str) -> Result<bool>;

    /// Consume `nonce`, returning `true` when this call was the first.
    ///
    /// Check and mark are one atomic step: with any number of concurrent
    /// callers, exactly one gets `true`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when the backing store fails.
    async fn check_and_mark(&self, nonce: &str) -> Result<bool>;
}

/// Counters kept by the in-memory ledger.
#[derive(Debug, Default, Clone)]
pub struct LedgerStats {
    /// Nonces consumed.
    pub marked: u64,
    /// Replay attempts turned away.
    pub replays_blocked: u64,
}

/// Process-local ledger. Replay protection resets on restart.
#[derive(Default)]
pub struct MemoryNonceLedger {
    seen: Mutex<HashSet<String>>,
    stats: Mutex<LedgerStats>,
}

impl MemoryNonceLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> LedgerStats {
        self.stats.lock().clone()
    }
}

#[async_trait]
impl NonceLedger for MemoryNonceLedger {
    async fn contains(&self, nonce: &str) -> Result<bool> {
        let found = self.seen.lock().contains(nonce);
        if found {
            let mut stats = self.stats.lock();
            stats.replays_blocked += 1;
            debug!(
                "Replay blocked for nonce {nonce} ({} blocked so far)",
                stats.replays_blocked
            );
        }
        Ok(found)
    }

    async fn check_and_mark(&self, nonce: &str) -> Result<bool> {
        // Single lock acquisition; insert is the check and the mark.
        let fresh = self.seen.lock().insert(nonce.to_string());
        let mut stats = self.stats.lock();
        if fresh {
            stats.marked += 1;
        } else {
            stats.replays_blocked += 1;
            debug!(
                "Replay blocked for nonce {nonce} ({} blocked so far)",
                stats.replays_blocked
            );
        }
        Ok(fresh)
    }
}

/// Durable ledger in a sled tree. Replays stay blocked across restarts.
pub struct SledNonceLedger {
    tree: sled::Tree,
}

const NONCE_TREE: &str = "nonces";

impl SledNonceLedger {
    /// Attach to the nonce tree of `db`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when the tree cannot be opened.
    pub fn new(db: &sled::Db) -> Result<Self> {
        let tree = db
            .open_tree(NONCE_TREE)
            .map_err(|e| Error::Store(format!("open nonce tree: {e}")))?;
        Ok(Self { tree })
    }
}

#[async_trait]
impl NonceLedger for SledNonceLedger {
    async fn contains(&self, nonce: &str) -> Result<bool> {
        self.tree
            .contains_key(nonce)
            .map_err(|e| Error::Store(format!("read nonce: {e}")))
    }

    async fn check_and_mark(&self, nonce: &str) -> Result<bool> {
        // compare_and_swap against a vacant key is sled's atomic insert.
        let consumed_at = Utc::now().to_rfc3339();
        let swap = self
            .tree
            .compare_and_swap(nonce, None::<&[u8]>, Some(consumed_at.as_bytes()))
            .map_err(|e| Error::Store(format!("mark nonce: {e}")))?;
        match swap {
            Ok(()) => {
                self.tree
                    .flush_async()
                    .await
                    .map_err(|e| Error::Store(format!("flush nonce tree: {e}")))?;
                Ok(true)
            }
            Err(_) => {
                debug!("Replay blocked for nonce {nonce}");
                Ok(false)
            }
        }
    }
}

/// Shared ledger on the REST cache, for horizontally-scaled deployments.
///
/// `SET NX` makes the cache the single arbiter, so instances cannot race
/// each other into accepting the same nonce twice.
pub struct RestNonceLedger {
    cache: RestCache,
}

impl RestNonceLedger {
    /// Wrap an existing cache client.
    #[must_use]
    pub fn new(cache: RestCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl NonceLedger for RestNonceLedger {
    async fn contains(&self, nonce: &str) -> Result<bool> {
        Ok(self.cache.get(&nonce_key(nonce)).await?.is_some())
    }

    async fn check_and_mark(&self, nonce: &str) -> Result<bool> {
        let consumed_at = Utc::now().to_rfc3339();
        let fresh = self
            .cache
            .set_if_absent(&nonce_key(nonce), &consumed_at, ONE_YEAR_SECS)
            .await?;
        if !fresh {
            debug!("Replay blocked for nonce {nonce}");
        }
        Ok(fresh)
    }
}
