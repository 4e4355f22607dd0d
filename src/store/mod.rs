//! Invoice storage behind one trait, three interchangeable backends.
//!
//! Exactly one backend is selected at startup from [`StorageConfig`]; there
//! is no runtime probing or fallback between them. All backends store the
//! same serde_json-encoded [`InvoiceRecord`] and honor the same contract, so
//! the HTTP layer never knows which one it is talking to.

pub mod memory;
pub mod rest;
pub mod sled;

use crate::auth::ledger::{MemoryNonceLedger, NonceLedger, RestNonceLedger, SledNonceLedger};
use crate::config::{StorageBackend, StorageConfig};
use crate::error::{Error, Result};
use crate::invoice::{InvoiceDraft, InvoiceRecord, InvoiceStatus};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

pub use memory::MemoryStore;
pub use rest::{RestCache, RestCacheStore};
pub use self::sled::SledStore;

/// Persistent invoice storage keyed by invoice number.
///
/// Records are never deleted; `put` overwrites unconditionally (last writer
/// wins) and `get`/`update_status` are keyed by the invoice number
/// exclusively.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Validate and persist a draft, returning the completed record.
    ///
    /// Fills `createdDate` and `status` with defaults when the draft omits
    /// them. An existing record under the same invoice number is replaced.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when a required field is missing or empty
    /// (nothing is persisted), [`Error::Store`] when the backend fails.
    async fn put(&self, draft: InvoiceDraft) -> Result<InvoiceRecord>;

    /// Fetch a record, `Ok(None)` when the invoice number is unknown.
    ///
    /// # Errors
    ///
    /// [`Error::Store`] when the backend fails.
    async fn get(&self, invoice_number: &str) -> Result<Option<InvoiceRecord>>;

    /// Change only the status of an existing record, returning the updated
    /// record. Every other field is left untouched.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when no record exists under the invoice number
    /// (the store is left unchanged), [`Error::Store`] when the backend
    /// fails.
    async fn update_status(
        &self,
        invoice_number: &str,
        status: InvoiceStatus,
    ) -> Result<InvoiceRecord>;
}

/// Open the configured backend and its matching nonce ledger.
///
/// The pairing is deliberate: a deployment's replay protection lives in the
/// same place as its invoices, so horizontally-scaled instances sharing a
/// REST cache also share consumed nonces, while a single-node sled setup
/// keeps them durable on the same disk.
///
/// # Errors
///
/// Returns [`Error::Config`] when the `rest` backend is selected without a
/// cache URL and token, [`Error::Store`] when the sled files cannot be
/// opened, or an I/O error when the data directory cannot be created.
pub fn open_backend(
    config: &StorageConfig,
) -> Result<(Arc<dyn InvoiceStore>, Arc<dyn NonceLedger>)> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Storage backend: memory (volatile)");
            Ok((
                Arc::new(MemoryStore::new()),
                Arc::new(MemoryNonceLedger::new()),
            ))
        }
        StorageBackend::Sled => {
            std::fs::create_dir_all(&config.data_dir)?;
            let db = self::sled::open_db(&config.data_dir)?;
            info!("Storage backend: sled at {}", config.data_dir.display());
            Ok((
                Arc::new(SledStore::new(&db)?),
                Arc::new(SledNonceLedger::new(&db)?),
            ))
        }
        StorageBackend::Rest => {
            let url = config
                .cache_url
                .as_deref()
                .filter(|u| !u.is_empty())
                .ok_or_else(|| Error::Config("rest backend requires cache_url".to_string()))?;
            let token = config
                .cache_token
                .as_deref()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| Error::Config("rest backend requires cache_token".to_string()))?;
            let cache = RestCache::new(url, token)?;
            info!("Storage backend: REST cache at {url}");
            Ok((
                Arc::new(RestCacheStore::new(cache.clone())),
                Arc::new(RestNonceLedger::new(cache)),
            ))
        }
    }
}
