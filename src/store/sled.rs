//! Embedded file-backed invoice storage.
//!
//! Records live in a dedicated sled tree as serde_json values, the same
//! encoding that goes over the wire. Durable across restarts; writers are
//! single-process (sled holds an exclusive file lock), which matches the
//! one-node deployments this backend is for.

use crate::error::{Error, Result};
use crate::invoice::{InvoiceDraft, InvoiceRecord, InvoiceStatus};
use crate::store::InvoiceStore;
use async_trait::async_trait;
use sled::{Db, Tree};
use std::path::Path;
use tracing::debug;

const INVOICE_TREE: &str = "invoices";

/// Open (or create) the sled database under `dir`.
///
/// # Errors
///
/// Returns [`Error::Store`] when the files cannot be opened, typically
/// because another process holds the lock.
pub fn open_db(dir: &Path) -> Result<Db> {
    sled::open(dir.join("db")).map_err(|e| Error::Store(format!("open sled db: {e}")))
}

/// Invoice store on top of an open sled database.
pub struct SledStore {
    tree: Tree,
}

impl SledStore {
    /// Attach to the invoice tree of `db`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when the tree cannot be opened.
    pub fn new(db: &Db) -> Result<Self> {
        let tree = db
            .open_tree(INVOICE_TREE)
            .map_err(|e| Error::Store(format!("open invoice tree: {e}")))?;
        Ok(Self { tree })
    }

    fn read(&self, invoice_number: &str) -> Result<Option<InvoiceRecord>> {
        let Some(raw) = self
            .tree
            .get(invoice_number)
            .map_err(|e| Error::Store(format!("read invoice: {e}")))?
        else {
            return Ok(None);
        };
        let record = serde_json::from_slice(&raw)
            .map_err(|e| Error::Store(format!("decode invoice {invoice_number}: {e}")))?;
        Ok(Some(record))
    }

    async fn write(&self, record: &InvoiceRecord) -> Result<()> {
        let raw = serde_json::to_vec(record)
            .map_err(|e| Error::Store(format!("encode invoice: {e}")))?;
        self.tree
            .insert(record.invoice_number.as_str(), raw)
            .map_err(|e| Error::Store(format!("write invoice: {e}")))?;
        self.tree
            .flush_async()
            .await
            .map_err(|e| Error::Store(format!("flush invoice tree: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for SledStore {
    async fn put(&self, draft: InvoiceDraft) -> Result<InvoiceRecord> {
        let record = draft.into_record()?;
        debug!("Storing invoice {} (sled)", record.invoice_number);
        self.write(&record).await?;
        Ok(record)
    }

    async fn get(&self, invoice_number: &str) -> Result<Option<InvoiceRecord>> {
        self.read(invoice_number)
    }

    async fn update_status(
        &self,
        invoice_number: &str,
        status: InvoiceStatus,
    ) -> Result<InvoiceRecord> {
        let mut record = self
            .read(invoice_number)?
            .ok_or_else(|| Error::NotFound(invoice_number.to_string()))?;
        record.status = status;
        self.write(&record).await?;
        debug!("Invoice {invoice_number} status -> {status} (sled)");
        Ok(record)
    }
}
