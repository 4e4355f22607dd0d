//! In-process invoice storage.
//!
//! A `HashMap` behind a read-write lock. Nothing survives a restart; this
//! backend exists for development and for tests that want a real
//! [`InvoiceStore`] without touching the disk or the network.

use crate::error::Result;
use crate::invoice::{InvoiceDraft, InvoiceRecord, InvoiceStatus};
use crate::store::InvoiceStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Volatile, process-local invoice store.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, InvoiceRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// True when no records are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn put(&self, draft: InvoiceDraft) -> Result<InvoiceRecord> {
        let record = draft.into_record()?;
        debug!("Storing invoice {} (memory)", record.invoice_number);
        self.records
            .write()
            .insert(record.invoice_number.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, invoice_number: &str) -> Result<Option<InvoiceRecord>> {
        Ok(self.records.read().get(invoice_number).cloned())
    }

    async fn update_status(
        &self,
        invoice_number: &str,
        status: InvoiceStatus,
    ) -> Result<InvoiceRecord> {
        let mut records = self.records.write();
        let record = records
            .get_mut(invoice_number)
            .ok_or_else(|| crate::error::Error::NotFound(invoice_number.to_string()))?;
        record.status = status;
        debug!("Invoice {invoice_number} status -> {status} (memory)");
        Ok(record.clone())
    }
}
