//! Remote invoice storage over a Redis-compatible REST cache.
//!
//! Speaks the Upstash-style HTTP interface: `GET {base}/get/{key}` and
//! `POST {base}/set/{key}` with the value as the request body, bearer-token
//! auth, and `{"result": ...}` / `{"error": ...}` reply envelopes. Every
//! write carries a fixed one-year expiry since the backing service is a
//! cache, not a database. Safe to share across horizontally-scaled
//! instances; the cache serializes writes server-side.

use crate::error::{Error, Result};
use crate::invoice::{InvoiceDraft, InvoiceRecord, InvoiceStatus};
use crate::store::InvoiceStore;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Expiry stamped on every cache write, in seconds (one year).
pub const ONE_YEAR_SECS: u64 = 31_536_000;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn invoice_key(invoice_number: &str) -> String {
    format!("invoice:{invoice_number}")
}

/// Reply envelope returned by every cache command.
#[derive(Debug, Deserialize)]
struct CacheReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Low-level client for the REST cache.
///
/// Shared by the invoice store and the nonce ledger so both talk to the same
/// endpoint with the same credentials.
#[derive(Clone)]
pub struct RestCache {
    http: reqwest::Client,
    base: Url,
    token: String,
}

impl RestCache {
    /// Build a client for the cache at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the URL does not parse and
    /// [`Error::Internal`] when the HTTP client cannot be constructed.
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid cache URL {base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "cache URL {base_url} cannot carry a path"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("build http client: {e}")))?;
        Ok(Self {
            http,
            base,
            token: token.to_string(),
        })
    }

    /// URL for a command, with the key percent-encoded as a path segment.
    fn command_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Config("cache URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Option<Value>> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::Store(format!("cache request failed: {e}")))?;
        let status = response.status();
        let reply: CacheReply = response
            .json()
            .await
            .map_err(|e| Error::Store(format!("cache reply decode: {e}")))?;
        if let Some(message) = reply.error {
            return Err(Error::Store(format!("cache error ({status}): {message}")));
        }
        if !status.is_success() {
            return Err(Error::Store(format!("cache returned {status}")));
        }
        Ok(reply.result)
    }

    /// Read the string value under `key`, `None` when absent or expired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on transport failures, cache-side errors, or
    /// a non-string value under the key.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let url = self.command_url(&["get", key])?;
        match self.execute(self.http.get(url)).await? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(Error::Store(format!(
                "unexpected cache value under {key}: {other}"
            ))),
        }
    }

    /// Write `value` under `key` with an expiry, overwriting anything there.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on transport or cache-side failures.
    pub async fn set(&self, key: &str, value: &str, expiry_secs: u64) -> Result<()> {
        let mut url = self.command_url(&["set", key])?;
        url.query_pairs_mut()
            .append_pair("EX", &expiry_secs.to_string());
        self.execute(self.http.post(url).body(value.to_string()))
            .await?;
        Ok(())
    }

    /// Write `value` under `key` only when the key is vacant (`SET NX`).
    ///
    /// Returns `true` when this call created the key. The check and the
    /// write are one atomic command on the cache side.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on transport or cache-side failures.
    pub async fn set_if_absent(&self, key: &str, value: &str, expiry_secs: u64) -> Result<bool> {
        let mut url = self.command_url(&["set", key])?;
        url.query_pairs_mut()
            .append_pair("EX", &expiry_secs.to_string())
            .append_pair("NX", "true");
        let result = self
            .execute(self.http.post(url).body(value.to_string()))
            .await?;
        // The cache answers "OK" when the key was set, null when NX lost.
        Ok(!matches!(result, None | Some(Value::Null)))
    }
}

/// Invoice store on top of [`RestCache`].
pub struct RestCacheStore {
    cache: RestCache,
}

impl RestCacheStore {
    /// Wrap an existing cache client.
    #[must_use]
    pub fn new(cache: RestCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl InvoiceStore for RestCacheStore {
    async fn put(&self, draft: InvoiceDraft) -> Result<InvoiceRecord> {
        let record = draft.into_record()?;
        let encoded = serde_json::to_string(&record)
            .map_err(|e| Error::Store(format!("encode invoice: {e}")))?;
        self.cache
            .set(&invoice_key(&record.invoice_number), &encoded, ONE_YEAR_SECS)
            .await?;
        debug!("Stored invoice {} (rest)", record.invoice_number);
        Ok(record)
    }

    async fn get(&self, invoice_number: &str) -> Result<Option<InvoiceRecord>> {
        let Some(raw) = self.cache.get(&invoice_key(invoice_number)).await? else {
            return Ok(None);
        };
        let record = serde_json::from_str(&raw)
            .map_err(|e| Error::Store(format!("decode invoice {invoice_number}: {e}")))?;
        Ok(Some(record))
    }

    async fn update_status(
        &self,
        invoice_number: &str,
        status: InvoiceStatus,
    ) -> Result<InvoiceRecord> {
        let mut record = self
            .get(invoice_number)
            .await?
            .ok_or_else(|| Error::NotFound(invoice_number.to_string()))?;
        record.status = status;
        let encoded = serde_json::to_string(&record)
            .map_err(|e| Error::Store(format!("encode invoice: {e}")))?;
        self.cache
            .set(&invoice_key(invoice_number), &encoded, ONE_YEAR_SECS)
            .await?;
        debug!("Invoice {invoice_number} status -> {status} (rest)");
        Ok(record)
    }
}
