//! Typed client for the chainvoice HTTP API.
//!
//! Holds an ordered list of base URLs and tries them in turn. The first
//! transport-level response wins regardless of its HTTP status: an error
//! status from a live server is an answer, not an outage, so it is returned
//! rather than retried elsewhere. Only connection failures advance down the
//! list. This mirrors the web client, which asks a local dev server before
//! the deployed one.

use crate::auth::VerifiedLogin;
use crate::error::{Error, Result};
use crate::invoice::{InvoiceDraft, InvoiceRecord, InvoiceStatus};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Default local API base, matching the server's default listen address.
pub const LOCAL_BASE_URL: &str = "http://localhost:8000";

/// Environment variable naming the deployed API base.
pub const API_URL_ENV: &str = "CHAINVOICE_API_URL";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Error body shape returned by the API.
#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    error: String,
}

/// API client with ordered-fallback endpoint resolution.
pub struct ApiClient {
    bases: Vec<String>,
    http: reqwest::Client,
}

impl ApiClient {
    /// Build a client over `bases`, tried in order. Trailing slashes are
    /// stripped so paths can be appended verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `bases` is empty and
    /// [`Error::Internal`] when the HTTP client cannot be built.
    pub fn new(bases: Vec<String>) -> Result<Self> {
        if bases.is_empty() {
            return Err(Error::Config("at least one API base URL is required".to_string()));
        }
        let bases = bases
            .into_iter()
            .map(|b| b.trim_end_matches('/').to_string())
            .collect();
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("build http client: {e}")))?;
        Ok(Self { bases, http })
    }

    /// Build the default resolution order: the local dev server first, then
    /// the deployed base from `CHAINVOICE_API_URL` when set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] when the HTTP client cannot be built.
    pub fn from_env() -> Result<Self> {
        let mut bases = vec![LOCAL_BASE_URL.to_string()];
        if let Ok(deployed) = std::env::var(API_URL_ENV) {
            if !deployed.trim().is_empty() {
                bases.push(deployed);
            }
        }
        Self::new(bases)
    }

    /// The base URLs in resolution order.
    #[must_use]
    pub fn bases(&self) -> &[String] {
        &self.bases
    }

    /// Send `method path` against each base until one answers.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let mut last_failure = String::new();
        for base in &self.bases {
            let url = format!("{base}{path}");
            let mut request = self.http.request(method.clone(), &url);
            if let Some(body) = body {
                request = request.json(body);
            }
            match request.send().await {
                Ok(response) => {
                    debug!("{method} {url} -> {}", response.status());
                    return Ok(response);
                }
                Err(e) => {
                    warn!("API endpoint {base} unreachable: {e}");
                    last_failure = e.to_string();
                }
            }
        }
        Err(Error::Internal(format!(
            "no API endpoint reachable (last failure: {last_failure})"
        )))
    }

    /// Map a non-success response onto the crate taxonomy.
    async fn api_error(response: Response, invoice_number: Option<&str>) -> Error {
        let status = response.status();
        let message = response
            .json::<WireError>()
            .await
            .map(|w| w.error)
            .unwrap_or_default();
        match status {
            StatusCode::BAD_REQUEST => Error::Validation(if message.is_empty() {
                "request rejected".to_string()
            } else {
                message
            }),
            StatusCode::UNAUTHORIZED => Error::InvalidSignature,
            StatusCode::NOT_FOUND => {
                Error::NotFound(invoice_number.unwrap_or("unknown").to_string())
            }
            _ => Error::Internal(format!("API returned {status}: {message}")),
        }
    }

    /// Verify a wallet login.
    ///
    /// # Errors
    ///
    /// Mirrors the server taxonomy: validation failures, invalid signatures,
    /// or [`Error::Internal`] when no endpoint is reachable.
    pub async fn verify_login(
        &self,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<VerifiedLogin> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire {
            address: String,
            session_token: String,
        }

        let body = json!({ "address": address, "message": message, "signature": signature });
        let response = self
            .request(Method::POST, "/api/auth/verify", Some(&body))
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response, None).await);
        }
        let wire: Wire = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("decode login response: {e}")))?;
        Ok(VerifiedLogin {
            address: wire.address,
            session_token: wire.session_token,
        })
    }

    /// Save an invoice, returning the invoice number it was stored under.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when the server rejects the draft, transport
    /// failures as [`Error::Internal`].
    pub async fn save_invoice(&self, draft: &InvoiceDraft) -> Result<String> {
        #[derive(Debug, Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Wire {
            invoice_number: String,
        }

        let body = serde_json::to_value(draft)
            .map_err(|e| Error::Internal(format!("encode invoice draft: {e}")))?;
        let response = self
            .request(Method::POST, "/api/save-invoice", Some(&body))
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response, Some(&draft.invoice_number)).await);
        }
        let wire: Wire = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("decode save response: {e}")))?;
        Ok(wire.invoice_number)
    }

    /// Fetch an invoice, `Ok(None)` when the server has nothing under the
    /// number.
    ///
    /// # Errors
    ///
    /// Transport failures as [`Error::Internal`]; other non-success statuses
    /// mapped onto the crate taxonomy.
    pub async fn get_invoice(&self, invoice_number: &str) -> Result<Option<InvoiceRecord>> {
        #[derive(Debug, Deserialize)]
        struct Wire {
            invoice: InvoiceRecord,
        }

        let response = self
            .request(
                Method::GET,
                &format!("/api/get-invoice/{invoice_number}"),
                None,
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response, Some(invoice_number)).await);
        }
        let wire: Wire = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("decode invoice response: {e}")))?;
        Ok(Some(wire.invoice))
    }

    /// Change an invoice's status, returning the updated record.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the invoice does not exist; validation and
    /// transport failures as for the other calls.
    pub async fn update_invoice(
        &self,
        invoice_number: &str,
        status: InvoiceStatus,
    ) -> Result<InvoiceRecord> {
        #[derive(Debug, Deserialize)]
        struct Wire {
            invoice: InvoiceRecord,
        }

        let body = json!({ "invoiceNumber": invoice_number, "status": status.as_str() });
        let response = self
            .request(Method::PUT, "/api/update-invoice", Some(&body))
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response, Some(invoice_number)).await);
        }
        let wire: Wire = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("decode update response: {e}")))?;
        Ok(wire.invoice)
    }
}
