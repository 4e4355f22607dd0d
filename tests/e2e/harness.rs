//! Test harness that runs a real chainvoice server.
//!
//! `TestServer` binds an ephemeral port, opens the requested storage backend
//! through the same `store::open_backend` path the production binary uses,
//! and serves the full router until teardown.

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use chainvoice::api::{self, AppState};
use chainvoice::auth::signature::SignatureVerifier;
use chainvoice::auth::{LoginVerifier, SignInMessage};
use chainvoice::config::{StorageBackend, StorageConfig};
use chainvoice::store;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for test harness operations.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Server setup error
    #[error("Setup error: {0}")]
    Setup(String),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Teardown error
    #[error("Teardown error: {0}")]
    Teardown(String),
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// A running chainvoice server plus an HTTP client pointed at it.
pub struct TestServer {
    base_url: String,
    http: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Start a server on the volatile memory backend.
    ///
    /// This is the standard setup for most E2E tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to start.
    pub async fn start() -> Result<Self> {
        Self::start_with_config(StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        })
        .await
    }

    /// Start a server on the sled backend rooted at `data_dir`.
    ///
    /// Use this for tests that exercise durability across a server restart;
    /// the caller owns the directory so a second server can reopen it.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to start.
    pub async fn start_with_sled(data_dir: &Path) -> Result<Self> {
        Self::start_with_config(StorageConfig {
            backend: StorageBackend::Sled,
            data_dir: data_dir.to_path_buf(),
            ..StorageConfig::default()
        })
        .await
    }

    /// Start a server on the given storage configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened or the listener
    /// cannot bind.
    pub async fn start_with_config(config: StorageConfig) -> Result<Self> {
        let (store, ledger) =
            store::open_backend(&config).map_err(|e| HarnessError::Setup(e.to_string()))?;
        let signatures =
            SignatureVerifier::new(None).map_err(|e| HarnessError::Setup(e.to_string()))?;
        let state = AppState {
            store,
            verifier: Arc::new(LoginVerifier::new(ledger, signatures)),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| HarnessError::Setup(format!("bind listener: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| HarnessError::Setup(format!("read local addr: {e}")))?;
        let base_url = format!("http://{addr}");
        info!("Test server listening on {base_url}");

        let (shutdown, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, api::router(state)).with_graceful_shutdown(async {
                let _ = rx.await;
            });
            if let Err(e) = server.await {
                info!("Test server exited with error: {e}");
            }
        });

        // No connection pooling; graceful shutdown must not wait on an idle
        // keep-alive socket held by this client.
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url,
            http,
            shutdown: Some(shutdown),
            task,
        })
    }

    /// Base URL of the running server, e.g. `http://127.0.0.1:49301`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The HTTP client pointed at this server.
    #[must_use]
    pub fn client(&self) -> &reqwest::Client {
        &self.http
    }

    /// Absolute URL for `path` on this server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        Ok(self.http.get(self.url(path)).send().await?)
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent.
    pub async fn post_json(&self, path: &str, body: &Value) -> Result<reqwest::Response> {
        Ok(self.http.post(self.url(path)).json(body).send().await?)
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be sent.
    pub async fn put_json(&self, path: &str, body: &Value) -> Result<reqwest::Response> {
        Ok(self.http.put(self.url(path)).json(body).send().await?)
    }

    /// Stop the server and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not stop within the shutdown
    /// timeout or its task panicked.
    pub async fn teardown(mut self) -> Result<()> {
        info!("Tearing down test server at {}", self.base_url);
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        tokio::time::timeout(SHUTDOWN_TIMEOUT, self.task)
            .await
            .map_err(|_| HarnessError::Teardown("server did not stop in time".to_string()))?
            .map_err(|e| HarnessError::Teardown(format!("server task failed: {e}")))?;
        Ok(())
    }
}

/// A login request body signed by a throwaway wallet.
pub struct SignedLogin {
    /// Checksummed address of the signer.
    pub address: String,
    /// Nonce embedded in the signed message.
    pub nonce: String,
    /// JSON body ready for `POST /api/auth/verify`.
    pub body: Value,
}

impl SignedLogin {
    /// Generate a random wallet and sign a fresh login message with it.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn generate(domain: &str) -> Result<Self> {
        let signer = PrivateKeySigner::random();
        let address = signer.address().to_string();
        let message = SignInMessage::new(domain, &address);
        let nonce = message.nonce.clone();
        let text = message.to_string();
        let signature = signer
            .sign_message_sync(text.as_bytes())
            .map_err(|e| HarnessError::Setup(format!("sign login message: {e}")))?;

        let body = serde_json::json!({
            "address": address,
            "message": text,
            "signature": format!("0x{}", hex::encode(signature.as_bytes())),
        });
        Ok(Self {
            address,
            nonce,
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_error_display() {
        let err = HarnessError::Setup("port in use".to_string());
        assert!(err.to_string().contains("port in use"));
    }

    #[test]
    fn test_signed_login_shape() {
        let login = SignedLogin::generate("localhost:8000").expect("signs");
        assert!(login.address.starts_with("0x"));
        assert_eq!(login.nonce.len(), 32);
        assert_eq!(login.body["address"], login.address.as_str());
    }
}
