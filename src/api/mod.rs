//! HTTP interface.
//!
//! A small axum router over the injected store and verifier. Everything in
//! and out is JSON, CORS is wide open (`Access-Control-Allow-Origin: *`) so
//! the web client can call from any origin, and unknown routes / wrong
//! methods answer with JSON bodies rather than bare statuses.

pub mod auth;
pub mod invoices;

use crate::auth::LoginVerifier;
use crate::error::{Error, Result};
use crate::store::InvoiceStore;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Invoice persistence, chosen at startup.
    pub store: Arc<dyn InvoiceStore>,
    /// Login verification.
    pub verifier: Arc<LoginVerifier>,
}

/// JSON error body: `{"error": ...}` plus `details` on server faults.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// What went wrong, in client terms.
    pub error: String,
    /// Underlying failure text; present on 500s only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Wrapper mapping crate errors onto HTTP responses.
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_client_error() {
            debug!("Request rejected: {}", self.0);
        } else {
            warn!("Request failed: {}", self.0);
        }
        let (status, body) = match self.0 {
            Error::Validation(msg) | Error::MalformedMessage(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: msg,
                    details: None,
                },
            ),
            Error::ReplayDetected => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "Nonce already used".to_string(),
                    details: None,
                },
            ),
            Error::InvalidSignature => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    error: "Invalid signature".to_string(),
                    details: None,
                },
            ),
            Error::NotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "Invoice not found".to_string(),
                    details: None,
                },
            ),
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: "Internal server error".to_string(),
                    details: Some(other.to_string()),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the full route table over `state`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index).options(preflight))
        .route("/api", get(index).options(preflight))
        .route("/api/auth/verify", post(auth::verify).options(preflight))
        .route("/api/save-invoice", post(invoices::save).options(preflight))
        .route(
            "/api/get-invoice/{invoice_number}",
            get(invoices::get_one).options(preflight),
        )
        .route("/api/update-invoice", put(invoices::update).options(preflight))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Bind `addr` and serve until ctrl-c.
///
/// # Errors
///
/// Returns an error when the listener cannot bind or the server fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP API stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            // No signal handler means no graceful shutdown, but the server
            // itself keeps running.
            warn!("Failed to install shutdown handler: {e}");
            std::future::pending::<()>().await;
        }
    }
}

/// Service index: name, version and the route table.
async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "service": "chainvoice",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "verify": "POST /api/auth/verify",
            "saveInvoice": "POST /api/save-invoice",
            "getInvoice": "GET /api/get-invoice/{invoiceNumber}",
            "updateInvoice": "PUT /api/update-invoice",
        },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// Plain 200 for OPTIONS; the CORS layer fills in the headers.
async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn not_found(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found", "path": uri.path() })),
    )
}

async fn method_not_allowed() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}
