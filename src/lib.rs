//! chainvoice - invoice service with wallet-signature sign-in.
//!
//! Persists invoice records keyed by invoice number and verifies SIWE-style
//! wallet logins (nonce + EIP-191 signature, with ERC-1271 fallback for
//! smart-contract wallets), exposed over a small JSON HTTP API.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum)                    api::{auth, invoices}
//!        |                                  |
//!   LoginVerifier --- NonceLedger      InvoiceStore
//!   (auth)             (replay           (storage trait)
//!                       protection)          |
//!                          |           memory | sled | rest
//!                    memory | sled | rest
//! ```
//!
//! Exactly one storage backend is selected at startup
//! ([`store::open_backend`]); replay protection lives in the same backend
//! as the invoices.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod invoice;
pub mod store;

pub use auth::{LoginVerifier, SignInMessage, VerifiedLogin};
pub use client::ApiClient;
pub use config::{AppConfig, StorageBackend};
pub use error::{Error, Result};
pub use invoice::{InvoiceDraft, InvoiceRecord, InvoiceStatus};
pub use store::InvoiceStore;
