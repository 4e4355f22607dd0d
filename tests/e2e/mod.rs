//! End-to-end tests for chainvoice.
//!
//! Each test runs a real server on an ephemeral port, wired through the same
//! backend-selection path as the production binary, and drives it over HTTP
//! the way the web client does.

mod harness;
mod integration_tests;

pub use harness::{HarnessError, SignedLogin, TestServer};
