//! Sign-in message format and nonce handling.
//!
//! Login messages follow the EIP-4361 ("Sign-In with Ethereum") layout the
//! web client renders. The verifier stays deliberately loose about the rest
//! of the message: the only part it parses is the `Nonce:` line, which must
//! carry exactly 32 lowercase hex characters.

use crate::error::{Error, Result};
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use uuid::Uuid;

/// Chain ID the web client signs in against (Base mainnet).
pub const DEFAULT_CHAIN_ID: u64 = 8453;

const DEFAULT_STATEMENT: &str = "Sign in to Chainvoice";

/// Matches a `Nonce: <32 lowercase hex>` line. Uppercase hex and nonces of
/// any other length do not count as a nonce line at all.
#[allow(clippy::expect_used)] // constant pattern
static NONCE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Nonce: ([0-9a-f]{32})\s*$").expect("nonce pattern compiles")
});

/// Generate a fresh login nonce: 32 lowercase hex characters.
#[must_use]
pub fn generate_nonce() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Pull the nonce out of a login message.
///
/// # Errors
///
/// Returns [`Error::MalformedMessage`] when no well-formed nonce line is
/// present.
pub fn extract_nonce(message: &str) -> Result<String> {
    NONCE_LINE
        .captures(message)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::MalformedMessage("no nonce line in message".to_string()))
}

/// A sign-in message in the layout the web client signs.
#[derive(Debug, Clone)]
pub struct SignInMessage {
    /// Host presenting the sign-in request.
    pub domain: String,
    /// Account that is signing in.
    pub address: String,
    /// Human-readable purpose line.
    pub statement: String,
    /// URI of the signing origin.
    pub uri: String,
    /// EIP-155 chain ID.
    pub chain_id: u64,
    /// Fresh 32-hex nonce.
    pub nonce: String,
    /// RFC 3339 issue timestamp.
    pub issued_at: String,
}

impl SignInMessage {
    /// Build a message for `address` at `domain` with fresh nonce and
    /// timestamp, defaulting the remaining fields the way the web client
    /// does.
    #[must_use]
    pub fn new(domain: &str, address: &str) -> Self {
        Self {
            domain: domain.to_string(),
            address: address.to_string(),
            statement: DEFAULT_STATEMENT.to_string(),
            uri: format!("https://{domain}"),
            chain_id: DEFAULT_CHAIN_ID,
            nonce: generate_nonce(),
            issued_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

impl fmt::Display for SignInMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{domain} wants you to sign in with your Ethereum account:\n\
             {address}\n\
             \n\
             {statement}\n\
             \n\
             URI: {uri}\n\
             Version: 1\n\
             Chain ID: {chain_id}\n\
             Nonce: {nonce}\n\
             Issued At: {issued_at}",
            domain = self.domain,
            address = self.address,
            statement = self.statement,
            uri = self.uri,
            chain_id = self.chain_id,
            nonce = self.nonce,
            issued_at = self.issued_at,
        )
    }
}
