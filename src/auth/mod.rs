//! Wallet-signature login verification.
//!
//! Combines:
//! 1. Nonce extraction from the sign-in message (`message`)
//! 2. Replay protection through the nonce ledger (`ledger`)
//! 3. Signature verification, key recovery plus ERC-1271 (`signature`)
//!
//! A login proves control of an address once per nonce. Session tokens are
//! opaque random values handed back to the client; nothing server-side
//! stores or validates them afterwards.

pub mod ledger;
pub mod message;
pub mod signature;

use crate::error::{Error, Result};
use ledger::NonceLedger;
use signature::SignatureVerifier;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub use message::{extract_nonce, generate_nonce, SignInMessage};

/// Outcome of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedLogin {
    /// Checksummed form of the address that proved control of its key.
    pub address: String,
    /// Fresh opaque session token.
    pub session_token: String,
}

/// Verifies sign-in requests end to end.
pub struct LoginVerifier {
    ledger: Arc<dyn NonceLedger>,
    signatures: SignatureVerifier,
}

impl LoginVerifier {
    /// Wire a verifier from its two collaborators.
    #[must_use]
    pub fn new(ledger: Arc<dyn NonceLedger>, signatures: SignatureVerifier) -> Self {
        Self { ledger, signatures }
    }

    /// Verify one login attempt.
    ///
    /// The nonce is consumed only after the signature verifies, so a failed
    /// attempt does not burn the nonce; the consuming step itself is atomic,
    /// so two concurrent attempts with the same nonce cannot both win.
    ///
    /// # Errors
    ///
    /// * [`Error::Validation`] - a field is missing or empty
    /// * [`Error::MalformedMessage`] - no nonce line in the message
    /// * [`Error::ReplayDetected`] - the nonce was consumed before
    /// * [`Error::InvalidSignature`] - the signature does not verify
    /// * [`Error::Internal`] / [`Error::Store`] - ERC-1271 transport or
    ///   ledger failures
    pub async fn verify_login(
        &self,
        address: &str,
        message: &str,
        signature: &str,
    ) -> Result<VerifiedLogin> {
        // Step 1: All three fields must be present.
        if address.trim().is_empty() || message.trim().is_empty() || signature.trim().is_empty() {
            return Err(Error::Validation(
                "address, message and signature are required".to_string(),
            ));
        }

        // Step 2: The message must carry a well-formed nonce.
        let nonce = message::extract_nonce(message)?;

        // Step 3: Fail replays before doing any signature work.
        if self.ledger.contains(&nonce).await? {
            warn!("Replay attempt with consumed nonce {nonce}");
            return Err(Error::ReplayDetected);
        }

        // Step 4: The signature must verify for the claimed address.
        let verified = self.signatures.verify(address, message, signature).await?;

        // Step 5: Consume the nonce. Atomic, so of two racing requests
        // exactly one reaches this point first; the loser replays.
        if !self.ledger.check_and_mark(&nonce).await? {
            warn!("Nonce {nonce} consumed by a concurrent login");
            return Err(Error::ReplayDetected);
        }

        info!("Login verified for {verified}");
        Ok(VerifiedLogin {
            address: verified.to_string(),
            session_token: Uuid::new_v4().to_string(),
        })
    }

    /// True when ERC-1271 smart-wallet checks are available.
    #[must_use]
    pub fn contract_checks_enabled(&self) -> bool {
        self.signatures.contract_checks_enabled()
    }
}
