//! Wallet signature verification.
//!
//! Two paths, tried in order:
//!
//! 1. Key recovery: recover the signer from the EIP-191 (`personal_sign`)
//!    digest of the message and compare with the claimed address. Covers
//!    externally-owned accounts.
//! 2. ERC-1271: when recovery does not match and an RPC endpoint is
//!    configured, ask the claimed address itself via an
//!    `isValidSignature(bytes32,bytes)` `eth_call`. Covers smart-contract
//!    wallets, whose signatures are not recoverable.

use crate::error::{Error, Result};
use alloy::primitives::{eip191_hash_message, Address, Signature, B256};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Selector of `isValidSignature(bytes32,bytes)`.
const ERC1271_SELECTOR: [u8; 4] = [0x16, 0x26, 0xba, 0x7e];

/// A valid ERC-1271 signature echoes the selector back as the return value.
const ERC1271_MAGIC: &str = "0x1626ba7e";

const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Verifies login signatures against a claimed address.
pub struct SignatureVerifier {
    rpc: Option<RpcClient>,
}

impl SignatureVerifier {
    /// Build a verifier. With `rpc_url` unset, only key-recovery signatures
    /// verify and smart-wallet logins are rejected as invalid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] when the HTTP client cannot be built.
    pub fn new(rpc_url: Option<String>) -> Result<Self> {
        let rpc = rpc_url
            .filter(|u| !u.is_empty())
            .map(RpcClient::new)
            .transpose()?;
        Ok(Self { rpc })
    }

    /// True when ERC-1271 fallback is available.
    #[must_use]
    pub fn contract_checks_enabled(&self) -> bool {
        self.rpc.is_some()
    }

    /// Verify that `signature` covers `message` and was produced by
    /// `claimed`. Returns the parsed address on success.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidSignature`] when verification fails for any
    /// input-side reason (unparseable address or hex included), and
    /// [`Error::Internal`] when the ERC-1271 transport fails.
    pub async fn verify(&self, claimed: &str, message: &str, signature: &str) -> Result<Address> {
        let Ok(address) = claimed.trim().parse::<Address>() else {
            debug!("Claimed address does not parse: {claimed}");
            return Err(Error::InvalidSignature);
        };
        let sig_bytes = decode_signature_hex(signature)?;

        if sig_bytes.len() == 65 {
            if let Ok(sig) = Signature::from_raw(&sig_bytes) {
                match sig.recover_address_from_msg(message.as_bytes()) {
                    Ok(recovered) if recovered == address => {
                        debug!("Signature verified by key recovery for {address}");
                        return Ok(address);
                    }
                    Ok(recovered) => {
                        debug!("Recovered {recovered}, claimed {address}");
                    }
                    Err(e) => {
                        debug!("Key recovery failed: {e}");
                    }
                }
            }
        }

        if let Some(rpc) = &self.rpc {
            let digest = eip191_hash_message(message);
            if rpc.is_valid_signature(address, &digest, &sig_bytes).await? {
                debug!("Signature verified via ERC-1271 for {address}");
                return Ok(address);
            }
        }

        Err(Error::InvalidSignature)
    }
}

/// Decode a `0x`-prefixed (or bare) hex signature.
fn decode_signature_hex(signature: &str) -> Result<Vec<u8>> {
    let trimmed = signature.trim();
    let bare = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(bare).map_err(|_| Error::InvalidSignature)
}

/// Minimal JSON-RPC client for `eth_call`.
struct RpcClient {
    http: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
struct RpcReply {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl RpcClient {
    fn new(url: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("build http client: {e}")))?;
        Ok(Self { http, url })
    }

    /// Ask the contract at `account` whether `signature` is valid for
    /// `digest`. An execution error (revert, not a contract) is a plain
    /// "invalid"; only transport failures surface as errors.
    async fn is_valid_signature(
        &self,
        account: Address,
        digest: &B256,
        signature: &[u8],
    ) -> Result<bool> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": account.to_string(), "data": erc1271_call_data(digest, signature) },
                "latest",
            ],
        });
        let reply: RpcReply = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("rpc request failed: {e}")))?
            .json()
            .await
            .map_err(|e| Error::Internal(format!("rpc reply decode: {e}")))?;

        if let Some(err) = reply.error {
            debug!("eth_call rejected ({}): {}", err.code, err.message);
            return Ok(false);
        }
        Ok(reply
            .result
            .is_some_and(|r| r.to_lowercase().starts_with(ERC1271_MAGIC)))
    }
}

/// ABI-encode the `isValidSignature(bytes32 hash, bytes signature)` call:
/// selector, digest word, offset word (0x40), length word, padded bytes.
fn erc1271_call_data(digest: &B256, signature: &[u8]) -> String {
    let padded_len = signature.len().div_ceil(32) * 32;
    let mut data = Vec::with_capacity(4 + 32 * 3 + padded_len);
    data.extend_from_slice(&ERC1271_SELECTOR);
    data.extend_from_slice(digest.as_slice());
    data.extend_from_slice(&abi_word(0x40));
    data.extend_from_slice(&abi_word(signature.len() as u64));
    data.extend_from_slice(signature);
    data.resize(4 + 32 * 3 + padded_len, 0);
    format!("0x{}", hex::encode(data))
}

fn abi_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}
