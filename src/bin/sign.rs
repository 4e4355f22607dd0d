//! Login-message signing utility for chainvoice development.
//!
//! Generates (or accepts) a private key, builds a sign-in message with a
//! fresh nonce, signs it, and prints the JSON body ready to POST to
//! `/api/auth/verify`. Handy for exercising a running server without the
//! web client.
//!
//! Usage:
//!   cargo run --bin chainvoice-sign -- --domain localhost:8000

use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use chainvoice::auth::message::DEFAULT_CHAIN_ID;
use chainvoice::auth::SignInMessage;
use clap::Parser;
use serde_json::json;

/// Build and sign a wallet login message.
#[derive(Parser, Debug)]
#[command(name = "chainvoice-sign")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Hex private key to sign with; a random key is generated when omitted.
    #[arg(long, env = "CHAINVOICE_SIGNER_KEY", hide_env_values = true)]
    key: Option<String>,

    /// Domain presenting the sign-in request.
    #[arg(long, default_value = "localhost:8000")]
    domain: String,

    /// Statement line embedded in the message.
    #[arg(long)]
    statement: Option<String>,

    /// EIP-155 chain ID.
    #[arg(long, default_value_t = DEFAULT_CHAIN_ID)]
    chain_id: u64,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let signer = match &cli.key {
        Some(key) => key.trim().parse::<PrivateKeySigner>()?,
        None => {
            println!("No key given; generating a throwaway signer.\n");
            PrivateKeySigner::random()
        }
    };
    let address = signer.address();

    let mut message = SignInMessage::new(&cli.domain, &address.to_string());
    message.chain_id = cli.chain_id;
    if let Some(statement) = cli.statement {
        message.statement = statement;
    }
    let text = message.to_string();
    let signature = signer.sign_message_sync(text.as_bytes())?;

    println!("Signing address: {address}");
    println!("Nonce:           {}", message.nonce);
    println!("\n--- Message ---\n{text}\n--- End of message ---");

    let body = json!({
        "address": address.to_string(),
        "message": text,
        "signature": format!("0x{}", hex::encode(signature.as_bytes())),
    });

    println!("\nPOST /api/auth/verify body:\n");
    println!("{}", serde_json::to_string_pretty(&body)?);
    println!("\nExample:");
    println!("  curl -s -X POST http://{}/api/auth/verify \\", cli.domain);
    println!("    -H 'Content-Type: application/json' \\");
    println!("    -d @body.json");
    println!("\nEach run mints a fresh nonce; a body can log in exactly once.");

    Ok(())
}
