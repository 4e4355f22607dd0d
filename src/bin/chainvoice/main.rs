//! chainvoice server entry point.

mod cli;

use chainvoice::api::{self, AppState};
use chainvoice::auth::signature::SignatureVerifier;
use chainvoice::auth::LoginVerifier;
use chainvoice::store;
use clap::Parser;
use cli::Cli;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("chainvoice v{}", env!("CARGO_PKG_VERSION"));

    // Build configuration
    let config = cli.into_config()?;

    // Wire storage, replay ledger and verifier
    let (store, ledger) = store::open_backend(&config.storage)?;
    let signatures = SignatureVerifier::new(config.auth.rpc_url.clone())?;
    let verifier = LoginVerifier::new(ledger, signatures);
    if verifier.contract_checks_enabled() {
        info!("ERC-1271 smart-wallet checks enabled");
    } else {
        info!("No RPC endpoint configured; key-recovery signatures only");
    }

    // Serve until shutdown
    let state = AppState {
        store,
        verifier: Arc::new(verifier),
    };
    api::serve(config.listen_addr, state).await?;

    info!("Goodbye!");
    Ok(())
}
