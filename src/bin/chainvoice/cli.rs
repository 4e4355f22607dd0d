//! Command-line interface definition.

use chainvoice::config::{AppConfig, StorageBackend};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Invoice service with wallet-signature sign-in.
#[derive(Parser, Debug)]
#[command(name = "chainvoice")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Address to bind the HTTP API to.
    #[arg(long, short, env = "CHAINVOICE_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Storage backend.
    #[arg(long, value_enum, env = "CHAINVOICE_BACKEND")]
    pub backend: Option<CliBackend>,

    /// Directory for the embedded store's data files.
    #[arg(long, env = "CHAINVOICE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Base URL of the REST cache (rest backend).
    #[arg(long, env = "CHAINVOICE_CACHE_URL")]
    pub cache_url: Option<String>,

    /// Bearer token for the REST cache.
    #[arg(long, env = "CHAINVOICE_CACHE_TOKEN", hide_env_values = true)]
    pub cache_token: Option<String>,

    /// EVM JSON-RPC endpoint for ERC-1271 smart-wallet checks.
    #[arg(long, env = "CHAINVOICE_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

/// Storage backend CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliBackend {
    /// In-process maps, volatile.
    Memory,
    /// Embedded file-backed KV store.
    Sled,
    /// Remote Redis-compatible REST cache.
    Rest,
}

impl Cli {
    /// Convert CLI arguments into an `AppConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn into_config(self) -> color_eyre::Result<AppConfig> {
        // Start with default config or load from file
        let mut config = if let Some(ref path) = self.config {
            AppConfig::from_file(path)?
        } else {
            AppConfig::default()
        };

        // Override with CLI arguments
        if let Some(listen) = self.listen {
            config.listen_addr = listen;
        }
        if let Some(backend) = self.backend {
            config.storage.backend = backend.into();
        }
        if let Some(data_dir) = self.data_dir {
            config.storage.data_dir = data_dir;
        }
        if let Some(cache_url) = self.cache_url {
            config.storage.cache_url = Some(cache_url);
        }
        if let Some(cache_token) = self.cache_token {
            config.storage.cache_token = Some(cache_token);
        }
        if let Some(rpc_url) = self.rpc_url {
            config.auth.rpc_url = Some(rpc_url);
        }
        config.log_level = self.log_level;

        Ok(config)
    }
}

impl From<CliBackend> for StorageBackend {
    fn from(b: CliBackend) -> Self {
        match b {
            CliBackend::Memory => StorageBackend::Memory,
            CliBackend::Sled => StorageBackend::Sled,
            CliBackend::Rest => StorageBackend::Rest,
        }
    }
}
