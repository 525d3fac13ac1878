//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the chain gateway service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP API settings.
    pub server: ServerConfig,

    /// Blockchain RPC and wallet settings.
    pub blockchain: BlockchainConfig,

    /// Ledger contract binding.
    pub contract: ContractConfig,

    /// Fixed loan-funding flow.
    pub loan: LoanConfig,

    /// Durable local key-value storage.
    pub storage: StorageConfig,

    /// Transaction record display settings.
    pub display: DisplayConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Request timeout in seconds. Write routes wait for a confirmation,
    /// so this must cover a block interval or two.
    pub request_timeout_secs: u64,

    /// Maximum body size in bytes.
    pub max_body_size: usize,

    /// Bearer token required on write routes. `None` leaves them open.
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 180,
            max_body_size: 64 * 1024,
            api_key: None,
        }
    }
}

/// Blockchain integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// Inject a wallet provider into the gateway. When false the gateway
    /// behaves as if no wallet is installed.
    pub enabled: bool,

    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs (reads only).
    #[serde(default)]
    pub failover_urls: Vec<String>,

    /// Chain ID (e.g., 11155111 for Sepolia, 31337 for local Anvil).
    pub chain_id: u64,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Number of block confirmations a write waits for.
    pub confirmation_blocks: u32,

    /// Give up waiting for confirmations after this many seconds.
    pub confirmation_timeout_secs: u64,

    /// Gas price multiplier for native transfers (1.0 = estimated).
    pub gas_price_multiplier: f64,

    /// Maximum gas price in gwei (protection against spikes).
    pub max_gas_price_gwei: u64,

    /// How often the chain watcher polls for a chain switch.
    pub chain_poll_interval_secs: u64,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rpc_url: "http://localhost:8545".to_string(),
            failover_urls: Vec::new(),
            chain_id: 31337,
            rpc_timeout_secs: 10,
            confirmation_blocks: 1,
            confirmation_timeout_secs: 120,
            gas_price_multiplier: 1.2,
            max_gas_price_gwei: 500,
            chain_poll_interval_secs: 15,
        }
    }
}

/// Ledger contract configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Deployed contract address (hex, 0x-prefixed).
    pub address: String,

    /// Path to the contract ABI (plain JSON array or a build artifact with an `abi` key).
    pub abi_path: String,

    /// Fixed gas-limit ceiling for `addToBlockchain`.
    pub donation_gas_limit: u64,

    /// Gas budget for a plain value transfer.
    pub transfer_gas_limit: u64,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            abi_path: "abi/Transactions.json".to_string(),
            donation_gas_limit: 300_000,
            transfer_gas_limit: 21_000,
        }
    }
}

/// Loan-funding flow settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoanConfig {
    /// Message recorded on the ledger for a loan funding.
    pub message: String,

    /// Keyword recorded on the ledger for a loan funding.
    pub keyword: String,
}

impl Default for LoanConfig {
    fn default() -> Self {
        Self {
            message: "Loan Funding".to_string(),
            keyword: "Loan".to_string(),
        }
    }
}

/// Durable key-value storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file backing the store. `None` keeps state in memory only.
    pub path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: Some("zakatgo-state.json".to_string()),
        }
    }
}

/// Display formatting for normalized transaction records.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// chrono format string for record timestamps.
    pub timestamp_format: String,

    /// Offset from UTC applied before formatting, in minutes.
    pub utc_offset_minutes: i32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timestamp_format: "%-m/%-d/%Y, %-I:%M:%S %p".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "compact").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
