//! Blockchain integration subsystem.
//!
//! # Data Flow
//! ```text
//! Environment Variables (private key) + [blockchain] config
//!     → wallet.rs (key loading, WalletProvider implementation)
//!     → client.rs (read-only RPC with timeouts and failover)
//!     → transaction.rs (transfer building, confirmation polling)
//!     → contract.rs (ledger ABI binding and row decoding)
//! ```
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or sensitive data
//! - All RPC calls have configurable timeouts
//! - Graceful degradation when blockchain unreachable

pub mod client;
pub mod contract;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::BlockchainClient;
pub use contract::{AlloyLedgerContract, TransferLayout};
pub use transaction::ConfirmationTracker;
pub use types::{BlockchainConfig, BlockchainError, ChainId, ConfirmationStatus};
pub use wallet::{LocalWalletProvider, PRIVATE_KEY_ENV_VAR};
