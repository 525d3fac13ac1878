//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! gateway.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!
//! contract.abi_path
//!     → loader.rs (plain ABI array or build artifact)
//!     → JsonAbi handed to the gateway
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_abi, load_config, ConfigError};
pub use schema::{
    BlockchainConfig, ContractConfig, DisplayConfig, GatewayConfig, LoanConfig,
    ObservabilityConfig, ServerConfig, StorageConfig,
};
