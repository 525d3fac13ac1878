//! Startup orchestration.
//!
//! Subsystems come up in dependency order: storage, then the chain client and
//! wallet, then the gateway itself. Listeners are started by the caller once
//! the returned [`Runtime`] is ready.

use std::path::Path;
use std::sync::Arc;

use alloy::json_abi::JsonAbi;
use thiserror::Error;

use crate::blockchain::wallet::signer_from_env;
use crate::blockchain::{BlockchainClient, BlockchainError, LocalWalletProvider};
use crate::config::{load_abi, ConfigError, GatewayConfig, StorageConfig};
use crate::gateway::{ChainTransactionGateway, ContractSpec, GatewaySettings, WalletProvider};
use crate::storage::{LocalStore, StorageError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("blockchain: {0}")]
    Blockchain(#[from] BlockchainError),
}

/// Everything `main` needs to serve traffic.
pub struct Runtime {
    pub gateway: Arc<ChainTransactionGateway>,
    /// Present when `[blockchain] enabled = true`.
    pub wallet: Option<Arc<LocalWalletProvider>>,
}

/// Open the configured store, or an in-memory one when no path is set.
pub fn open_store(config: &StorageConfig) -> Result<LocalStore, StorageError> {
    match &config.path {
        Some(path) => LocalStore::open(path),
        None => {
            tracing::warn!("No storage path configured; transaction count will not survive restarts");
            Ok(LocalStore::in_memory())
        }
    }
}

/// Load the contract ABI named by the config.
pub fn load_contract_abi(config: &GatewayConfig) -> Result<JsonAbi, StartupError> {
    let abi = load_abi(Path::new(&config.contract.abi_path))?;
    tracing::info!(
        path = %config.contract.abi_path,
        functions = abi.functions().count(),
        "Contract ABI loaded"
    );
    Ok(abi)
}

/// Build the gateway and, when enabled, its wallet provider.
pub async fn assemble(config: &GatewayConfig, abi: JsonAbi) -> Result<Runtime, StartupError> {
    let store = Arc::new(open_store(&config.storage)?);

    let wallet = if config.blockchain.enabled {
        let client = BlockchainClient::new(config.blockchain.clone()).await?;
        let signer = signer_from_env()?;
        Some(Arc::new(LocalWalletProvider::new(client, signer)?))
    } else {
        tracing::warn!("Blockchain disabled; wallet operations will report no provider");
        None
    };

    let provider = wallet.clone().map(|w| w as Arc<dyn WalletProvider>);
    let settings = GatewaySettings::from_config(config, ContractSpec::new(config.contract.address.clone(), abi));
    let gateway = Arc::new(ChainTransactionGateway::new(provider, settings, store));

    Ok(Runtime { gateway, wallet })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_abi;

    #[tokio::test]
    async fn test_assemble_without_blockchain() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = GatewayConfig::default();
        config.storage.path = Some(dir.path().join("state.json").display().to_string());

        let abi = parse_abi(include_str!("../../abi/Transactions.json")).unwrap();
        let runtime = assemble(&config, abi).await.unwrap();

        assert!(runtime.wallet.is_none());
        assert!(!runtime.gateway.has_provider());
        assert_eq!(runtime.gateway.transaction_count().await, None);
    }

    #[test]
    fn test_open_store_in_memory_when_unset() {
        let config = StorageConfig { path: None };
        assert!(open_store(&config).unwrap().is_empty());
    }

    #[test]
    fn test_missing_abi_file() {
        let mut config = GatewayConfig::default();
        config.contract.abi_path = "/nonexistent/abi.json".into();
        assert!(matches!(
            load_contract_abi(&config),
            Err(StartupError::Config(ConfigError::Io(_)))
        ));
    }
}
