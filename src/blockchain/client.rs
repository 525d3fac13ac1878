//! Read-only chain access for the local wallet.
//!
//! The wallet needs the chain id to accept a connection and to notice
//! network switches. The transfer builder needs a nonce and a gas price,
//! and the confirmation tracker needs receipts and the head block. Each call
//! tries the primary node and then every failover in order, each one under
//! the configured RPC timeout.
//!
//! Signing never happens here; see [`crate::blockchain::wallet::LocalWalletProvider`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionReceipt;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainConfig, BlockchainError, BlockchainResult, ChainId};

/// Chain reader over an ordered list of RPC nodes.
#[derive(Clone)]
pub struct BlockchainClient {
    nodes: Vec<DynProvider>,
    config: BlockchainConfig,
    rpc_timeout: Duration,
}

impl BlockchainClient {
    /// Fails only on a malformed primary URL. A dead node or a chain-id
    /// mismatch is logged so the gateway still starts with degraded reads.
    pub async fn new(config: BlockchainConfig) -> BlockchainResult<Self> {
        let primary: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;

        let mut nodes = vec![ProviderBuilder::new().connect_http(primary).erased()];
        for raw in &config.failover_urls {
            match raw.parse::<url::Url>() {
                Ok(url) => nodes.push(ProviderBuilder::new().connect_http(url).erased()),
                Err(_) => tracing::warn!(url = %raw, "Ignoring invalid failover RPC URL"),
            }
        }

        let client = Self {
            nodes,
            rpc_timeout: Duration::from_secs(config.rpc_timeout_secs),
            config,
        };

        match client.verify_chain_id().await {
            Ok(()) => tracing::info!(
                rpc_url = %client.config.rpc_url,
                chain_id = client.config.chain_id,
                nodes = client.nodes.len(),
                "Chain client ready"
            ),
            Err(e) => tracing::warn!(error = %e, "Chain client started without a verified chain"),
        }

        Ok(client)
    }

    /// Run `call` against each node until one answers in time.
    async fn first_answer<T, E, F, Fut>(&self, method: &'static str, call: F) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        for (node, provider) in self.nodes.iter().enumerate() {
            match timeout(self.rpc_timeout, call(provider.clone())).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => tracing::warn!(node, method, error = %e, "RPC error, trying next node"),
                Err(_) => tracing::warn!(node, method, "RPC timeout, trying next node"),
            }
        }
        Err(BlockchainError::Rpc(format!("All RPC nodes failed: {method}")))
    }

    /// Fails with `ChainMismatch` when the node serves a different chain.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let actual = self.get_chain_id().await?.0;
        if actual != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual,
            });
        }
        Ok(())
    }

    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.first_answer("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.first_answer("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await
    }

    /// Pending-inclusive nonce for the signing account.
    pub async fn get_transaction_count(&self, address: Address) -> BlockchainResult<u64> {
        self.first_answer("eth_getTransactionCount", move |p| async move {
            p.get_transaction_count(address).await
        })
        .await
    }

    /// `None` while the transaction is still pending.
    pub async fn get_transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> BlockchainResult<Option<TransactionReceipt>> {
        self.first_answer("eth_getTransactionReceipt", move |p| async move {
            p.get_transaction_receipt(tx_hash).await
        })
        .await
    }

    /// Gas price in wei.
    pub async fn get_gas_price(&self) -> BlockchainResult<u128> {
        self.first_answer("eth_gasPrice", |p| async move { p.get_gas_price().await })
            .await
    }

    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    pub fn timeout_duration(&self) -> Duration {
        self.rpc_timeout
    }
}

impl fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
