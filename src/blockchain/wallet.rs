//! Server-side wallet provider.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables
//! - Keys are never logged or serialized
//!
//! With no key configured the provider still answers reads, but every
//! authorization request is rejected and no signer is handed out.

use std::sync::Arc;
use std::time::Duration;

use alloy::json_abi::JsonAbi;
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, TxHash};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::contract::AlloyLedgerContract;
use crate::blockchain::transaction::{ConfirmationTracker, TransferBuilder};
use crate::blockchain::types::{BlockchainError, BlockchainResult, ConfirmationStatus};
use crate::gateway::binding::LedgerContract;
use crate::gateway::error::{ProviderError, ProviderResult};
use crate::gateway::provider::{ContractSigner, ProviderEvent, TransferRequest, WalletProvider};

/// Environment variable name for the private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "ZAKATGO_WALLET_PRIVATE_KEY";

const EVENT_CAPACITY: usize = 32;

/// Parse a hex-encoded private key (with or without 0x prefix).
pub fn signer_from_private_key(private_key_hex: &str) -> BlockchainResult<PrivateKeySigner> {
    let key_hex = private_key_hex.trim();
    let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

    key_hex
        .parse()
        .map_err(|e| BlockchainError::Wallet(format!("Invalid private key format: {}", e)))
}

/// Read the signing key from `ZAKATGO_WALLET_PRIVATE_KEY`.
///
/// An unset or empty variable is not an error; the gateway then runs read-only.
pub fn signer_from_env() -> BlockchainResult<Option<PrivateKeySigner>> {
    match std::env::var(PRIVATE_KEY_ENV_VAR) {
        Ok(value) if !value.trim().is_empty() => signer_from_private_key(&value).map(Some),
        _ => Ok(None),
    }
}

/// Wallet provider backed by a local key and a JSON-RPC node.
pub struct LocalWalletProvider {
    client: BlockchainClient,
    signer: Option<PrivateKeySigner>,
    /// Signing provider, built once when a key is present.
    signing: Option<DynProvider>,
    tracker: ConfirmationTracker,
    events: broadcast::Sender<ProviderEvent>,
}

impl LocalWalletProvider {
    pub fn new(client: BlockchainClient, signer: Option<PrivateKeySigner>) -> BlockchainResult<Self> {
        let signing = match &signer {
            Some(signer) => {
                let url: url::Url = client.config().rpc_url.parse().map_err(|e| {
                    BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", client.config().rpc_url, e))
                })?;
                let provider = ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer.clone()))
                    .connect_http(url)
                    .erased();
                tracing::info!(
                    address = %signer.address(),
                    chain_id = client.config().chain_id,
                    "Wallet initialized"
                );
                Some(provider)
            }
            None => {
                tracing::warn!(
                    env_var = PRIVATE_KEY_ENV_VAR,
                    "No wallet key configured; write operations will be rejected"
                );
                None
            }
        };

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let tracker = ConfirmationTracker::new(client.clone());

        Ok(Self {
            client,
            signer,
            signing,
            tracker,
            events,
        })
    }

    pub fn address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    /// Announce an account change to subscribers.
    pub fn announce_accounts(&self) {
        let accounts = self.address().into_iter().collect();
        let _ = self.events.send(ProviderEvent::AccountsChanged(accounts));
    }

    /// Poll the node's chain id and emit `ChainChanged` when it moves.
    pub async fn watch_chain(self: Arc<Self>, every: Duration, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_seen: Option<u64> = None;

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    let chain_id = match self.client.get_chain_id().await {
                        Ok(id) => id.0,
                        Err(e) => {
                            tracing::debug!(error = %e, "Chain poll failed");
                            continue;
                        }
                    };
                    if let Some(previous) = last_seen {
                        if previous != chain_id {
                            tracing::warn!(previous, current = chain_id, "Chain changed");
                            let _ = self.events.send(ProviderEvent::ChainChanged(chain_id));
                        }
                    }
                    last_seen = Some(chain_id);
                }
            }
        }
        tracing::debug!("Chain watcher stopped");
    }

    fn signing(&self) -> ProviderResult<(&PrivateKeySigner, &DynProvider)> {
        match (&self.signer, &self.signing) {
            (Some(signer), Some(provider)) => Ok((signer, provider)),
            _ => Err(ProviderError::SignerUnavailable(format!(
                "{} is not set",
                PRIVATE_KEY_ENV_VAR
            ))),
        }
    }
}

#[async_trait]
impl WalletProvider for LocalWalletProvider {
    async fn accounts(&self) -> ProviderResult<Vec<Address>> {
        Ok(self.address().into_iter().collect())
    }

    async fn request_accounts(&self) -> ProviderResult<Vec<Address>> {
        let Some(address) = self.address() else {
            return Err(ProviderError::Rejected("no wallet key configured".to_string()));
        };
        self.client.verify_chain_id().await?;
        Ok(vec![address])
    }

    async fn transfer(&self, request: TransferRequest) -> ProviderResult<TxHash> {
        let (signer, provider) = self.signing()?;
        if request.from != signer.address() {
            return Err(ProviderError::Rejected(format!(
                "account {} is not managed by this wallet",
                request.from
            )));
        }

        let tx = TransferBuilder::new(&self.client)
            .build(request.from, request.to, request.value, request.gas_limit)
            .await?;

        let rpc_timeout = self.client.timeout_duration();
        let pending = match timeout(rpc_timeout, provider.send_transaction(tx)).await {
            Ok(result) => result.map_err(|e| BlockchainError::Rpc(e.to_string()))?,
            Err(_) => return Err(BlockchainError::Timeout(rpc_timeout.as_secs()).into()),
        };

        let tx_hash = *pending.tx_hash();
        tracing::info!(tx_hash = %tx_hash, to = %request.to, "Transfer broadcast");
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u32,
    ) -> ProviderResult<ConfirmationStatus> {
        let timeout_secs = self.client.config().confirmation_timeout_secs;
        Ok(self
            .tracker
            .wait_for_confirmation(tx_hash, confirmations, timeout_secs)
            .await?)
    }

    async fn signer(&self) -> ProviderResult<Arc<dyn ContractSigner>> {
        let (signer, provider) = self.signing()?;
        Ok(Arc::new(LocalContractSigner {
            address: signer.address(),
            provider: provider.clone(),
            rpc_timeout: self.client.timeout_duration(),
        }))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// Signs ledger calls with the local key.
pub struct LocalContractSigner {
    address: Address,
    provider: DynProvider,
    rpc_timeout: Duration,
}

impl ContractSigner for LocalContractSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn bind(&self, address: Address, abi: Arc<JsonAbi>) -> Arc<dyn LedgerContract> {
        Arc::new(AlloyLedgerContract::new(
            address,
            self.provider.clone(),
            abi,
            self.rpc_timeout,
        ))
    }
}
