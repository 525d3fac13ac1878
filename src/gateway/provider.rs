//! Wallet provider seam.
//!
//! The gateway never reaches for a global wallet. Whatever plays the role of
//! the injected browser provider implements [`WalletProvider`] and is handed
//! to the gateway at construction, so tests can substitute a mock.

use std::sync::Arc;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::blockchain::types::ConfirmationStatus;
use crate::gateway::binding::LedgerContract;
use crate::gateway::error::ProviderResult;

/// Notifications pushed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The set of exposed accounts changed; empty means disconnected.
    AccountsChanged(Vec<Address>),
    /// The provider switched networks.
    ChainChanged(u64),
}

/// A native-currency transfer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub gas_limit: u64,
}

/// Account access, transfers and signer acquisition.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts already authorized, without prompting.
    async fn accounts(&self) -> ProviderResult<Vec<Address>>;

    /// Ask for account authorization. May stay pending until the user decides.
    async fn request_accounts(&self) -> ProviderResult<Vec<Address>>;

    /// Submit a plain value transfer; resolves once broadcast.
    async fn transfer(&self, request: TransferRequest) -> ProviderResult<TxHash>;

    /// Wait until `tx_hash` is buried under `confirmations` blocks.
    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u32,
    ) -> ProviderResult<ConfirmationStatus>;

    /// A signer bound to the active account.
    async fn signer(&self) -> ProviderResult<Arc<dyn ContractSigner>>;

    /// Subscribe to account and chain notifications.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// Something that can authorize contract calls for one account.
pub trait ContractSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Bind the contract at `address` described by `abi`.
    fn bind(&self, address: Address, abi: Arc<JsonAbi>) -> Arc<dyn LedgerContract>;
}
