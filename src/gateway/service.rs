//! The chain transaction gateway.
//!
//! Bridges API actions to one deployed ledger contract and keeps an
//! in-memory, display-ready view of what the contract holds.
//!
//! # Failure policy
//! - Writes (`send_donation`, `fund_fixed_recipient`) always return their errors.
//! - Reads (`fetch_*`, `refresh_transaction_count`) log and degrade to an
//!   empty list or the stale count.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::blockchain::types::ConfirmationStatus;
use crate::config::GatewayConfig;
use crate::gateway::binding::{
    parse_recipient, AddToBlockchainCall, ContractMethod, ContractSpec, LedgerContract,
    RawTransfer,
};
use crate::gateway::error::{GatewayError, GatewayResult, ProviderError};
use crate::gateway::provider::{ProviderEvent, TransferRequest, WalletProvider};
use crate::gateway::records::{RecordFormatter, TransactionRecord};
use crate::gateway::session::{LoadingGuard, PendingFormData, WalletSession};
use crate::gateway::units::parse_eth_amount;
use crate::observability::metrics;
use crate::resilience::SingleFlight;
use crate::storage::{KeyValueStore, TRANSACTION_COUNT_KEY};

/// Single-flight key shared by every money-moving operation.
pub const SEND_KEY: &str = "send";

/// Static settings the gateway runs with.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub contract: ContractSpec,
    pub donation_gas_limit: u64,
    pub transfer_gas_limit: u64,
    pub confirmations: u32,
    pub loan_message: String,
    pub loan_keyword: String,
    pub formatter: RecordFormatter,
}

impl GatewaySettings {
    pub fn from_config(config: &GatewayConfig, contract: ContractSpec) -> Self {
        Self {
            contract,
            donation_gas_limit: config.contract.donation_gas_limit,
            transfer_gas_limit: config.contract.transfer_gas_limit,
            confirmations: config.blockchain.confirmation_blocks,
            loan_message: config.loan.message.clone(),
            loan_keyword: config.loan.keyword.clone(),
            formatter: RecordFormatter::new(&config.display),
        }
    }
}

/// A donation as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationRequest {
    pub recipient: String,
    /// Decimal ETH string.
    pub amount: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub keyword: String,
}

impl From<PendingFormData> for DonationRequest {
    fn from(form: PendingFormData) -> Self {
        Self {
            recipient: form.recipient,
            amount: form.amount,
            message: form.message,
            keyword: form.keyword,
        }
    }
}

/// Outcome of a confirmed donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonationReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// Base units sent to the contract.
    pub amount_base_units: U256,
}

/// Outcome of a fully recorded loan funding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FundingReceipt {
    pub transfer_hash: TxHash,
    pub ledger_hash: TxHash,
    pub amount_base_units: U256,
}

/// Owns the wallet session and the display view of the ledger.
pub struct ChainTransactionGateway {
    provider: Option<Arc<dyn WalletProvider>>,
    settings: GatewaySettings,
    store: Arc<dyn KeyValueStore>,
    session: RwLock<WalletSession>,
    transactions: RwLock<Vec<TransactionRecord>>,
    zakat_transactions: RwLock<Vec<TransactionRecord>>,
    transaction_count: RwLock<Option<u64>>,
    pending_form: Mutex<PendingFormData>,
    loading: AtomicBool,
    flights: SingleFlight,
}

impl ChainTransactionGateway {
    /// `provider` is `None` when no wallet is available at all.
    pub fn new(
        provider: Option<Arc<dyn WalletProvider>>,
        settings: GatewaySettings,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let cached = stored_count(store.as_ref());
        Self {
            provider,
            settings,
            store,
            session: RwLock::new(WalletSession::disconnected()),
            transactions: RwLock::new(Vec::new()),
            zakat_transactions: RwLock::new(Vec::new()),
            transaction_count: RwLock::new(cached),
            pending_form: Mutex::new(PendingFormData::default()),
            loading: AtomicBool::new(false),
            flights: SingleFlight::new(),
        }
    }

    // ----------------------------------------------------------------------
    // Accessors
    // ----------------------------------------------------------------------

    pub async fn session(&self) -> WalletSession {
        self.session.read().await.clone()
    }

    /// True while a write is between validation and its final refresh.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub async fn transactions(&self) -> Vec<TransactionRecord> {
        self.transactions.read().await.clone()
    }

    pub async fn zakat_transactions(&self) -> Vec<TransactionRecord> {
        self.zakat_transactions.read().await.clone()
    }

    /// Last known count; may be stale.
    pub async fn transaction_count(&self) -> Option<u64> {
        *self.transaction_count.read().await
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    pub fn subscribe_provider_events(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        self.provider.as_ref().map(|p| p.subscribe())
    }

    fn provider(&self) -> GatewayResult<&Arc<dyn WalletProvider>> {
        self.provider.as_ref().ok_or(GatewayError::ProviderUnavailable)
    }

    // ----------------------------------------------------------------------
    // Session lifecycle
    // ----------------------------------------------------------------------

    /// Restore cached state and pick up an already-authorized wallet.
    pub async fn initialize(&self) {
        *self.transaction_count.write().await = stored_count(self.store.as_ref());
        self.check_if_wallet_is_connected().await;
        if self.provider.is_some() {
            self.refresh_transaction_count().await;
        }
    }

    /// Look for authorized accounts without prompting.
    pub async fn check_if_wallet_is_connected(&self) -> Option<Address> {
        let Some(provider) = self.provider.as_ref() else {
            tracing::warn!("No wallet provider; skipping account check");
            return None;
        };

        match provider.accounts().await {
            Ok(accounts) => match accounts.first() {
                Some(&address) => {
                    *self.session.write().await = WalletSession::connected(address);
                    tracing::info!(address = %address, "Wallet already connected");
                    self.fetch_all_transactions().await;
                    Some(address)
                }
                None => {
                    tracing::info!("No authorized accounts found");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to query wallet accounts");
                None
            }
        }
    }

    /// Request account authorization, then reload all chain state.
    pub async fn connect(&self) -> GatewayResult<WalletSession> {
        let provider = self.provider()?;

        let previous = {
            let mut session = self.session.write().await;
            let previous = session.clone();
            *session = WalletSession::connecting(&previous);
            previous
        };
        tracing::info!("Requesting wallet authorization");

        let address = match provider.request_accounts().await {
            Ok(accounts) => accounts.first().copied(),
            Err(e) => {
                *self.session.write().await = previous;
                tracing::warn!(error = %e, "Wallet authorization failed");
                return Err(GatewayError::WalletConnectionRejected(e.to_string()));
            }
        };
        let Some(address) = address else {
            *self.session.write().await = previous;
            tracing::warn!("Wallet authorized no accounts");
            return Err(GatewayError::WalletConnectionRejected(
                "provider returned no accounts".into(),
            ));
        };

        *self.session.write().await = WalletSession::connected(address);
        tracing::info!(address = %address, "Wallet connected");

        self.reload().await;
        Ok(self.session().await)
    }

    /// Drop all chain-derived state and rebuild it from scratch.
    pub async fn reload(&self) {
        tracing::debug!("Reloading chain state");
        self.transactions.write().await.clear();
        self.zakat_transactions.write().await.clear();
        self.initialize().await;
    }

    /// Apply a provider notification.
    pub async fn handle_provider_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    *self.session.write().await = WalletSession::disconnected();
                    tracing::info!("Wallet disconnected");
                }
                Some(&address) => {
                    *self.session.write().await = WalletSession::connected(address);
                    tracing::info!(address = %address, "Active account changed");
                }
            },
            ProviderEvent::ChainChanged(chain_id) => {
                tracing::info!(chain_id, "Chain changed; resetting session");
                *self.session.write().await = WalletSession::disconnected();
                self.reload().await;
            }
        }
    }

    // ----------------------------------------------------------------------
    // Binding
    // ----------------------------------------------------------------------

    /// Validate the contract config, get a signer, and bind the contract.
    pub async fn build_contract_binding(&self) -> GatewayResult<Arc<dyn LedgerContract>> {
        let address = self.settings.contract.validate()?;
        let provider = self.provider()?;

        let signer = provider.signer().await.map_err(|e| {
            tracing::warn!(error = %e, "Could not obtain signer");
            GatewayError::SignerUnavailable(e.to_string())
        })?;

        tracing::debug!(contract = %address, signer = %signer.address(), "Contract bound");
        Ok(signer.bind(address, self.settings.contract.abi.clone()))
    }

    // ----------------------------------------------------------------------
    // Writes
    // ----------------------------------------------------------------------

    /// Record a donation on the ledger, forwarding the same amount as value.
    pub async fn send_donation(&self, request: DonationRequest) -> GatewayResult<DonationReceipt> {
        let result = self.send_donation_inner(&request).await;
        metrics::record_write("donation", outcome(&result));
        result
    }

    async fn send_donation_inner(&self, request: &DonationRequest) -> GatewayResult<DonationReceipt> {
        let _flight = self
            .flights
            .try_acquire(SEND_KEY)
            .ok_or_else(|| GatewayError::OperationInFlight(SEND_KEY.into()))?;
        let _loading = LoadingGuard::raise(&self.loading);

        let amount = parse_eth_amount(&request.amount)?;
        let recipient = parse_recipient(&request.recipient)?;
        let contract = self.build_contract_binding().await?;
        let provider = self.provider()?;

        let call = AddToBlockchainCall {
            receiver: recipient,
            amount,
            message: request.message.clone(),
            keyword: request.keyword.clone(),
            value: amount,
            gas_limit: self.settings.donation_gas_limit,
        };

        let started = Instant::now();
        let tx_hash = contract.add_to_blockchain(call).await.map_err(|e| {
            tracing::error!(recipient = %recipient, error = %e, "Donation submission failed");
            GatewayError::TransactionFailed(e.to_string())
        })?;
        tracing::info!(tx_hash = %tx_hash, recipient = %recipient, amount = %amount, "Donation submitted");

        let block_number = self.await_confirmation(provider.as_ref(), tx_hash).await?;
        metrics::record_confirmation("donation", started);
        tracing::info!(tx_hash = %tx_hash, block_number, "Donation confirmed");

        self.refresh_transaction_count().await;
        self.fetch_all_transactions().await;

        Ok(DonationReceipt {
            tx_hash,
            block_number,
            amount_base_units: amount,
        })
    }

    /// Transfer `amount` to `recipient`, then record it on the ledger.
    ///
    /// Success means both steps landed. Once the transfer is broadcast every
    /// error carries its hash: `TransferUnconfirmed` if it never confirmed,
    /// `PartialFundingFailure` if it did but the ledger write failed.
    pub async fn fund_fixed_recipient(
        &self,
        recipient: &str,
        amount: &str,
    ) -> GatewayResult<FundingReceipt> {
        let result = self.fund_fixed_recipient_inner(recipient, amount).await;
        metrics::record_write("loan_funding", outcome(&result));
        result
    }

    async fn fund_fixed_recipient_inner(
        &self,
        recipient: &str,
        amount: &str,
    ) -> GatewayResult<FundingReceipt> {
        let _flight = self
            .flights
            .try_acquire(SEND_KEY)
            .ok_or_else(|| GatewayError::OperationInFlight(SEND_KEY.into()))?;
        let _loading = LoadingGuard::raise(&self.loading);

        let amount = parse_eth_amount(amount)?;
        let recipient = parse_recipient(recipient)?;
        let contract = self.build_contract_binding().await?;
        let provider = self.provider()?;

        let session = self.session().await;
        let from = match session.address {
            Some(address) if session.is_connected => address,
            _ => {
                return Err(GatewayError::TransactionFailed(
                    "wallet is not connected".into(),
                ))
            }
        };

        // Phase 1: move the funds.
        let started = Instant::now();
        let transfer_hash = provider
            .transfer(TransferRequest {
                from,
                to: recipient,
                value: amount,
                gas_limit: self.settings.transfer_gas_limit,
            })
            .await
            .map_err(|e| {
                tracing::error!(recipient = %recipient, error = %e, "Loan transfer failed");
                GatewayError::TransactionFailed(e.to_string())
            })?;
        // From here on every failure must carry the transfer hash.
        self.await_confirmation(provider.as_ref(), transfer_hash)
            .await
            .map_err(|e| {
                tracing::error!(
                    transfer_hash = %transfer_hash,
                    error = %e,
                    "Loan transfer broadcast but not confirmed; reconcile before retrying"
                );
                GatewayError::TransferUnconfirmed {
                    transfer_hash,
                    reason: e.to_string(),
                }
            })?;
        metrics::record_confirmation("loan_transfer", started);
        tracing::info!(tx_hash = %transfer_hash, recipient = %recipient, "Loan transfer confirmed");

        // Phase 2: record it. Funds already moved, so no value is attached.
        let call = AddToBlockchainCall {
            receiver: recipient,
            amount,
            message: self.settings.loan_message.clone(),
            keyword: self.settings.loan_keyword.clone(),
            value: U256::ZERO,
            gas_limit: self.settings.donation_gas_limit,
        };
        let ledger_hash = match self.record_ledger_entry(contract.as_ref(), provider.as_ref(), call).await {
            Ok(hash) => hash,
            Err(reason) => {
                tracing::error!(
                    transfer_hash = %transfer_hash,
                    reason = %reason,
                    "Loan funded but not recorded; manual reconciliation required"
                );
                return Err(GatewayError::PartialFundingFailure {
                    transfer_hash,
                    reason,
                });
            }
        };

        self.refresh_transaction_count().await;
        self.fetch_all_transactions().await;

        Ok(FundingReceipt {
            transfer_hash,
            ledger_hash,
            amount_base_units: amount,
        })
    }

    async fn record_ledger_entry(
        &self,
        contract: &dyn LedgerContract,
        provider: &dyn WalletProvider,
        call: AddToBlockchainCall,
    ) -> Result<TxHash, String> {
        let hash = contract.add_to_blockchain(call).await.map_err(|e| e.to_string())?;
        self.await_confirmation(provider, hash)
            .await
            .map_err(|e| e.to_string())?;
        Ok(hash)
    }

    async fn await_confirmation(
        &self,
        provider: &dyn WalletProvider,
        tx_hash: TxHash,
    ) -> GatewayResult<u64> {
        let status = provider
            .wait_for_confirmation(tx_hash, self.settings.confirmations)
            .await
            .map_err(|e| {
                tracing::error!(tx_hash = %tx_hash, error = %e, "Confirmation failed");
                GatewayError::TransactionFailed(e.to_string())
            })?;

        match status {
            ConfirmationStatus::Confirmed { block_number } => Ok(block_number),
            ConfirmationStatus::Failed { reason } => {
                tracing::error!(tx_hash = %tx_hash, reason = %reason, "Transaction failed on-chain");
                Err(GatewayError::TransactionFailed(reason))
            }
            other => Err(GatewayError::TransactionFailed(format!(
                "transaction {} not confirmed: {:?}",
                tx_hash, other
            ))),
        }
    }

    // ----------------------------------------------------------------------
    // Scratch form
    // ----------------------------------------------------------------------

    pub async fn pending_form(&self) -> PendingFormData {
        self.pending_form.lock().await.clone()
    }

    pub async fn update_pending_form(&self, form: PendingFormData) {
        *self.pending_form.lock().await = form;
    }

    /// Submit the stored form as a donation; the form is cleared only on success.
    pub async fn submit_pending_form(&self) -> GatewayResult<DonationReceipt> {
        let form = self.pending_form().await;
        let receipt = self.send_donation(form.into()).await?;
        self.pending_form.lock().await.clear();
        Ok(receipt)
    }

    // ----------------------------------------------------------------------
    // Reads (fail-soft)
    // ----------------------------------------------------------------------

    /// Replace the transaction list with the full ledger.
    pub async fn fetch_all_transactions(&self) -> Vec<TransactionRecord> {
        let records = match self.read_all_rows().await {
            Ok(rows) => {
                metrics::record_read("all_transactions", "ok");
                self.settings.formatter.normalize_all(&rows)
            }
            Err(e) => {
                metrics::record_read("all_transactions", "error");
                tracing::warn!(error = %e, "Failed to fetch transactions; showing none");
                Vec::new()
            }
        };

        *self.transactions.write().await = records.clone();
        records
    }

    /// Replace the Zakat list, using the full ledger on contracts without
    /// `getZakatTransactions`.
    pub async fn fetch_zakat_transactions(&self) -> Vec<TransactionRecord> {
        let records = match self.read_zakat_rows().await {
            Ok(rows) => {
                metrics::record_read("zakat_transactions", "ok");
                self.settings.formatter.normalize_all(&rows)
            }
            Err(e) => {
                metrics::record_read("zakat_transactions", "error");
                tracing::warn!(error = %e, "Failed to fetch Zakat transactions; showing none");
                Vec::new()
            }
        };

        *self.zakat_transactions.write().await = records.clone();
        records
    }

    /// Re-read the ledger size and persist it. Keeps the stale value on failure.
    pub async fn refresh_transaction_count(&self) -> Option<u64> {
        match self.read_count().await {
            Ok(count) => {
                metrics::record_read("transaction_count", "ok");
                metrics::record_transaction_count(count);
                if let Err(e) = self.store.set(TRANSACTION_COUNT_KEY, &count.to_string()) {
                    tracing::warn!(error = %e, "Failed to persist transaction count");
                }
                *self.transaction_count.write().await = Some(count);
                Some(count)
            }
            Err(e) => {
                metrics::record_read("transaction_count", "error");
                let stale = *self.transaction_count.read().await;
                tracing::warn!(error = %e, stale = ?stale, "Failed to refresh transaction count");
                stale
            }
        }
    }

    async fn read_all_rows(&self) -> Result<Vec<RawTransfer>, String> {
        let contract = self.build_contract_binding().await.map_err(|e| e.to_string())?;
        if !contract.supports(ContractMethod::GetAllTransactions) {
            return Err(format!("contract ABI lacks {}", ContractMethod::GetAllTransactions));
        }
        contract.get_all_transactions().await.map_err(|e| e.to_string())
    }

    async fn read_zakat_rows(&self) -> Result<Vec<RawTransfer>, String> {
        let contract = self.build_contract_binding().await.map_err(|e| e.to_string())?;

        if contract.supports(ContractMethod::GetZakatTransactions) {
            match contract.get_zakat_transactions().await {
                Ok(rows) => return Ok(rows),
                Err(ProviderError::MethodMissing(method)) => {
                    tracing::debug!(method = %method, "Zakat read reported missing method");
                }
                Err(e) => return Err(e.to_string()),
            }
        }

        // Older contracts: every row is shown under the Zakat list.
        tracing::warn!("Contract has no getZakatTransactions; falling back to getAllTransactions");
        metrics::record_read("zakat_transactions", "fallback");
        contract.get_all_transactions().await.map_err(|e| e.to_string())
    }

    async fn read_count(&self) -> Result<u64, String> {
        let contract = self.build_contract_binding().await.map_err(|e| e.to_string())?;
        let count = contract
            .get_all_transaction_count()
            .await
            .map_err(|e| e.to_string())?;
        u64::try_from(count).map_err(|_| format!("transaction count {} overflows u64", count))
    }
}

fn outcome<T>(result: &GatewayResult<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    }
}

fn stored_count(store: &dyn KeyValueStore) -> Option<u64> {
    let raw = store.get(TRANSACTION_COUNT_KEY)?;
    match raw.parse() {
        Ok(count) => Some(count),
        Err(_) => {
            tracing::warn!(value = %raw, "Ignoring unparsable stored transaction count");
            None
        }
    }
}
