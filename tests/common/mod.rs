//! Shared mocks and builders for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use tokio::sync::broadcast;

use zakatgo_gateway::blockchain::{BlockchainError, ConfirmationStatus};
use zakatgo_gateway::config::loader::parse_abi;
use zakatgo_gateway::config::GatewayConfig;
use zakatgo_gateway::gateway::{
    AddToBlockchainCall, ChainTransactionGateway, ContractMethod, ContractSigner, ContractSpec,
    GatewaySettings, LedgerContract, ProviderError, ProviderEvent, ProviderResult, RawTransfer,
    TransferRequest, WalletProvider,
};
use zakatgo_gateway::storage::{KeyValueStore, LocalStore};

/// Hardhat's first deployment address.
pub const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";
pub const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

pub fn account() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn recipient() -> Address {
    RECIPIENT.parse().unwrap()
}

pub fn ledger_abi() -> JsonAbi {
    parse_abi(include_str!("../../abi/Transactions.json")).unwrap()
}

pub fn settings(address: &str) -> GatewaySettings {
    GatewaySettings::from_config(&GatewayConfig::default(), ContractSpec::new(address, ledger_abi()))
}

fn hash_for(seed: u64) -> TxHash {
    TxHash::left_padding_from(&seed.to_be_bytes())
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// In-memory ledger contract.
pub struct MockLedger {
    sender: Address,
    rows: Mutex<Vec<RawTransfer>>,
    pub calls: Mutex<Vec<AddToBlockchainCall>>,
    zakat_supported: bool,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
    /// Ledger writes are mined but revert.
    pub revert_writes: AtomicBool,
    issued: Mutex<Vec<TxHash>>,
    /// Delay before `addToBlockchain` resolves.
    pub write_delay_ms: AtomicU64,
    next_hash: AtomicU64,
}

impl MockLedger {
    pub fn new(sender: Address) -> Arc<Self> {
        Self::build(sender, true)
    }

    /// A ledger whose ABI predates `getZakatTransactions`.
    pub fn without_zakat(sender: Address) -> Arc<Self> {
        Self::build(sender, false)
    }

    fn build(sender: Address, zakat_supported: bool) -> Arc<Self> {
        Arc::new(Self {
            sender,
            rows: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            zakat_supported,
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            revert_writes: AtomicBool::new(false),
            issued: Mutex::new(Vec::new()),
            write_delay_ms: AtomicU64::new(0),
            next_hash: AtomicU64::new(1_000),
        })
    }

    pub fn seed(&self, receiver: Address, amount: U256, keyword: &str) {
        let mut rows = self.rows.lock().unwrap();
        let timestamp = 1_700_000_000 + rows.len() as u64;
        rows.push(RawTransfer {
            sender: self.sender,
            receiver,
            amount,
            message: "seeded".into(),
            keyword: keyword.into(),
            timestamp,
            tx_hash: None,
        });
    }

    pub fn calls(&self) -> Vec<AddToBlockchainCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    /// Whether `tx_hash` is a ledger write that reverted.
    pub fn reverted(&self, tx_hash: TxHash) -> bool {
        self.revert_writes.load(Ordering::SeqCst) && self.issued.lock().unwrap().contains(&tx_hash)
    }

    fn check_reads(&self) -> ProviderResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ProviderError::Other("node unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerContract for MockLedger {
    fn supports(&self, method: ContractMethod) -> bool {
        method != ContractMethod::GetZakatTransactions || self.zakat_supported
    }

    async fn add_to_blockchain(&self, call: AddToBlockchainCall) -> ProviderResult<TxHash> {
        self.calls.lock().unwrap().push(call.clone());

        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ProviderError::Other("execution reverted".into()));
        }

        let hash = hash_for(self.next_hash.fetch_add(1, Ordering::SeqCst));
        self.issued.lock().unwrap().push(hash);
        if !self.revert_writes.load(Ordering::SeqCst) {
            self.seed(call.receiver, call.amount, &call.keyword);
        }
        Ok(hash)
    }

    async fn get_all_transactions(&self) -> ProviderResult<Vec<RawTransfer>> {
        self.check_reads()?;
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn get_zakat_transactions(&self) -> ProviderResult<Vec<RawTransfer>> {
        if !self.zakat_supported {
            return Err(ProviderError::MethodMissing("getZakatTransactions".into()));
        }
        self.check_reads()?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.keyword.eq_ignore_ascii_case("zakat"))
            .cloned()
            .collect())
    }

    async fn get_all_transaction_count(&self) -> ProviderResult<U256> {
        self.check_reads()?;
        Ok(U256::from(self.rows.lock().unwrap().len()))
    }
}

// ---------------------------------------------------------------------------
// Wallet
// ---------------------------------------------------------------------------

struct MockSigner {
    address: Address,
    ledger: Arc<MockLedger>,
}

impl ContractSigner for MockSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn bind(&self, _address: Address, _abi: Arc<JsonAbi>) -> Arc<dyn LedgerContract> {
        self.ledger.clone()
    }
}

/// Scriptable wallet provider.
pub struct MockWalletProvider {
    pub ledger: Arc<MockLedger>,
    address: Address,
    /// Whether the account counts as already authorized.
    pub authorized: AtomicBool,
    pub reject_requests: AtomicBool,
    pub grant_no_accounts: AtomicBool,
    pub signer_locked: AtomicBool,
    pub fail_transfers: AtomicBool,
    /// Every confirmation wait times out.
    pub timeout_confirmations: AtomicBool,
    /// Value transfers are mined but revert.
    pub revert_transfers: AtomicBool,
    pub signer_requests: AtomicUsize,
    pub transfers: Mutex<Vec<TransferRequest>>,
    sent: Mutex<Vec<TxHash>>,
    next_hash: AtomicU64,
    block: AtomicU64,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockWalletProvider {
    pub fn new(ledger: Arc<MockLedger>) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            ledger,
            address: account(),
            authorized: AtomicBool::new(false),
            reject_requests: AtomicBool::new(false),
            grant_no_accounts: AtomicBool::new(false),
            signer_locked: AtomicBool::new(false),
            fail_transfers: AtomicBool::new(false),
            timeout_confirmations: AtomicBool::new(false),
            revert_transfers: AtomicBool::new(false),
            signer_requests: AtomicUsize::new(0),
            transfers: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            next_hash: AtomicU64::new(1),
            block: AtomicU64::new(100),
            events,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    pub fn transfers(&self) -> Vec<TransferRequest> {
        self.transfers.lock().unwrap().clone()
    }

    /// Hashes of transfers that were broadcast.
    pub fn sent(&self) -> Vec<TxHash> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn accounts(&self) -> ProviderResult<Vec<Address>> {
        if self.authorized.load(Ordering::SeqCst) {
            Ok(vec![self.address])
        } else {
            Ok(Vec::new())
        }
    }

    async fn request_accounts(&self) -> ProviderResult<Vec<Address>> {
        if self.reject_requests.load(Ordering::SeqCst) {
            return Err(ProviderError::Rejected("user denied account access".into()));
        }
        if self.grant_no_accounts.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        self.authorized.store(true, Ordering::SeqCst);
        Ok(vec![self.address])
    }

    async fn transfer(&self, request: TransferRequest) -> ProviderResult<TxHash> {
        self.transfers.lock().unwrap().push(request);
        if self.fail_transfers.load(Ordering::SeqCst) {
            return Err(ProviderError::Other("insufficient funds".into()));
        }
        let hash = hash_for(self.next_hash.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().unwrap().push(hash);
        Ok(hash)
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        _confirmations: u32,
    ) -> ProviderResult<ConfirmationStatus> {
        if self.timeout_confirmations.load(Ordering::SeqCst) {
            return Err(BlockchainError::ConfirmationTimeout(120).into());
        }
        let transfer_reverted =
            self.revert_transfers.load(Ordering::SeqCst) && self.sent.lock().unwrap().contains(&tx_hash);
        if transfer_reverted || self.ledger.reverted(tx_hash) {
            return Ok(ConfirmationStatus::Failed {
                reason: "Transaction reverted".into(),
            });
        }
        Ok(ConfirmationStatus::Confirmed {
            block_number: self.block.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn signer(&self) -> ProviderResult<Arc<dyn ContractSigner>> {
        self.signer_requests.fetch_add(1, Ordering::SeqCst);
        if self.signer_locked.load(Ordering::SeqCst) {
            return Err(ProviderError::SignerUnavailable("wallet locked".into()));
        }
        Ok(Arc::new(MockSigner {
            address: self.address,
            ledger: self.ledger.clone(),
        }))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub gateway: Arc<ChainTransactionGateway>,
    pub provider: Arc<MockWalletProvider>,
    pub ledger: Arc<MockLedger>,
    pub store: Arc<LocalStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_ledger(MockLedger::new(account()))
    }

    pub fn with_ledger(ledger: Arc<MockLedger>) -> Self {
        Self::build(ledger, Arc::new(LocalStore::in_memory()), CONTRACT)
    }

    pub fn with_store(store: Arc<LocalStore>) -> Self {
        Self::build(MockLedger::new(account()), store, CONTRACT)
    }

    pub fn with_contract_address(address: &str) -> Self {
        Self::build(MockLedger::new(account()), Arc::new(LocalStore::in_memory()), address)
    }

    fn build(ledger: Arc<MockLedger>, store: Arc<LocalStore>, address: &str) -> Self {
        let provider = MockWalletProvider::new(ledger.clone());
        let gateway = Arc::new(ChainTransactionGateway::new(
            Some(provider.clone() as Arc<dyn WalletProvider>),
            settings(address),
            store.clone() as Arc<dyn KeyValueStore>,
        ));
        Self {
            gateway,
            provider,
            ledger,
            store,
        }
    }

    /// Authorize the mock account and connect.
    pub async fn connected() -> Self {
        let harness = Self::new();
        harness.gateway.connect().await.unwrap();
        harness
    }
}

/// A gateway with no wallet provider at all.
pub fn gateway_without_provider() -> Arc<ChainTransactionGateway> {
    Arc::new(ChainTransactionGateway::new(
        None,
        settings(CONTRACT),
        Arc::new(LocalStore::in_memory()),
    ))
}

/// Poll `check` until it holds or a second passes.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
