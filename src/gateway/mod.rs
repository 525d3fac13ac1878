//! Chain transaction gateway.
//!
//! # Data Flow
//! ```text
//! caller (HTTP API, tests)
//!     → service.rs (ChainTransactionGateway: validate, single-flight, loading flag)
//!     → provider.rs (WalletProvider: accounts, signer, transfer, confirmation)
//!     → binding.rs (LedgerContract: addToBlockchain, reads)
//!     → records.rs (RawTransfer → TransactionRecord)
//!     → storage (transactionCount)
//! ```

pub mod binding;
pub mod error;
pub mod events;
pub mod provider;
pub mod records;
pub mod service;
pub mod session;
pub mod units;

pub use binding::{AddToBlockchainCall, ContractMethod, ContractSpec, LedgerContract, RawTransfer};
pub use error::{GatewayError, GatewayResult, ProviderError, ProviderResult};
pub use events::spawn_event_listener;
pub use provider::{ContractSigner, ProviderEvent, TransferRequest, WalletProvider};
pub use records::{RecordFormatter, TransactionRecord};
pub use service::{
    ChainTransactionGateway, DonationReceipt, DonationRequest, FundingReceipt, GatewaySettings,
};
pub use session::{ConnectionState, PendingFormData, WalletSession};
pub use units::{format_eth, parse_eth_amount};
