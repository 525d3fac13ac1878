//! Gateway and provider error taxonomy.
//!
//! Write paths surface [`GatewayError`] to the caller. Read paths never do;
//! they log and degrade instead.

use alloy::primitives::TxHash;
use thiserror::Error;

use crate::blockchain::types::BlockchainError;

/// Errors returned by [`crate::gateway::ChainTransactionGateway`] operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No wallet provider was injected. Needs user action, not a retry.
    #[error("No wallet provider available; install or enable a wallet")]
    ProviderUnavailable,

    /// The user or provider declined account authorization.
    #[error("Wallet connection rejected: {0}")]
    WalletConnectionRejected(String),

    /// Contract address or ABI is unusable. Fatal for the session.
    #[error("Invalid contract configuration (address '{address}'): {reason}")]
    InvalidContractConfiguration { address: String, reason: String },

    /// Provider could not hand out a signer, e.g. the wallet is locked.
    #[error("Signer unavailable: {0}")]
    SignerUnavailable(String),

    /// Amount is not a strictly positive decimal with at most 18 fractional digits.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Recipient is not a syntactically valid address.
    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    /// Submission or confirmation failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// A value transfer was broadcast but never confirmed. The funds may
    /// still move; reconcile against `transfer_hash` before retrying.
    #[error("Transfer {transfer_hash} was broadcast but not confirmed: {reason}")]
    TransferUnconfirmed { transfer_hash: TxHash, reason: String },

    /// Funds moved but the ledger record was not written.
    #[error("Transfer {transfer_hash} succeeded but ledger recording failed: {reason}")]
    PartialFundingFailure { transfer_hash: TxHash, reason: String },

    /// Another money-moving operation holds the same key.
    #[error("Another '{0}' operation is already in flight")]
    OperationInFlight(String),
}

impl GatewayError {
    /// Stable machine-readable name, used in API bodies and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::ProviderUnavailable => "provider_unavailable",
            GatewayError::WalletConnectionRejected(_) => "wallet_connection_rejected",
            GatewayError::InvalidContractConfiguration { .. } => "invalid_contract_configuration",
            GatewayError::SignerUnavailable(_) => "signer_unavailable",
            GatewayError::InvalidAmount(_) => "invalid_amount",
            GatewayError::InvalidRecipient(_) => "invalid_recipient",
            GatewayError::TransactionFailed(_) => "transaction_failed",
            GatewayError::TransferUnconfirmed { .. } => "transfer_unconfirmed",
            GatewayError::PartialFundingFailure { .. } => "partial_funding_failure",
            GatewayError::OperationInFlight(_) => "operation_in_flight",
        }
    }

    /// Hash of a value transfer that was already broadcast, if any.
    pub fn transfer_hash(&self) -> Option<TxHash> {
        match self {
            GatewayError::TransferUnconfirmed { transfer_hash, .. }
            | GatewayError::PartialFundingFailure { transfer_hash, .. } => Some(*transfer_hash),
            _ => None,
        }
    }

    /// Whether re-invoking the same operation can succeed without config changes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::WalletConnectionRejected(_)
                | GatewayError::SignerUnavailable(_)
                | GatewayError::TransactionFailed(_)
                | GatewayError::OperationInFlight(_)
        )
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors reported by a wallet provider or a contract binding.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),

    /// The bound ABI has no function with this name.
    #[error("contract has no method `{0}`")]
    MethodMissing(String),

    #[error(transparent)]
    Chain(#[from] BlockchainError),

    #[error("{0}")]
    Other(String),
}

/// Result type for provider and binding calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_carries_transfer_hash() {
        let err = GatewayError::PartialFundingFailure {
            transfer_hash: TxHash::repeat_byte(0xab),
            reason: "execution reverted".into(),
        };
        let text = err.to_string();
        assert!(text.contains("0xabab"));
        assert!(text.contains("execution reverted"));
        assert_eq!(err.kind(), "partial_funding_failure");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_provider_error_wraps_chain_error() {
        let err: ProviderError = BlockchainError::Timeout(5).into();
        assert_eq!(err.to_string(), "RPC timeout after 5 seconds");
    }
}
