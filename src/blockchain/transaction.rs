//! Native transfers and confirmation monitoring.
//!
//! # Responsibilities
//! - Build value transfers with chain nonce and a capped gas price
//! - Poll receipts until the required depth, a revert, or a deadline

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use std::time::Duration;
use tokio::time::{sleep, timeout};

use crate::blockchain::client::BlockchainClient;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ConfirmationStatus};
use crate::resilience::calculate_backoff;

const POLL_BASE_MS: u64 = 500;
const POLL_MAX_MS: u64 = 4_000;

/// Builds plain value transfers against the live chain state.
pub struct TransferBuilder<'a> {
    client: &'a BlockchainClient,
}

impl<'a> TransferBuilder<'a> {
    pub fn new(client: &'a BlockchainClient) -> Self {
        Self { client }
    }

    /// Build a transfer of `value` from `from` to `to` with a fixed gas budget.
    pub async fn build(
        &self,
        from: Address,
        to: Address,
        value: U256,
        gas_limit: u64,
    ) -> BlockchainResult<TransactionRequest> {
        let nonce = self.client.get_transaction_count(from).await?;
        let gas_price = self.client.get_gas_price().await?;

        let config = self.client.config();
        let gas_price = adjusted_gas_price(gas_price, config.gas_price_multiplier, config.max_gas_price_gwei)?;

        Ok(TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_value(value)
            .with_nonce(nonce)
            .with_gas_price(gas_price)
            .with_chain_id(config.chain_id)
            .with_gas_limit(gas_limit))
    }
}

/// Reject spikes above `max_gwei`, then apply the safety multiplier.
pub fn adjusted_gas_price(gas_price: u128, multiplier: f64, max_gwei: u64) -> BlockchainResult<u128> {
    let gas_price_gwei = gas_price / 1_000_000_000;
    if gas_price_gwei > max_gwei as u128 {
        return Err(BlockchainError::GasPriceTooHigh {
            current_gwei: gas_price_gwei as u64,
            max_gwei,
        });
    }
    Ok((gas_price as f64 * multiplier) as u128)
}

/// Confirmations of a transaction mined in `tx_block` when the head is `current_block`.
/// The inclusion block itself counts as the first.
pub fn confirmations_at(current_block: u64, tx_block: u64) -> u32 {
    if current_block < tx_block {
        return 0;
    }
    u32::try_from(current_block - tx_block + 1).unwrap_or(u32::MAX)
}

/// Waits for transactions to reach a confirmation depth.
#[derive(Clone, Debug)]
pub struct ConfirmationTracker {
    client: BlockchainClient,
}

impl ConfirmationTracker {
    pub fn new(client: BlockchainClient) -> Self {
        Self { client }
    }

    /// Poll until `tx_hash` has `required` confirmations.
    ///
    /// A revert resolves to `ConfirmationStatus::Failed`; running past
    /// `timeout_secs` is an error. RPC errors while polling are retried
    /// until the deadline.
    pub async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        required: u32,
        timeout_secs: u64,
    ) -> BlockchainResult<ConfirmationStatus> {
        let result = timeout(Duration::from_secs(timeout_secs), async {
            let mut attempt = 0u32;
            loop {
                sleep(calculate_backoff(attempt, POLL_BASE_MS, POLL_MAX_MS)).await;
                attempt = attempt.saturating_add(1);

                let receipt = match self.client.get_transaction_receipt(tx_hash).await {
                    Ok(Some(r)) => r,
                    Ok(None) => {
                        tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                        continue;
                    }
                    // Transient; retried until the deadline.
                    Err(e) => {
                        tracing::warn!(tx_hash = %tx_hash, error = %e, "Receipt poll failed, retrying");
                        continue;
                    }
                };

                if !receipt.status() {
                    return ConfirmationStatus::Failed {
                        reason: "Transaction reverted".to_string(),
                    };
                }

                let current_block = match self.client.get_block_number().await {
                    Ok(block) => block,
                    Err(e) => {
                        tracing::warn!(tx_hash = %tx_hash, error = %e, "Block number poll failed, retrying");
                        continue;
                    }
                };
                let tx_block = receipt.block_number.unwrap_or(current_block);
                let confirmations = confirmations_at(current_block, tx_block);

                if confirmations >= required {
                    return ConfirmationStatus::Confirmed {
                        block_number: tx_block,
                    };
                }

                tracing::debug!(
                    tx_hash = %tx_hash,
                    confirmations = confirmations,
                    required = required,
                    "Waiting for confirmations"
                );
            }
        })
        .await;

        match result {
            Ok(status) => Ok(status),
            Err(_) => Err(BlockchainError::ConfirmationTimeout(timeout_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusion_block_counts_as_one() {
        assert_eq!(confirmations_at(100, 100), 1);
        assert_eq!(confirmations_at(102, 100), 3);
        assert_eq!(confirmations_at(99, 100), 0);
    }

    #[test]
    fn test_gas_price_cap() {
        let twenty_gwei = 20_000_000_000u128;
        assert_eq!(adjusted_gas_price(twenty_gwei, 1.5, 100).unwrap(), 30_000_000_000);

        let err = adjusted_gas_price(600_000_000_000, 1.0, 500).unwrap_err();
        assert!(matches!(err, BlockchainError::GasPriceTooHigh { current_gwei: 600, max_gwei: 500 }));
    }

    #[tokio::test]
    async fn test_confirmation_times_out_against_dead_node() {
        let config = crate::blockchain::types::BlockchainConfig {
            rpc_url: "http://127.0.0.1:1".into(),
            rpc_timeout_secs: 1,
            ..Default::default()
        };
        let client = BlockchainClient::new(config).await.unwrap();
        let tracker = ConfirmationTracker::new(client);

        let result = tracker.wait_for_confirmation(TxHash::ZERO, 1, 1).await;
        assert!(result.is_err());
    }
}
