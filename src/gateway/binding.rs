//! Contract binding: the calls the gateway makes against the ledger contract.

use std::str::FromStr;
use std::sync::Arc;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

use crate::gateway::error::{GatewayError, GatewayResult, ProviderResult};

/// Functions the gateway expects on the ledger contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractMethod {
    AddToBlockchain,
    GetAllTransactions,
    GetZakatTransactions,
    GetAllTransactionCount,
}

impl ContractMethod {
    /// Solidity function name.
    pub fn name(self) -> &'static str {
        match self {
            ContractMethod::AddToBlockchain => "addToBlockchain",
            ContractMethod::GetAllTransactions => "getAllTransactions",
            ContractMethod::GetZakatTransactions => "getZakatTransactions",
            ContractMethod::GetAllTransactionCount => "getAllTransactionCount",
        }
    }
}

impl std::fmt::Display for ContractMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Arguments for `addToBlockchain`, plus the native value and gas ceiling
/// attached to the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddToBlockchainCall {
    pub receiver: Address,
    pub amount: U256,
    pub message: String,
    pub keyword: String,
    pub value: U256,
    pub gas_limit: u64,
}

/// One ledger row as the contract returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransfer {
    pub sender: Address,
    pub receiver: Address,
    /// Base units.
    pub amount: U256,
    pub message: String,
    pub keyword: String,
    /// Unix seconds.
    pub timestamp: u64,
    pub tx_hash: Option<String>,
}

/// A bound ledger contract.
#[async_trait]
pub trait LedgerContract: Send + Sync {
    /// Whether the bound ABI exposes `method`.
    fn supports(&self, method: ContractMethod) -> bool;

    /// Submit `addToBlockchain`; resolves once broadcast.
    async fn add_to_blockchain(&self, call: AddToBlockchainCall) -> ProviderResult<TxHash>;

    async fn get_all_transactions(&self) -> ProviderResult<Vec<RawTransfer>>;

    /// Fails with `ProviderError::MethodMissing` on ABIs that predate it.
    async fn get_zakat_transactions(&self) -> ProviderResult<Vec<RawTransfer>>;

    async fn get_all_transaction_count(&self) -> ProviderResult<U256>;
}

/// Contract address and ABI as configured, before validation.
#[derive(Debug, Clone)]
pub struct ContractSpec {
    pub address: String,
    pub abi: Arc<JsonAbi>,
}

impl ContractSpec {
    pub fn new(address: impl Into<String>, abi: JsonAbi) -> Self {
        Self {
            address: address.into(),
            abi: Arc::new(abi),
        }
    }

    /// Check the address and ABI without touching the network.
    pub fn validate(&self) -> GatewayResult<Address> {
        let invalid = |reason: String| {
            tracing::error!(
                address = %self.address,
                functions = self.abi.functions().count(),
                events = self.abi.events().count(),
                reason = %reason,
                "Invalid contract configuration"
            );
            GatewayError::InvalidContractConfiguration {
                address: self.address.clone(),
                reason,
            }
        };

        let trimmed = self.address.trim();
        let hex = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X"));
        let address = match hex {
            Some(digits) if digits.len() == 40 => Address::from_str(trimmed)
                .map_err(|e| invalid(format!("malformed address: {}", e)))?,
            _ => return Err(invalid("expected a 0x-prefixed 20-byte hex address".into())),
        };
        if address.is_zero() {
            return Err(invalid("zero address".into()));
        }

        if self.abi.functions().next().is_none() && self.abi.events().next().is_none() {
            return Err(invalid("ABI has no function or event descriptors".into()));
        }

        Ok(address)
    }
}

/// Parse a recipient address. Checksums are not enforced.
pub fn parse_recipient(input: &str) -> GatewayResult<Address> {
    let trimmed = input.trim();
    if !(trimmed.starts_with("0x") || trimmed.starts_with("0X")) || trimmed.len() != 42 {
        return Err(GatewayError::InvalidRecipient(format!(
            "'{}' is not a 0x-prefixed 20-byte hex address",
            input
        )));
    }
    Address::from_str(trimmed).map_err(|e| GatewayError::InvalidRecipient(format!("'{}': {}", input, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_abi;

    const ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    fn count_abi() -> JsonAbi {
        parse_abi(
            r#"[{"type":"function","name":"getAllTransactionCount","inputs":[],
                 "outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"}]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_spec() {
        let spec = ContractSpec::new(ADDRESS, count_abi());
        assert_eq!(spec.validate().unwrap(), Address::from_str(ADDRESS).unwrap());
    }

    #[test]
    fn test_empty_abi_rejected() {
        let spec = ContractSpec::new(ADDRESS, JsonAbi::default());
        let err = spec.validate().unwrap_err();
        assert!(matches!(err, GatewayError::InvalidContractConfiguration { .. }));
        assert!(err.to_string().contains("no function or event"));
    }

    #[test]
    fn test_bad_addresses_rejected() {
        for bad in ["", "0x1234", "5FbDB2315678afecb367f032d93F642f64180aa3", "0xZZbDB2315678afecb367f032d93F642f64180aa3", "0x0000000000000000000000000000000000000000"] {
            let spec = ContractSpec::new(bad, count_abi());
            assert!(
                matches!(spec.validate(), Err(GatewayError::InvalidContractConfiguration { .. })),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_recipient_checksum_not_enforced() {
        let lower = ADDRESS.to_lowercase();
        assert_eq!(parse_recipient(&lower).unwrap(), Address::from_str(ADDRESS).unwrap());
        assert!(matches!(parse_recipient("bob"), Err(GatewayError::InvalidRecipient(_))));
    }

    #[test]
    fn test_method_names() {
        assert_eq!(ContractMethod::GetZakatTransactions.to_string(), "getZakatTransactions");
        assert_eq!(ContractMethod::AddToBlockchain.name(), "addToBlockchain");
    }
}
