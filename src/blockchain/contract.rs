//! Ledger contract binding over alloy's dynamic ABI support.
//!
//! The ABI is supplied at runtime, so calls go through
//! [`ContractInstance`] and results come back as [`DynSolValue`]s. Row
//! fields are located by component name, which keeps older and newer
//! contract versions readable with one decoder.

use std::sync::Arc;
use std::time::Duration;

use alloy::contract::{ContractInstance, Error as ContractError, Interface};
use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::{JsonAbi, Param};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::DynProvider;
use async_trait::async_trait;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::gateway::binding::{AddToBlockchainCall, ContractMethod, LedgerContract, RawTransfer};
use crate::gateway::error::{ProviderError, ProviderResult};

/// Where each [`RawTransfer`] field sits inside a returned row tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLayout {
    pub sender: usize,
    pub receiver: usize,
    pub amount: usize,
    pub message: usize,
    pub timestamp: usize,
    pub keyword: usize,
    pub tx_hash: Option<usize>,
}

impl Default for TransferLayout {
    /// Declaration order of the canonical `TransferStruct`.
    fn default() -> Self {
        Self {
            sender: 0,
            receiver: 1,
            amount: 2,
            message: 3,
            timestamp: 4,
            keyword: 5,
            tx_hash: None,
        }
    }
}

impl TransferLayout {
    /// Derive the layout from a function's first output (a `tuple[]`).
    pub fn from_outputs(outputs: &[Param]) -> Self {
        let components = outputs.first().map(|p| p.components.as_slice()).unwrap_or(&[]);
        let defaults = Self::default();

        if components.iter().all(|c| c.name.is_empty()) {
            return Self {
                tx_hash: (components.len() > 6).then_some(6),
                ..defaults
            };
        }

        let find = |aliases: &[&str]| {
            components
                .iter()
                .position(|c| aliases.iter().any(|a| c.name.eq_ignore_ascii_case(a)))
        };

        Self {
            sender: find(&["sender", "from"]).unwrap_or(defaults.sender),
            receiver: find(&["receiver", "to", "addressTo"]).unwrap_or(defaults.receiver),
            amount: find(&["amount", "value"]).unwrap_or(defaults.amount),
            message: find(&["message"]).unwrap_or(defaults.message),
            timestamp: find(&["timestamp"]).unwrap_or(defaults.timestamp),
            keyword: find(&["keyword"]).unwrap_or(defaults.keyword),
            tx_hash: find(&["txHash", "transactionHash", "hash"]),
        }
    }

    /// Layout for `method` in `abi`, or `None` if the ABI lacks it.
    pub fn for_method(abi: &JsonAbi, method: &str) -> Option<Self> {
        abi.function(method)
            .and_then(|overloads| overloads.first())
            .map(|f| Self::from_outputs(&f.outputs))
    }
}

/// Decode a `tuple[]` call result into rows.
pub fn decode_transfers(output: &[DynSolValue], layout: &TransferLayout) -> BlockchainResult<Vec<RawTransfer>> {
    let rows = match output.first() {
        None => return Ok(Vec::new()),
        Some(DynSolValue::Array(rows)) | Some(DynSolValue::FixedArray(rows)) => rows,
        Some(_) => return Err(BlockchainError::Decode("expected an array of rows".into())),
    };

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let fields = row
                .as_tuple()
                .ok_or_else(|| BlockchainError::Decode(format!("row {} is not a tuple", i)))?;
            decode_row(fields, layout).map_err(|e| BlockchainError::Decode(format!("row {}: {}", i, e)))
        })
        .collect()
}

fn field<'a>(fields: &'a [DynSolValue], idx: usize, name: &str) -> Result<&'a DynSolValue, String> {
    fields
        .get(idx)
        .ok_or_else(|| format!("missing field `{}` at index {}", name, idx))
}

fn decode_row(fields: &[DynSolValue], layout: &TransferLayout) -> Result<RawTransfer, String> {
    let address = |idx: usize, name: &str| -> Result<Address, String> {
        field(fields, idx, name)?
            .as_address()
            .ok_or_else(|| format!("`{}` is not an address", name))
    };
    let uint = |idx: usize, name: &str| -> Result<U256, String> {
        field(fields, idx, name)?
            .as_uint()
            .map(|(value, _)| value)
            .ok_or_else(|| format!("`{}` is not a uint", name))
    };
    let string = |idx: usize, name: &str| -> Result<String, String> {
        field(fields, idx, name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| format!("`{}` is not a string", name))
    };

    let timestamp = uint(layout.timestamp, "timestamp")?;
    let timestamp = u64::try_from(timestamp).map_err(|_| format!("timestamp {} out of range", timestamp))?;

    Ok(RawTransfer {
        sender: address(layout.sender, "sender")?,
        receiver: address(layout.receiver, "receiver")?,
        amount: uint(layout.amount, "amount")?,
        message: string(layout.message, "message")?,
        keyword: string(layout.keyword, "keyword")?,
        timestamp,
        tx_hash: layout.tx_hash.and_then(|idx| fields.get(idx)).and_then(tx_hash_text),
    })
}

fn tx_hash_text(value: &DynSolValue) -> Option<String> {
    match value {
        DynSolValue::String(s) if !s.is_empty() => Some(s.clone()),
        DynSolValue::FixedBytes(word, size) => Some(alloy::hex::encode_prefixed(&word[..*size])),
        DynSolValue::Bytes(bytes) if !bytes.is_empty() => Some(alloy::hex::encode_prefixed(bytes)),
        _ => None,
    }
}

fn map_contract_error(err: ContractError) -> ProviderError {
    match err {
        ContractError::UnknownFunction(name) => ProviderError::MethodMissing(name),
        other => ProviderError::Chain(BlockchainError::Rpc(other.to_string())),
    }
}

/// The deployed ledger, bound to a signing provider.
pub struct AlloyLedgerContract {
    instance: ContractInstance<DynProvider>,
    abi: Arc<JsonAbi>,
    rpc_timeout: Duration,
}

impl AlloyLedgerContract {
    pub fn new(address: Address, provider: DynProvider, abi: Arc<JsonAbi>, rpc_timeout: Duration) -> Self {
        let interface = Interface::new(abi.as_ref().clone());
        Self {
            instance: ContractInstance::new(address, provider, interface),
            abi,
            rpc_timeout,
        }
    }

    async fn call(&self, method: ContractMethod) -> ProviderResult<Vec<DynSolValue>> {
        let builder = self.instance.function(method.name(), &[]).map_err(map_contract_error)?;
        match timeout(self.rpc_timeout, builder.call()).await {
            Ok(result) => result.map_err(map_contract_error),
            Err(_) => Err(BlockchainError::Timeout(self.rpc_timeout.as_secs()).into()),
        }
    }

    async fn read_transfers(&self, method: ContractMethod) -> ProviderResult<Vec<RawTransfer>> {
        let layout = TransferLayout::for_method(&self.abi, method.name())
            .ok_or_else(|| ProviderError::MethodMissing(method.name().to_string()))?;
        let output = self.call(method).await?;
        let rows = decode_transfers(&output, &layout)?;
        tracing::debug!(method = %method, rows = rows.len(), "Ledger rows read");
        Ok(rows)
    }
}

#[async_trait]
impl LedgerContract for AlloyLedgerContract {
    fn supports(&self, method: ContractMethod) -> bool {
        self.abi.function(method.name()).is_some()
    }

    async fn add_to_blockchain(&self, call: AddToBlockchainCall) -> ProviderResult<TxHash> {
        let args = [
            DynSolValue::Address(call.receiver),
            DynSolValue::Uint(call.amount, 256),
            DynSolValue::String(call.message),
            DynSolValue::String(call.keyword),
        ];
        let builder = self
            .instance
            .function(ContractMethod::AddToBlockchain.name(), &args)
            .map_err(map_contract_error)?
            .value(call.value)
            .gas(call.gas_limit);

        match timeout(self.rpc_timeout, builder.send()).await {
            Ok(Ok(pending)) => Ok(*pending.tx_hash()),
            Ok(Err(e)) => Err(map_contract_error(e)),
            Err(_) => Err(BlockchainError::Timeout(self.rpc_timeout.as_secs()).into()),
        }
    }

    async fn get_all_transactions(&self) -> ProviderResult<Vec<RawTransfer>> {
        self.read_transfers(ContractMethod::GetAllTransactions).await
    }

    async fn get_zakat_transactions(&self) -> ProviderResult<Vec<RawTransfer>> {
        self.read_transfers(ContractMethod::GetZakatTransactions).await
    }

    async fn get_all_transaction_count(&self) -> ProviderResult<U256> {
        let output = self.call(ContractMethod::GetAllTransactionCount).await?;
        output
            .first()
            .and_then(DynSolValue::as_uint)
            .map(|(count, _)| count)
            .ok_or_else(|| BlockchainError::Decode("transaction count is not a uint".into()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_abi;

    fn ledger_abi() -> JsonAbi {
        parse_abi(include_str!("../../abi/Transactions.json")).unwrap()
    }

    fn row(sender: u8, receiver: u8, amount: u64, keyword: &str, timestamp: u64) -> Vec<DynSolValue> {
        vec![
            DynSolValue::Address(Address::repeat_byte(sender)),
            DynSolValue::Address(Address::repeat_byte(receiver)),
            DynSolValue::Uint(U256::from(amount), 256),
            DynSolValue::String("jazakallah".into()),
            DynSolValue::Uint(U256::from(timestamp), 256),
            DynSolValue::String(keyword.into()),
        ]
    }

    #[test]
    fn test_layout_from_bundled_abi() {
        let abi = ledger_abi();
        let all = TransferLayout::for_method(&abi, "getAllTransactions").unwrap();
        assert_eq!(all, TransferLayout::default());

        let zakat = TransferLayout::for_method(&abi, "getZakatTransactions").unwrap();
        assert_eq!(zakat.tx_hash, Some(6));

        assert!(TransferLayout::for_method(&abi, "getLoans").is_none());
    }

    #[test]
    fn test_layout_follows_names_not_order() {
        let abi = parse_abi(
            r#"[{"type":"function","name":"getAllTransactions","inputs":[],"stateMutability":"view",
                "outputs":[{"name":"","type":"tuple[]","components":[
                    {"name":"keyword","type":"string"},
                    {"name":"amount","type":"uint256"},
                    {"name":"from","type":"address"},
                    {"name":"to","type":"address"},
                    {"name":"timestamp","type":"uint256"},
                    {"name":"message","type":"string"}]}]}]"#,
        )
        .unwrap();

        let layout = TransferLayout::for_method(&abi, "getAllTransactions").unwrap();
        assert_eq!(layout.keyword, 0);
        assert_eq!(layout.amount, 1);
        assert_eq!(layout.sender, 2);
        assert_eq!(layout.receiver, 3);
        assert_eq!(layout.tx_hash, None);
    }

    #[test]
    fn test_decode_rows() {
        let output = vec![DynSolValue::Array(vec![
            DynSolValue::Tuple(row(0x01, 0x02, 5, "zakat", 1_700_000_000)),
            DynSolValue::Tuple(row(0x03, 0x04, 7, "sadaqah", 1_700_000_100)),
        ])];

        let rows = decode_transfers(&output, &TransferLayout::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].sender, Address::repeat_byte(0x01));
        assert_eq!(rows[0].amount, U256::from(5));
        assert_eq!(rows[1].keyword, "sadaqah");
        assert_eq!(rows[1].timestamp, 1_700_000_100);
        assert!(rows[1].tx_hash.is_none());
    }

    #[test]
    fn test_decode_tx_hash_field() {
        let mut fields = row(0x01, 0x02, 5, "zakat", 1);
        fields.push(DynSolValue::FixedBytes(alloy::primitives::B256::repeat_byte(0xaa), 32));
        let output = vec![DynSolValue::Array(vec![DynSolValue::Tuple(fields)])];

        let layout = TransferLayout { tx_hash: Some(6), ..TransferLayout::default() };
        let rows = decode_transfers(&output, &layout).unwrap();
        assert_eq!(rows[0].tx_hash.as_deref(), Some(&*format!("0x{}", "aa".repeat(32))));
    }

    #[test]
    fn test_decode_empty_array() {
        let output = vec![DynSolValue::Array(vec![])];
        assert!(decode_transfers(&output, &TransferLayout::default()).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let output = vec![DynSolValue::Uint(U256::from(3), 256)];
        assert!(matches!(
            decode_transfers(&output, &TransferLayout::default()),
            Err(BlockchainError::Decode(_))
        ));

        let short = vec![DynSolValue::Array(vec![DynSolValue::Tuple(vec![DynSolValue::Bool(true)])])];
        let err = decode_transfers(&short, &TransferLayout::default()).unwrap_err();
        assert!(err.to_string().contains("row 0"));
    }

    #[test]
    fn test_unknown_function_maps_to_method_missing() {
        let err = map_contract_error(ContractError::UnknownFunction("getZakatTransactions".into()));
        assert!(matches!(err, ProviderError::MethodMissing(name) if name == "getZakatTransactions"));
    }
}
