//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use alloy::json_abi::JsonAbi;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Abi(serde_json::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Abi(e) => write!(f, "ABI error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: GatewayConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load a contract ABI from disk.
///
/// Accepts either a bare JSON ABI array or a compiler artifact that nests
/// the array under an `abi` key. An empty array loads fine here; the gateway
/// rejects it when binding.
pub fn load_abi(path: &Path) -> Result<JsonAbi, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_abi(&content)
}

/// Parse ABI JSON text, unwrapping a build artifact if needed.
pub fn parse_abi(content: &str) -> Result<JsonAbi, ConfigError> {
    let mut value: serde_json::Value = serde_json::from_str(content).map_err(ConfigError::Abi)?;
    if let Some(abi) = value.get_mut("abi") {
        value = abi.take();
    }
    serde_json::from_value(value).map_err(ConfigError::Abi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const COUNT_ABI: &str = r#"[{
        "type": "function",
        "name": "getAllTransactionCount",
        "inputs": [],
        "outputs": [{"name": "", "type": "uint256", "internalType": "uint256"}],
        "stateMutability": "view"
    }]"#;

    #[test]
    fn test_parse_plain_abi() {
        let abi = parse_abi(COUNT_ABI).unwrap();
        assert!(abi.function("getAllTransactionCount").is_some());
    }

    #[test]
    fn test_parse_artifact_abi() {
        let artifact = format!(r#"{{"contractName": "Transactions", "abi": {}}}"#, COUNT_ABI);
        let abi = parse_abi(&artifact).unwrap();
        assert!(abi.function("getAllTransactionCount").is_some());
    }

    #[test]
    fn test_parse_garbage_abi() {
        assert!(matches!(parse_abi("not json"), Err(ConfigError::Abi(_))));
    }

    #[test]
    fn test_load_config_reports_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[blockchain]\nconfirmation_blocks = 0").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("blockchain.confirmation_blocks"));
    }

    #[test]
    fn test_load_config_ok() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[contract]\naddress = \"0x5FbDB2315678afecb367f032d93F642f64180aa3\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.contract.address, "0x5FbDB2315678afecb367f032d93F642f64180aa3");
    }

    #[test]
    fn test_example_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("gateway.example.toml");
        let config = load_config(&path).unwrap();
        assert!(config.blockchain.enabled);
        assert_eq!(config.loan.keyword, "Loan");
    }

    #[test]
    fn test_example_config_shows_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("gateway.example.toml");
        let mut example = load_config(&path).unwrap();
        let defaults = GatewayConfig::default();

        // The two values the example sets for a local node.
        assert!(!defaults.blockchain.enabled);
        assert!(defaults.contract.address.is_empty());
        example.blockchain.enabled = defaults.blockchain.enabled;
        example.contract.address = defaults.contract.address.clone();

        assert_eq!(format!("{example:?}"), format!("{defaults:?}"));
    }
}
