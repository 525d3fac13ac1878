//! Configuration validation.
//!
//! Semantic checks only; serde handles syntax. All failures are collected
//! so a bad file reports every problem at once. The contract address is
//! deliberately left to the gateway, which validates it on every binding.

use std::fmt;
use std::net::SocketAddr;

use chrono::format::{Item, StrftimeItems};

use crate::config::schema::GatewayConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }
    if matches!(config.server.api_key.as_deref(), Some("")) {
        errors.push(ValidationError::new("server.api_key", "must not be empty when set"));
    }

    let chain = &config.blockchain;
    if chain.enabled {
        if chain.rpc_url.parse::<url::Url>().is_err() {
            errors.push(ValidationError::new(
                "blockchain.rpc_url",
                format!("'{}' is not a URL", chain.rpc_url),
            ));
        }
        if chain.chain_id == 0 {
            errors.push(ValidationError::new("blockchain.chain_id", "must be > 0"));
        }
    }
    if chain.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("blockchain.rpc_timeout_secs", "must be > 0"));
    }
    if chain.confirmation_blocks == 0 {
        errors.push(ValidationError::new("blockchain.confirmation_blocks", "must be >= 1"));
    }
    if chain.confirmation_timeout_secs == 0 {
        errors.push(ValidationError::new("blockchain.confirmation_timeout_secs", "must be > 0"));
    }
    if !(chain.gas_price_multiplier.is_finite() && chain.gas_price_multiplier >= 1.0) {
        errors.push(ValidationError::new("blockchain.gas_price_multiplier", "must be >= 1.0"));
    }
    if chain.chain_poll_interval_secs == 0 {
        errors.push(ValidationError::new("blockchain.chain_poll_interval_secs", "must be > 0"));
    }

    if config.contract.donation_gas_limit == 0 {
        errors.push(ValidationError::new("contract.donation_gas_limit", "must be > 0"));
    }
    if config.contract.transfer_gas_limit < 21_000 {
        errors.push(ValidationError::new(
            "contract.transfer_gas_limit",
            "must cover the 21000 intrinsic transfer cost",
        ));
    }

    if config.loan.keyword.trim().is_empty() {
        errors.push(ValidationError::new("loan.keyword", "must not be empty"));
    }

    // +/- 14h covers every real-world offset.
    if config.display.utc_offset_minutes.abs() > 14 * 60 {
        errors.push(ValidationError::new("display.utc_offset_minutes", "out of range"));
    }
    if StrftimeItems::new(&config.display.timestamp_format).any(|item| matches!(item, Item::Error)) {
        errors.push(ValidationError::new(
            "display.timestamp_format",
            format!("'{}' is not a valid strftime format", config.display.timestamp_format),
        ));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }
    if !matches!(obs.log_format.as_str(), "pretty" | "compact") {
        errors.push(ValidationError::new(
            "observability.log_format",
            "expected \"pretty\" or \"compact\"",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = GatewayConfig::default();
        config.server.bind_address = "nope".into();
        config.blockchain.confirmation_blocks = 0;
        config.contract.transfer_gas_limit = 100;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "server.bind_address",
                "blockchain.confirmation_blocks",
                "contract.transfer_gas_limit"
            ]
        );
    }

    #[test]
    fn test_rpc_url_only_checked_when_enabled() {
        let mut config = GatewayConfig::default();
        config.blockchain.rpc_url = "not a url".into();
        assert!(validate_config(&config).is_ok());

        config.blockchain.enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "blockchain.rpc_url");
    }

    #[test]
    fn test_rejects_unknown_timestamp_specifier() {
        let mut config = GatewayConfig::default();
        config.display.timestamp_format = "%Y-%m-%d %Q".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "display.timestamp_format");

        config.display.timestamp_format = "%d/%m/%Y %H:%M:%S".into();
        assert!(validate_config(&config).is_ok());
    }
}
