//! Decimal ETH strings <-> 18-decimal base units.
//!
//! Conversion is exact: parsing goes through alloy's fixed-point unit
//! parser, never through floats.

use alloy::primitives::utils::{format_ether, parse_units};
use alloy::primitives::U256;

use crate::gateway::error::{GatewayError, GatewayResult};

/// Fractional digits of the native currency.
pub const ETH_DECIMALS: usize = 18;

/// Parse a user-entered decimal amount into base units.
///
/// Accepts `digits[.digits]` (a leading or trailing dot is fine), rejects
/// signs, exponents, whitespace, more than 18 fractional digits and zero.
pub fn parse_eth_amount(input: &str) -> GatewayResult<U256> {
    let (whole, frac) = match input.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (input, ""),
    };

    let well_formed = !(whole.is_empty() && frac.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit());
    if !well_formed {
        return Err(GatewayError::InvalidAmount(format!("'{}' is not a decimal number", input)));
    }
    if frac.len() > ETH_DECIMALS {
        return Err(GatewayError::InvalidAmount(format!(
            "'{}' has more than {} fractional digits",
            input, ETH_DECIMALS
        )));
    }

    // parse_units wants digits on both sides of the dot.
    let normalized = format!(
        "{}.{}",
        if whole.is_empty() { "0" } else { whole },
        if frac.is_empty() { "0" } else { frac }
    );
    let amount = parse_units(&normalized, "ether")
        .map_err(|e| GatewayError::InvalidAmount(format!("'{}': {}", input, e)))?
        .get_absolute();

    if amount.is_zero() {
        return Err(GatewayError::InvalidAmount("amount must be greater than zero".into()));
    }
    Ok(amount)
}

/// Format base units as a decimal ETH string.
///
/// Trailing fractional zeros are trimmed but one fractional digit always
/// remains, e.g. `1.0`, `10.5`, `0.000000000000000001`.
pub fn format_eth(amount: U256) -> String {
    let full = format_ether(amount);
    match full.split_once('.') {
        Some((whole, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                format!("{}.0", whole)
            } else {
                format!("{}.{}", whole, frac)
            }
        }
        None => format!("{}.0", full),
    }
}
