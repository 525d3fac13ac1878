//! Per-gateway session state: wallet connection, scratch form, loading flag.
//!
//! # State Transitions
//! ```text
//! Disconnected → Connecting: connect() called
//! Connecting → Connected: provider authorized an account
//! Connecting → (previous): authorization rejected
//! Connected → Disconnected: provider reports no accounts, or the chain changed
//! ```

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Wallet connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// The active wallet session. One per gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WalletSession {
    pub address: Option<Address>,
    pub state: ConnectionState,
    pub is_connected: bool,
}

impl WalletSession {
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Keeps the previous address visible while the prompt is open.
    pub fn connecting(previous: &WalletSession) -> Self {
        Self {
            address: previous.address,
            state: ConnectionState::Connecting,
            is_connected: false,
        }
    }

    pub fn connected(address: Address) -> Self {
        Self {
            address: Some(address),
            state: ConnectionState::Connected,
            is_connected: true,
        }
    }
}

/// Form input collected before a donation is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingFormData {
    pub recipient: String,
    /// Decimal ETH string.
    pub amount: String,
    pub keyword: String,
    pub message: String,
}

impl PendingFormData {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Holds the loading flag up for as long as it lives.
pub(crate) struct LoadingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> LoadingGuard<'a> {
    pub(crate) fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self { flag }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_constructors() {
        let address = Address::repeat_byte(0x42);
        let connected = WalletSession::connected(address);
        assert!(connected.is_connected);
        assert_eq!(connected.state, ConnectionState::Connected);

        let connecting = WalletSession::connecting(&connected);
        assert_eq!(connecting.address, Some(address));
        assert!(!connecting.is_connected);

        assert_eq!(WalletSession::disconnected().address, None);
    }

    #[test]
    fn test_loading_guard_clears_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = LoadingGuard::raise(&flag);
            assert!(flag.load(Ordering::SeqCst));
        }
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_form_clear() {
        let mut form = PendingFormData {
            recipient: "0xabc".into(),
            amount: "1".into(),
            keyword: "zakat".into(),
            message: "hi".into(),
        };
        assert!(!form.is_empty());
        form.clear();
        assert!(form.is_empty());
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_value(WalletSession::disconnected()).unwrap();
        assert_eq!(json["state"], "disconnected");
        assert_eq!(json["is_connected"], false);
    }
}
