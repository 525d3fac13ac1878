//! Durable local key-value storage.
//!
//! The gateway persists a single value, the last-known transaction count,
//! so a restart can show something before the chain answers.

pub mod kv;

pub use kv::{KeyValueStore, LocalStore, StorageError};

/// Key under which the last-known transaction count is stored.
pub const TRANSACTION_COUNT_KEY: &str = "transactionCount";
