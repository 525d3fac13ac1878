//! Normalized transaction records for display.

use std::fmt::Write;

use alloy::primitives::Address;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::config::schema::DisplayConfig;
use crate::gateway::binding::RawTransfer;
use crate::gateway::units::format_eth;

/// A ledger row ready for display. Rebuilt from chain reads, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub from: Address,
    pub to: Address,
    /// Decimal ETH string.
    pub amount_eth: String,
    pub message: String,
    pub keyword: String,
    pub timestamp_display: String,
    pub tx_hash: Option<String>,
}

/// Turns raw contract rows into [`TransactionRecord`]s.
#[derive(Debug, Clone)]
pub struct RecordFormatter {
    format: String,
    offset: FixedOffset,
}

impl RecordFormatter {
    pub fn new(config: &DisplayConfig) -> Self {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| {
            tracing::warn!(
                utc_offset_minutes = config.utc_offset_minutes,
                "UTC offset out of range, using UTC"
            );
            Utc.fix()
        });

        Self {
            format: config.timestamp_format.clone(),
            offset,
        }
    }

    pub fn normalize(&self, raw: &RawTransfer) -> TransactionRecord {
        TransactionRecord {
            from: raw.sender,
            to: raw.receiver,
            amount_eth: format_eth(raw.amount),
            message: raw.message.clone(),
            keyword: raw.keyword.clone(),
            timestamp_display: self.format_timestamp(raw.timestamp),
            tx_hash: raw.tx_hash.clone(),
        }
    }

    pub fn normalize_all(&self, rows: &[RawTransfer]) -> Vec<TransactionRecord> {
        rows.iter().map(|raw| self.normalize(raw)).collect()
    }

    /// Render unix seconds. Values chrono can't represent, or a format it
    /// can't render, fall back to the raw number.
    pub fn format_timestamp(&self, unix_secs: u64) -> String {
        let Some(utc) = i64::try_from(unix_secs)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
        else {
            return unix_secs.to_string();
        };

        let mut rendered = String::new();
        match write!(rendered, "{}", utc.with_timezone(&self.offset).format(&self.format)) {
            Ok(()) => rendered,
            Err(_) => {
                tracing::warn!(format = %self.format, "Timestamp format not renderable");
                unix_secs.to_string()
            }
        }
    }
}

impl Default for RecordFormatter {
    fn default() -> Self {
        Self::new(&DisplayConfig::default())
    }
}
