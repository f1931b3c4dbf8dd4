use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of the underlying financial transaction.
///
/// Only card-present style spending (`Card`, `MobileWallet`) is ever rounded up.
/// Anything the source sends that we do not recognise collapses into `Other`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Card,
    MobileWallet,
    #[default]
    Other,
}

impl TransactionType {
    pub fn is_card(&self) -> bool {
        matches!(self, Self::Card | Self::MobileWallet)
    }
}

/// Canonical parsed form of an inbound webhook, independent of schema version.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct WebhookNotification {
    /// Source-assigned id of this delivery. May repeat on redelivery.
    pub notification_id: String,
    pub customer_id: String,
    /// Stable id of the financial transaction. Empty when the source omitted it.
    pub transaction_id: String,
    /// Signed amount in the minor unit of `currency`. Negative is a debit.
    pub amount_minor_units: i64,
    pub currency: String,
    pub transaction_type: TransactionType,
    pub timestamp: Option<DateTime<Utc>>,
    /// Verbatim request body, kept for audit.
    pub raw_payload: String,
}

impl WebhookNotification {
    pub fn is_debit(&self) -> bool {
        self.amount_minor_units < 0
    }
}
