use super::roundup::IneligibleReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An exact amount in the minor unit of `currency`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MinorAmount {
    pub currency: String,
    pub minor_units: i64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    Succeeded,
    Failed,
}

/// Result of a single savings-goal transfer attempt.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TransferOutcome {
    pub transaction_reference: Option<String>,
    pub status: TransferStatus,
    pub error_detail: Option<String>,
}

impl TransferOutcome {
    pub fn succeeded(reference: String) -> Self {
        Self {
            transaction_reference: Some(reference),
            status: TransferStatus::Succeeded,
            error_detail: None,
        }
    }

    pub fn failed(detail: String) -> Self {
        Self {
            transaction_reference: None,
            status: TransferStatus::Failed,
            error_detail: Some(detail),
        }
    }
}

/// Progress marker kept by the idempotency ledger for a sequence key.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    /// A transfer is about to be, or has been, issued; the outcome is not known yet.
    Claimed,
    Succeeded,
    Failed,
}

impl From<TransferStatus> for LedgerStatus {
    fn from(status: TransferStatus) -> Self {
        match status {
            TransferStatus::Succeeded => Self::Succeeded,
            TransferStatus::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
pub struct LedgerEntry {
    pub key: String,
    pub status: LedgerStatus,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn claimed(key: &str) -> Self {
        Self {
            key: key.to_string(),
            status: LedgerStatus::Claimed,
            updated_at: Utc::now(),
        }
    }
}

/// Terminal state of one change event after the processing stage ran.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ProcessingState {
    RejectedIneligible(IneligibleReason),
    TransferSucceeded { reference: String },
    TransferFailed { detail: String },
    /// The event could not be evaluated (store or ledger unavailable); left for redelivery.
    Aborted { detail: String },
}

impl From<TransferOutcome> for ProcessingState {
    fn from(outcome: TransferOutcome) -> Self {
        match (outcome.status, outcome.transaction_reference) {
            (TransferStatus::Succeeded, Some(reference)) => Self::TransferSucceeded { reference },
            (TransferStatus::Succeeded, None) => Self::TransferSucceeded {
                reference: String::new(),
            },
            (TransferStatus::Failed, _) => Self::TransferFailed {
                detail: outcome.error_detail.unwrap_or_default(),
            },
        }
    }
}
