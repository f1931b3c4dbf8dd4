use super::record::{ChangeEvent, ChangeKind, IngestedRecord};
use super::transfer::{LedgerEntry, MinorAmount, TransferStatus};
use crate::error::Result;
use async_trait::async_trait;

/// Durable, change-notifying key/value store for ingested notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Last-write-wins upsert by `sequence_key`.
    ///
    /// Publishes `Inserted` for a new key and `Modified` for an existing one, only after the
    /// write is durable. Returns the kind that was published.
    async fn upsert(&self, record: IngestedRecord) -> Result<ChangeKind>;
    async fn get(&self, key: &str) -> Result<Option<IngestedRecord>>;
}

/// Change events the store has published but the processing stage has not finished yet.
///
/// Written together with the record, so a crash between the write and the processing of the
/// event leaves it here for replay.
#[async_trait]
pub trait ChangeLog: Send + Sync {
    /// Unfinished events, oldest first.
    async fn pending(&self) -> Result<Vec<ChangeEvent>>;
    /// Records that `event` was handled to a terminal state, clearing the pending entry it
    /// settles.
    async fn acknowledge(&self, event: &ChangeEvent) -> Result<()>;
}

/// External banking API able to move money into a savings goal.
#[async_trait]
pub trait SavingsGoalClient: Send + Sync {
    /// Returns the transfer reference issued by the bank.
    async fn add_money(&self, goal: &str, amount: &MinorAmount) -> Result<String>;
}

/// Record of keys that already reached the transfer step.
#[async_trait]
pub trait ProcessedLedger: Send + Sync {
    /// Atomically marks `key` as claimed. Returns `false` when it was already present.
    async fn claim(&self, key: &str) -> Result<bool>;
    async fn record_outcome(&self, key: &str, status: TransferStatus) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<LedgerEntry>>;
}

/// Named secret lookup, e.g. a parameter store.
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<Option<String>>;
}

pub type NotificationStoreBox = Box<dyn NotificationStore>;
pub type ChangeLogBox = Box<dyn ChangeLog>;
pub type SavingsGoalClientBox = Box<dyn SavingsGoalClient>;
pub type ProcessedLedgerBox = Box<dyn ProcessedLedger>;
