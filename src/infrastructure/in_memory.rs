use super::change_feed::ChangePublisher;
use crate::domain::ports::{ChangeLog, NotificationStore, ProcessedLedger};
use crate::domain::record::{ChangeEvent, ChangeKind, IngestedRecord};
use crate::domain::transfer::{LedgerEntry, TransferStatus};
use crate::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct StoreState {
    records: HashMap<String, IngestedRecord>,
    /// Unacknowledged change events, oldest first.
    pending: Vec<ChangeEvent>,
}

/// A thread-safe in-memory notification store with a change feed.
///
/// The write lock is held while the change event is published, so events for a key leave in
/// the same order the writes were applied.
#[derive(Clone)]
pub struct InMemoryNotificationStore {
    state: Arc<RwLock<StoreState>>,
    feed: ChangePublisher,
}

impl InMemoryNotificationStore {
    pub fn new(feed: ChangePublisher) -> Self {
        Self {
            state: Arc::default(),
            feed,
        }
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.records.is_empty()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn upsert(&self, record: IngestedRecord) -> Result<ChangeKind> {
        let mut state = self.state.write().await;
        let key = record.sequence_key.clone();
        let kind = match state.records.insert(key.clone(), record.clone()) {
            Some(_) => ChangeKind::Modified,
            None => ChangeKind::Inserted,
        };
        let event = ChangeEvent {
            key: key.clone(),
            kind,
            new_image: Some(record),
        };

        let position = state.pending.iter().position(|e| e.key == key);
        match position {
            Some(i) => {
                let previous = state.pending[i].clone();
                state.pending[i] = ChangeEvent::coalesce(Some(previous), event.clone());
            }
            None => state.pending.push(event.clone()),
        }

        self.feed.publish(event);
        Ok(kind)
    }

    async fn get(&self, key: &str) -> Result<Option<IngestedRecord>> {
        let state = self.state.read().await;
        Ok(state.records.get(key).cloned())
    }
}

#[async_trait]
impl ChangeLog for InMemoryNotificationStore {
    async fn pending(&self) -> Result<Vec<ChangeEvent>> {
        Ok(self.state.read().await.pending.clone())
    }

    async fn acknowledge(&self, event: &ChangeEvent) -> Result<()> {
        self.state
            .write()
            .await
            .pending
            .retain(|pending| !event.settles(pending));
        Ok(())
    }
}

/// In-memory idempotency ledger. Only guards a single process lifetime.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    entries: Arc<RwLock<HashMap<String, LedgerEntry>>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessedLedger for InMemoryLedger {
    async fn claim(&self, key: &str) -> Result<bool> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), LedgerEntry::claimed(key));
        Ok(true)
    }

    async fn record_outcome(&self, key: &str, status: TransferStatus) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| LedgerEntry::claimed(key));
        entry.status = status.into();
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<LedgerEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }
}
