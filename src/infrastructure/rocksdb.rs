use super::change_feed::ChangePublisher;
use crate::domain::ports::{ChangeLog, NotificationStore, ProcessedLedger};
use crate::domain::record::{ChangeEvent, ChangeKind, IngestedRecord};
use crate::domain::transfer::{LedgerEntry, TransferStatus};
use crate::error::{Result, RoundUpError};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for ingested notifications, keyed by sequence key.
pub const CF_NOTIFICATIONS: &str = "notifications";
/// Column Family for the idempotency ledger.
pub const CF_LEDGER: &str = "ledger";
/// Column Family for change events not yet processed to a terminal state.
pub const CF_PENDING: &str = "pending";

/// A persistent store implementation using RocksDB.
///
/// Holds the notification records, the unprocessed change events and the idempotency ledger
/// in separate Column Families. A record and its pending change event are written in one
/// batch. Writes go through a process-local mutex so that the insert/modify decision and the
/// published change event agree with the order the puts were applied.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    feed: ChangePublisher,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at `path`, creating the column families if needed.
    pub fn open<P: AsRef<Path>>(path: P, feed: ChangePublisher) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_notifications = ColumnFamilyDescriptor::new(CF_NOTIFICATIONS, Options::default());
        let cf_ledger = ColumnFamilyDescriptor::new(CF_LEDGER, Options::default());
        let cf_pending = ColumnFamilyDescriptor::new(CF_PENDING, Options::default());

        let db = DB::open_cf_descriptors(
            &opts,
            path,
            vec![cf_notifications, cf_ledger, cf_pending],
        )?;

        Ok(Self {
            db: Arc::new(db),
            feed,
            write_lock: Arc::default(),
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| RoundUpError::storage(format!("Deserialization error: {}", e))),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &str, value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key.as_bytes(), encode(value)?)?;
        Ok(())
    }

    fn exists(&self, cf_name: &str, key: &str) -> Result<bool> {
        let cf = self.cf(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, key.as_bytes())?.is_some())
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| RoundUpError::storage(format!("{} column family not found", name)))
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| RoundUpError::storage(format!("Serialization error: {}", e)))
}

#[async_trait]
impl NotificationStore for RocksDBStore {
    async fn upsert(&self, record: IngestedRecord) -> Result<ChangeKind> {
        let _guard = self.write_lock.lock().await;
        let key = record.sequence_key.clone();
        let record_bytes = encode(&record)?;
        let kind = if self.exists(CF_NOTIFICATIONS, &key)? {
            ChangeKind::Modified
        } else {
            ChangeKind::Inserted
        };
        let event = ChangeEvent {
            key: key.clone(),
            kind,
            new_image: Some(record),
        };
        let previous = self.read::<ChangeEvent>(CF_PENDING, &key)?;
        let pending = ChangeEvent::coalesce(previous, event.clone());

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_NOTIFICATIONS)?, key.as_bytes(), record_bytes);
        batch.put_cf(self.cf(CF_PENDING)?, key.as_bytes(), encode(&pending)?);
        self.db.write(batch)?;

        self.feed.publish(event);
        Ok(kind)
    }

    async fn get(&self, key: &str) -> Result<Option<IngestedRecord>> {
        self.read(CF_NOTIFICATIONS, key)
    }
}

#[async_trait]
impl ChangeLog for RocksDBStore {
    async fn pending(&self) -> Result<Vec<ChangeEvent>> {
        let cf = self.cf(CF_PENDING)?;
        let mut events = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let event: ChangeEvent = serde_json::from_slice(&value)
                .map_err(|e| RoundUpError::storage(format!("Deserialization error: {}", e)))?;
            events.push(event);
        }
        events.sort_by_key(|e| e.new_image.as_ref().map(|r| r.inserted_at));
        Ok(events)
    }

    async fn acknowledge(&self, event: &ChangeEvent) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let pending: Option<ChangeEvent> = self.read(CF_PENDING, &event.key)?;
        if pending.is_some_and(|pending| event.settles(&pending)) {
            self.db.delete_cf(self.cf(CF_PENDING)?, event.key.as_bytes())?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessedLedger for RocksDBStore {
    async fn claim(&self, key: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.exists(CF_LEDGER, key)? {
            return Ok(false);
        }
        self.write(CF_LEDGER, key, &LedgerEntry::claimed(key))?;
        Ok(true)
    }

    async fn record_outcome(&self, key: &str, status: TransferStatus) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entry = self
            .read::<LedgerEntry>(CF_LEDGER, key)?
            .unwrap_or_else(|| LedgerEntry::claimed(key));
        entry.status = status.into();
        entry.updated_at = Utc::now();
        self.write(CF_LEDGER, key, &entry)
    }

    async fn get(&self, key: &str) -> Result<Option<LedgerEntry>> {
        self.read(CF_LEDGER, key)
    }
}
