use super::notification::WebhookNotification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable form of a notification as held by the store.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct IngestedRecord {
    pub sequence_key: String,
    pub inserted_at: DateTime<Utc>,
    pub notification: WebhookNotification,
}

impl IngestedRecord {
    /// Wraps a notification, deriving its key from the most stable identifier available.
    pub fn new(notification: WebhookNotification) -> Self {
        Self {
            sequence_key: sequence_key(&notification),
            inserted_at: Utc::now(),
            notification,
        }
    }
}

/// Prefers the transaction id, which survives redelivery, over the per-delivery notification id.
pub fn sequence_key(notification: &WebhookNotification) -> String {
    if notification.transaction_id.trim().is_empty() {
        notification.notification_id.clone()
    } else {
        notification.transaction_id.clone()
    }
}

/// Kind of mutation reported by the store's change feed.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Inserted,
    Modified,
    Removed,
}

/// One `(key, changeKind, newImage)` tuple from the change feed.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct ChangeEvent {
    pub key: String,
    pub kind: ChangeKind,
    /// `None` for removals.
    pub new_image: Option<IngestedRecord>,
}

impl ChangeEvent {
    /// Folds `next` into a still-unprocessed event for the same key. An unprocessed insert
    /// stays an insert, carrying the newest image.
    pub fn coalesce(previous: Option<ChangeEvent>, next: ChangeEvent) -> ChangeEvent {
        match previous {
            Some(previous) if previous.kind == ChangeKind::Inserted => ChangeEvent {
                kind: ChangeKind::Inserted,
                ..next
            },
            _ => next,
        }
    }

    /// Whether handling `self` finishes the pending event for its key. A later change never
    /// settles an insert that has not been processed yet.
    pub fn settles(&self, pending: &ChangeEvent) -> bool {
        self.key == pending.key
            && (self.kind == ChangeKind::Inserted || pending.kind != ChangeKind::Inserted)
    }
}
