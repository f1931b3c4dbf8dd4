use crate::domain::record::ChangeEvent;
use tokio::sync::mpsc;

/// Creates an ordered change feed: the publisher side goes to a store, the subscriber side to
/// the processing stage.
pub fn channel() -> (ChangePublisher, ChangeSubscriber) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChangePublisher { tx }, ChangeSubscriber { rx })
}

/// Write half of the change feed, cheap to clone.
#[derive(Clone, Debug)]
pub struct ChangePublisher {
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

impl ChangePublisher {
    /// Publishes an event. Returns `false` when nobody is listening any more.
    pub fn publish(&self, event: ChangeEvent) -> bool {
        let key = event.key.clone();
        let kind = event.kind;
        match self.tx.send(event) {
            Ok(()) => true,
            Err(_) => {
                tracing::error!(
                    key = %key,
                    kind = ?kind,
                    "change feed closed, event not delivered to processing stage"
                );
                false
            }
        }
    }
}

/// Read half of the change feed.
#[derive(Debug)]
pub struct ChangeSubscriber {
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl ChangeSubscriber {
    /// Waits for at least one event and returns up to `max` of them, in publish order.
    ///
    /// An empty batch means every publisher was dropped and the feed is drained.
    pub async fn recv_batch(&mut self, max: usize) -> Vec<ChangeEvent> {
        let mut batch = Vec::with_capacity(max.max(1));
        self.rx.recv_many(&mut batch, max.max(1)).await;
        batch
    }

    /// Takes whatever is queued right now without waiting.
    pub fn drain(&mut self) -> Vec<ChangeEvent> {
        let mut batch = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            batch.push(event);
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::ChangeKind;

    fn removed(key: &str) -> ChangeEvent {
        ChangeEvent {
            key: key.to_string(),
            kind: ChangeKind::Removed,
            new_image: None,
        }
    }

    #[tokio::test]
    async fn test_feed_preserves_order() {
        let (publisher, mut subscriber) = channel();
        for key in ["a", "b", "c"] {
            assert!(publisher.publish(removed(key)));
        }

        let batch = subscriber.recv_batch(10).await;
        let keys: Vec<&str> = batch.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_batch_is_capped() {
        let (publisher, mut subscriber) = channel();
        for key in ["a", "b", "c"] {
            publisher.publish(removed(key));
        }

        assert_eq!(subscriber.recv_batch(2).await.len(), 2);
        assert_eq!(subscriber.drain().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_feed_yields_empty_batch() {
        let (publisher, mut subscriber) = channel();
        drop(publisher);
        assert!(subscriber.recv_batch(10).await.is_empty());
    }

    #[test]
    fn test_publish_without_subscriber() {
        let (publisher, subscriber) = channel();
        drop(subscriber);
        assert!(!publisher.publish(removed("a")));
    }
}
