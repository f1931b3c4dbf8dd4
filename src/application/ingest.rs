use super::signature::SignatureVerifier;
use crate::domain::notification::WebhookNotification;
use crate::domain::ports::NotificationStoreBox;
use crate::domain::record::{ChangeKind, IngestedRecord};
use crate::error::{Result, RoundUpError};
use crate::interfaces::webhook::PayloadParser;

/// What the store did with an accepted webhook.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct IngestReceipt {
    pub key: String,
    pub kind: ChangeKind,
}

/// Upserts notifications into the durable store under their stable key.
pub struct IngestWriter {
    store: NotificationStoreBox,
}

impl IngestWriter {
    pub fn new(store: NotificationStoreBox) -> Self {
        Self { store }
    }

    pub async fn write(&self, notification: WebhookNotification) -> Result<IngestReceipt> {
        let record = IngestedRecord::new(notification);
        let key = record.sequence_key.clone();
        let amount = record.notification.amount_minor_units;
        let currency = record.notification.currency.clone();

        match self.store.upsert(record).await {
            Ok(kind) => Ok(IngestReceipt { key, kind }),
            Err(err) => {
                tracing::error!(
                    key = %key,
                    amount,
                    currency = %currency,
                    error = %err,
                    "failed to store webhook notification"
                );
                Err(err)
            }
        }
    }
}

/// Ingestion stage: authenticate, decode, then durably record one webhook delivery.
///
/// Nothing past signature verification runs for an unauthenticated request, and nothing is
/// written for a body that fails to decode.
pub struct IngestionService {
    verifier: SignatureVerifier,
    parser: PayloadParser,
    writer: IngestWriter,
}

impl IngestionService {
    pub fn new(verifier: SignatureVerifier, writer: IngestWriter) -> Self {
        Self {
            verifier,
            parser: PayloadParser::new(),
            writer,
        }
    }

    pub async fn ingest(&self, body: &[u8], signature: Option<&str>) -> Result<IngestReceipt> {
        if !self.verifier.verify(body, signature) {
            tracing::warn!(
                signature_present = signature.is_some(),
                body_len = body.len(),
                "invalid webhook signature received"
            );
            return Err(RoundUpError::Authentication);
        }

        let notification = self.parser.parse(body).inspect_err(|err| {
            tracing::error!(error = %err, body_len = body.len(), "failed to decode webhook payload");
        })?;
        tracing::info!(
            notification_id = %notification.notification_id,
            transaction_id = %notification.transaction_id,
            transaction_type = ?notification.transaction_type,
            amount = notification.amount_minor_units,
            currency = %notification.currency,
            "webhook decoded"
        );

        let receipt = self.writer.write(notification).await?;
        tracing::info!(key = %receipt.key, kind = ?receipt.kind, "webhook stored");
        Ok(receipt)
    }
}
