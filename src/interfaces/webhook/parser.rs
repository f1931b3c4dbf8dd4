use super::schema::{Direction, FeedItemPayload, LegacyPayload};
use crate::domain::notification::{TransactionType, WebhookNotification};
use crate::error::{Result, RoundUpError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

/// The closed set of webhook schema versions we understand.
#[derive(Debug, PartialEq)]
pub enum VersionedPayload {
    Legacy(LegacyPayload),
    FeedItem(FeedItemPayload),
}

impl VersionedPayload {
    /// Picks the schema from the shape of `content.amount`: an object means feed item,
    /// anything else is treated as the legacy schema.
    pub fn detect(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(RoundUpError::Decode(
                "webhook body is not a JSON object".to_string(),
            ));
        }
        let is_feed_item = value
            .pointer("/content/amount")
            .is_some_and(Value::is_object);
        if is_feed_item {
            Ok(Self::FeedItem(serde_json::from_value(value)?))
        } else {
            Ok(Self::Legacy(serde_json::from_value(value)?))
        }
    }

    pub fn into_notification(self, raw_payload: String) -> Result<WebhookNotification> {
        match self {
            Self::Legacy(payload) => map_legacy(payload, raw_payload),
            Self::FeedItem(payload) => Ok(map_feed_item(payload, raw_payload)),
        }
    }
}

/// Decodes raw webhook bodies into [`WebhookNotification`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct PayloadParser;

impl PayloadParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, body: &[u8]) -> Result<WebhookNotification> {
        let value: Value = serde_json::from_slice(body)?;
        let raw_payload = String::from_utf8_lossy(body).into_owned();
        VersionedPayload::detect(value)?.into_notification(raw_payload)
    }
}

fn map_legacy(payload: LegacyPayload, raw_payload: String) -> Result<WebhookNotification> {
    let content = payload.content.unwrap_or_default();
    tracing::debug!(
        transaction = content.transaction_uid.as_deref().unwrap_or_default(),
        description = content.description().unwrap_or_default(),
        "decoded legacy webhook"
    );
    let amount_minor_units = match content.amount {
        Some(amount) => major_to_minor(amount)?,
        None => 0,
    };
    let transaction_type = match content.kind.as_deref() {
        Some("TRANSACTION_CARD") => TransactionType::Card,
        Some("TRANSACTION_MOBILE_WALLET") => TransactionType::MobileWallet,
        _ => TransactionType::Other,
    };

    Ok(WebhookNotification {
        notification_id: payload.webhook_notification_uid.unwrap_or_default(),
        customer_id: payload.customer_uid.unwrap_or_default(),
        transaction_id: content.transaction_uid.unwrap_or_default(),
        amount_minor_units,
        currency: content.source_currency.unwrap_or_default(),
        transaction_type,
        timestamp: payload.timestamp,
        raw_payload,
    })
}

fn map_feed_item(payload: FeedItemPayload, raw_payload: String) -> WebhookNotification {
    let content = payload.content.unwrap_or_default();
    tracing::debug!(
        feed_item = content.feed_item_uid.as_deref().unwrap_or_default(),
        description = content.description().unwrap_or_default(),
        "decoded feed item webhook"
    );
    let amount = content.amount.unwrap_or_default();
    let magnitude = amount.minor_units.unwrap_or_default();
    let amount_minor_units = match content.direction {
        Some(Direction::Out) => -magnitude.saturating_abs(),
        Some(Direction::In) => magnitude.saturating_abs(),
        _ => magnitude,
    };
    let transaction_type = match content.source.as_deref() {
        Some("MASTER_CARD" | "VISA") => TransactionType::Card,
        Some("APPLE_PAY" | "GOOGLE_PAY" | "SAMSUNG_PAY") => TransactionType::MobileWallet,
        _ => TransactionType::Other,
    };

    WebhookNotification {
        notification_id: payload.webhook_event_uid.unwrap_or_default(),
        customer_id: payload.account_holder_uid.unwrap_or_default(),
        transaction_id: content.feed_item_uid.unwrap_or_default(),
        amount_minor_units,
        currency: amount.currency.unwrap_or_default(),
        transaction_type,
        timestamp: content.transaction_time.or(payload.event_timestamp),
        raw_payload,
    }
}

/// Converts fractional major units to an exact minor-unit count, rounding half away from zero.
pub fn major_to_minor(amount: Decimal) -> Result<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| RoundUpError::Decode(format!("amount {amount} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn parse(body: &str) -> Result<WebhookNotification> {
        PayloadParser::new().parse(body.as_bytes())
    }

    #[test]
    fn test_major_to_minor() {
        assert_eq!(major_to_minor(dec!(-2.5)).unwrap(), -250);
        assert_eq!(major_to_minor(dec!(-0.1)).unwrap(), -10);
        assert_eq!(major_to_minor(dec!(-1.005)).unwrap(), -101);
        assert_eq!(major_to_minor(dec!(1.004)).unwrap(), 100);
        assert_eq!(major_to_minor(dec!(0)).unwrap(), 0);
    }

    #[test]
    fn test_major_to_minor_overflow() {
        assert!(matches!(
            major_to_minor(Decimal::MAX),
            Err(RoundUpError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_legacy_card_debit() {
        let notification = parse(
            r#"{
                "webhookNotificationUid": "n-1",
                "customerUid": "c-1",
                "webhookType": "TRANSACTION_CARD",
                "timestamp": "2017-06-05T12:50:15.482Z",
                "content": {
                    "class": "PAYMENT",
                    "transactionUid": "tx-1",
                    "amount": -2.5,
                    "sourceCurrency": "GBP",
                    "sourceAmount": -2.5,
                    "counterParty": "Coffee",
                    "reference": "Coffee",
                    "type": "TRANSACTION_CARD",
                    "forCustomer": "Coffee"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(notification.notification_id, "n-1");
        assert_eq!(notification.customer_id, "c-1");
        assert_eq!(notification.transaction_id, "tx-1");
        assert_eq!(notification.amount_minor_units, -250);
        assert_eq!(notification.currency, "GBP");
        assert_eq!(notification.transaction_type, TransactionType::Card);
        assert!(notification.timestamp.is_some());
        assert!(notification.raw_payload.contains("tx-1"));
    }

    #[test]
    fn test_parse_legacy_types() {
        let wallet = parse(r#"{"content": {"type": "TRANSACTION_MOBILE_WALLET", "amount": -1}}"#)
            .unwrap();
        assert_eq!(wallet.transaction_type, TransactionType::MobileWallet);
        assert_eq!(wallet.amount_minor_units, -100);

        let direct_debit = parse(r#"{"content": {"type": "DIRECT_DEBIT", "amount": -1}}"#).unwrap();
        assert_eq!(direct_debit.transaction_type, TransactionType::Other);
    }

    #[test]
    fn test_parse_defaults_absent_fields() {
        let notification = parse("{}").unwrap();
        assert_eq!(notification.transaction_type, TransactionType::Other);
        assert_eq!(notification.amount_minor_units, 0);
        assert_eq!(notification.notification_id, "");
        assert_eq!(notification.timestamp, None);
    }

    #[test]
    fn test_parse_feed_item() {
        let notification = parse(
            r#"{
                "webhookEventUid": "evt-1",
                "eventTimestamp": "2024-03-01T10:00:00Z",
                "accountHolderUid": "holder-1",
                "content": {
                    "feedItemUid": "feed-1",
                    "amount": {"currency": "EUR", "minorUnits": 199},
                    "direction": "OUT",
                    "source": "APPLE_PAY",
                    "transactionTime": "2024-03-01T09:59:58Z"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(notification.notification_id, "evt-1");
        assert_eq!(notification.customer_id, "holder-1");
        assert_eq!(notification.transaction_id, "feed-1");
        assert_eq!(notification.amount_minor_units, -199);
        assert_eq!(notification.currency, "EUR");
        assert_eq!(notification.transaction_type, TransactionType::MobileWallet);
    }

    #[test]
    fn test_parse_feed_item_inbound() {
        let notification = parse(
            r#"{"content": {"amount": {"currency": "GBP", "minorUnits": 500},
                "direction": "IN", "source": "FASTER_PAYMENTS_IN"}}"#,
        )
        .unwrap();
        assert_eq!(notification.amount_minor_units, 500);
        assert_eq!(notification.transaction_type, TransactionType::Other);
    }

    #[test]
    fn test_parse_rejects_malformed_body() {
        assert!(matches!(parse("{not json"), Err(RoundUpError::Decode(_))));
        assert!(matches!(parse("[1, 2]"), Err(RoundUpError::Decode(_))));
        assert!(matches!(parse(""), Err(RoundUpError::Decode(_))));
    }

    #[test]
    fn test_parse_rejects_wrongly_typed_field() {
        assert!(matches!(
            parse(r#"{"content": {"amount": {"minorUnits": "lots"}}}"#),
            Err(RoundUpError::Decode(_))
        ));
    }
}
