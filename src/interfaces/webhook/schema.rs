//! Wire schemas of the bank's transaction webhooks.
//!
//! Every field is optional on the wire. Absent or `null` fields fall back to safe defaults
//! during mapping; a field that is present with the wrong JSON type fails the decode.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// First-generation webhook. Amounts are signed, fractional major units.
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyPayload {
    pub webhook_notification_uid: Option<String>,
    pub customer_uid: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub content: Option<LegacyContent>,
}

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyContent {
    pub transaction_uid: Option<String>,
    #[serde(deserialize_with = "major_units")]
    pub amount: Option<Decimal>,
    pub source_currency: Option<String>,
    pub counter_party: Option<String>,
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub for_customer: Option<String>,
}

impl LegacyContent {
    /// The customer-facing label of the transaction, as shown in the banking app.
    pub fn description(&self) -> Option<&str> {
        self.for_customer
            .as_deref()
            .or(self.counter_party.as_deref())
            .or(self.reference.as_deref())
    }
}

/// Feed-item webhook. Amounts are unsigned minor units with an explicit direction.
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedItemPayload {
    pub webhook_event_uid: Option<String>,
    pub event_timestamp: Option<DateTime<Utc>>,
    pub account_holder_uid: Option<String>,
    pub content: Option<FeedItemContent>,
}

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedItemContent {
    pub feed_item_uid: Option<String>,
    pub amount: Option<CurrencyAndAmount>,
    pub direction: Option<Direction>,
    pub source: Option<String>,
    pub transaction_time: Option<DateTime<Utc>>,
    pub counter_party_name: Option<String>,
    pub reference: Option<String>,
}

impl FeedItemContent {
    pub fn description(&self) -> Option<&str> {
        self.counter_party_name
            .as_deref()
            .or(self.reference.as_deref())
    }
}

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CurrencyAndAmount {
    pub currency: Option<String>,
    pub minor_units: Option<i64>,
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
    #[serde(other)]
    Unknown,
}

/// Reads a JSON number as an exact decimal using its shortest textual form, so `-2.1`
/// becomes `-2.1` rather than the nearest binary float.
fn major_units<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Some)
        .map_err(|e| serde::de::Error::custom(format!("amount {text} out of range: {e}")))
}
