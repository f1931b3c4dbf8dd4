#![allow(dead_code)]

use async_trait::async_trait;
use roundup::domain::ports::SavingsGoalClient;
use roundup::domain::transfer::MinorAmount;
use roundup::error::{Result, RoundUpError};
use std::sync::{Arc, Mutex};

pub const WEBHOOK_SECRET: &str = "integration-secret";
pub const GOAL: &str = "goal-uid";

/// Savings-goal client that records every call instead of reaching a bank.
#[derive(Clone, Default)]
pub struct RecordingClient {
    pub calls: Arc<Mutex<Vec<(String, MinorAmount)>>>,
    pub fail: bool,
}

impl RecordingClient {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, MinorAmount)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SavingsGoalClient for RecordingClient {
    async fn add_money(&self, goal: &str, amount: &MinorAmount) -> Result<String> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((goal.to_string(), amount.clone()));
        if self.fail {
            return Err(RoundUpError::DownstreamTransfer {
                status: Some(500),
                detail: "bank unavailable".to_string(),
            });
        }
        Ok(format!("ref-{}", calls.len()))
    }
}

/// A legacy-schema webhook body.
pub fn legacy_body(transaction_uid: &str, amount: &str, kind: &str) -> String {
    format!(
        r#"{{"webhookNotificationUid":"n-{transaction_uid}","customerUid":"c-1","webhookType":"{kind}","timestamp":"2017-06-05T12:50:15.482Z","content":{{"class":"PAYMENT","transactionUid":"{transaction_uid}","amount":{amount},"sourceCurrency":"GBP","sourceAmount":{amount},"type":"{kind}"}}}}"#
    )
}

/// A feed-item-schema webhook body.
pub fn feed_item_body(feed_item_uid: &str, minor_units: i64, direction: &str, source: &str) -> String {
    format!(
        r#"{{"webhookEventUid":"evt-{feed_item_uid}","eventTimestamp":"2024-03-01T10:00:00Z","accountHolderUid":"holder-1","content":{{"feedItemUid":"{feed_item_uid}","amount":{{"currency":"GBP","minorUnits":{minor_units}}},"direction":"{direction}","source":"{source}"}}}}"#
    )
}
