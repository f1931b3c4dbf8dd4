use crate::domain::ports::{ChangeLogBox, ProcessedLedgerBox, SavingsGoalClientBox};
use crate::domain::record::ChangeEvent;
use crate::domain::roundup::{IneligibleReason, evaluate};
use crate::domain::transfer::{MinorAmount, ProcessingState, TransferOutcome};
use crate::error::RoundUpError;
use crate::infrastructure::change_feed::ChangeSubscriber;
use std::time::Duration;

/// Moves round-up amounts into the configured savings goal.
///
/// Issues exactly one API call per invocation and never retries: a repeat attempt is the
/// change feed's redelivery policy to decide, not ours.
pub struct TransferExecutor {
    client: SavingsGoalClientBox,
    goal: String,
}

impl TransferExecutor {
    pub fn new(client: SavingsGoalClientBox, goal: impl Into<String>) -> Self {
        Self {
            client,
            goal: goal.into(),
        }
    }

    /// Returns `None` without calling the bank when there is nothing to transfer.
    pub async fn execute(&self, key: &str, amount: &MinorAmount) -> Option<TransferOutcome> {
        if amount.minor_units <= 0 {
            tracing::info!(key = %key, amount = amount.minor_units, "nothing to round-up");
            return None;
        }

        let outcome = match self.client.add_money(&self.goal, amount).await {
            Ok(reference) => {
                tracing::info!(
                    key = %key,
                    amount = amount.minor_units,
                    currency = %amount.currency,
                    reference = %reference,
                    "round-up successful"
                );
                TransferOutcome::succeeded(reference)
            }
            Err(RoundUpError::DownstreamTransfer { status, detail }) => {
                tracing::error!(
                    key = %key,
                    amount = amount.minor_units,
                    currency = %amount.currency,
                    status = ?status,
                    detail = %detail,
                    "failed to move money to savings goal"
                );
                TransferOutcome::failed(detail)
            }
            Err(err) => {
                tracing::error!(
                    key = %key,
                    amount = amount.minor_units,
                    currency = %amount.currency,
                    error = %err,
                    "failed to move money to savings goal"
                );
                TransferOutcome::failed(err.to_string())
            }
        };
        Some(outcome)
    }
}

/// Bounded retry for events aborted by a storage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortRetry {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each further one.
    pub initial_backoff: Duration,
}

impl Default for AbortRetry {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

/// Processing stage: turns change events into at most one transfer each.
pub struct ChangeProcessor {
    executor: TransferExecutor,
    ledger: Option<ProcessedLedgerBox>,
    change_log: Option<ChangeLogBox>,
    retry: AbortRetry,
}

impl ChangeProcessor {
    pub fn new(executor: TransferExecutor) -> Self {
        Self {
            executor,
            ledger: None,
            change_log: None,
            retry: AbortRetry::default(),
        }
    }

    /// Consults `ledger` before every transfer so a redelivered insert cannot pay twice.
    pub fn with_ledger(mut self, ledger: ProcessedLedgerBox) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Acknowledges every event that reaches a terminal state, and replays what was left.
    pub fn with_change_log(mut self, change_log: ChangeLogBox) -> Self {
        self.change_log = Some(change_log);
        self
    }

    pub fn with_abort_retry(mut self, retry: AbortRetry) -> Self {
        self.retry = retry;
        self
    }

    pub async fn process(&self, event: &ChangeEvent) -> ProcessingState {
        let decision = evaluate(event);
        let notification = event.new_image.as_ref().map(|record| &record.notification);
        tracing::info!(
            key = %event.key,
            change = ?event.kind,
            amount = notification.map(|n| n.amount_minor_units),
            eligible = decision.eligible,
            round_up = decision.round_up_minor_units,
            reason = ?decision.reason,
            "round-up decision"
        );

        let Some(notification) = notification.filter(|_| decision.should_transfer()) else {
            return ProcessingState::RejectedIneligible(
                decision.reason.unwrap_or(IneligibleReason::ZeroRoundup),
            );
        };

        if let Some(ledger) = &self.ledger {
            match ledger.claim(&event.key).await {
                Ok(true) => {}
                Ok(false) => {
                    let previous = ledger
                        .get(&event.key)
                        .await
                        .ok()
                        .flatten()
                        .map(|entry| entry.status);
                    tracing::warn!(
                        key = %event.key,
                        amount = notification.amount_minor_units,
                        previous = ?previous,
                        "key already reached the transfer step, skipping round-up"
                    );
                    return ProcessingState::RejectedIneligible(IneligibleReason::RepeatEvent);
                }
                Err(err) => {
                    tracing::error!(
                        key = %event.key,
                        amount = notification.amount_minor_units,
                        currency = %notification.currency,
                        error = %err,
                        "idempotency ledger unavailable"
                    );
                    return ProcessingState::Aborted {
                        detail: err.to_string(),
                    };
                }
            }
        }

        let amount = MinorAmount {
            currency: notification.currency.clone(),
            minor_units: decision.round_up_minor_units,
        };
        let Some(outcome) = self.executor.execute(&event.key, &amount).await else {
            return ProcessingState::RejectedIneligible(IneligibleReason::ZeroRoundup);
        };

        if let Some(ledger) = &self.ledger
            && let Err(err) = ledger.record_outcome(&event.key, outcome.status).await
        {
            tracing::error!(
                key = %event.key,
                status = ?outcome.status,
                reference = ?outcome.transaction_reference,
                error = %err,
                "failed to record transfer outcome"
            );
        }

        outcome.into()
    }

    /// Processes one event to a terminal state, retrying storage aborts with backoff.
    ///
    /// Terminal events are acknowledged in the change log. An event still aborted after the
    /// last attempt stays there and is replayed on the next start.
    pub async fn settle(&self, event: &ChangeEvent) -> ProcessingState {
        let mut state = self.process(event).await;
        let mut attempt = 1;
        let mut backoff = self.retry.initial_backoff;
        while matches!(state, ProcessingState::Aborted { .. }) && attempt < self.retry.max_attempts
        {
            tracing::warn!(
                key = %event.key,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                "retrying aborted change event"
            );
            tokio::time::sleep(backoff).await;
            backoff = backoff.saturating_mul(2);
            attempt += 1;
            state = self.process(event).await;
        }

        match &state {
            ProcessingState::Aborted { detail } => tracing::error!(
                key = %event.key,
                attempts = attempt,
                detail = %detail,
                "change event left unprocessed until replay"
            ),
            _ => self.acknowledge(event).await,
        }
        state
    }

    async fn acknowledge(&self, event: &ChangeEvent) {
        let Some(change_log) = &self.change_log else {
            return;
        };
        if let Err(err) = change_log.acknowledge(event).await {
            tracing::error!(key = %event.key, error = %err, "failed to acknowledge change event");
        }
    }

    /// Handles a delivered batch event by event; one event's failure never stops the rest.
    pub async fn process_batch(&self, events: &[ChangeEvent]) -> Vec<ProcessingState> {
        let mut states = Vec::with_capacity(events.len());
        for event in events {
            states.push(self.settle(event).await);
        }
        states
    }

    /// Re-processes events the change log still holds from an earlier run. Call before the
    /// store starts accepting writes.
    pub async fn replay_pending(&self) -> Vec<ProcessingState> {
        let Some(change_log) = &self.change_log else {
            return Vec::new();
        };
        match change_log.pending().await {
            Ok(events) => {
                if !events.is_empty() {
                    tracing::info!(events = events.len(), "replaying unprocessed change events");
                }
                self.process_batch(&events).await
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to read unprocessed change events");
                Vec::new()
            }
        }
    }

    /// Dispatch loop: consumes the change feed until every publisher is gone.
    pub async fn run(&self, mut subscriber: ChangeSubscriber, batch_size: usize) {
        loop {
            let batch = subscriber.recv_batch(batch_size).await;
            if batch.is_empty() {
                tracing::info!("change feed closed, processing stage stopping");
                return;
            }
            tracing::debug!(events = batch.len(), "processing change batch");
            self.process_batch(&batch).await;
        }
    }
}
