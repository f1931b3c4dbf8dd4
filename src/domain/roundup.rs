use super::record::{ChangeEvent, ChangeKind};
use serde::Serialize;

/// Minor units in one major unit for two-decimal currencies.
pub const MINOR_PER_MAJOR: u64 = 100;

/// Minor units needed to bring a debit up to the next whole major unit.
///
/// `amount_minor_units` is the signed transaction amount; only debits (negative values)
/// produce a non-zero result. A debit that is already a whole number of major units
/// rounds up by zero.
pub fn round_up(amount_minor_units: i64) -> i64 {
    if amount_minor_units >= 0 {
        return 0;
    }
    let debit = amount_minor_units.unsigned_abs();
    ((MINOR_PER_MAJOR - debit % MINOR_PER_MAJOR) % MINOR_PER_MAJOR) as i64
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IneligibleReason {
    NotCardTransaction,
    InboundAmount,
    ZeroRoundup,
    RepeatEvent,
}

impl std::fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::NotCardTransaction => "NOT_CARD_TRANSACTION",
            Self::InboundAmount => "INBOUND_AMOUNT",
            Self::ZeroRoundup => "ZERO_ROUNDUP",
            Self::RepeatEvent => "REPEAT_EVENT",
        };
        f.write_str(label)
    }
}

/// Per-event verdict. Never persisted.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct RoundUpDecision {
    pub eligible: bool,
    pub round_up_minor_units: i64,
    pub reason: Option<IneligibleReason>,
}

impl RoundUpDecision {
    pub fn rejected(reason: IneligibleReason) -> Self {
        Self {
            eligible: false,
            round_up_minor_units: 0,
            reason: Some(reason),
        }
    }

    /// An eligible decision. A zero round-up stays eligible but carries `ZeroRoundup`.
    pub fn eligible(round_up_minor_units: i64) -> Self {
        Self {
            eligible: true,
            round_up_minor_units,
            reason: (round_up_minor_units == 0).then_some(IneligibleReason::ZeroRoundup),
        }
    }

    /// True only when a transfer should actually be issued.
    pub fn should_transfer(&self) -> bool {
        self.eligible && self.round_up_minor_units > 0
    }
}

/// Applies the eligibility rules in order; the first match wins.
pub fn evaluate(event: &ChangeEvent) -> RoundUpDecision {
    if event.kind != ChangeKind::Inserted {
        return RoundUpDecision::rejected(IneligibleReason::RepeatEvent);
    }
    let Some(record) = event.new_image.as_ref() else {
        return RoundUpDecision::rejected(IneligibleReason::RepeatEvent);
    };
    let notification = &record.notification;

    if !notification.transaction_type.is_card() {
        return RoundUpDecision::rejected(IneligibleReason::NotCardTransaction);
    }
    if !notification.is_debit() {
        return RoundUpDecision::rejected(IneligibleReason::InboundAmount);
    }

    RoundUpDecision::eligible(round_up(notification.amount_minor_units))
}
