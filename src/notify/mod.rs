//! Notification sink.
//!
//! Delivery is an external collaborator: the engine emits typed events
//! through [`NotificationSink`] and never waits on or propagates delivery
//! failures. The payload is a tagged union keyed by event type, not a
//! free-form metadata bag.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core_types::{GroupId, RoundId, TxnId, UserId};
use crate::money::Amount;

/// Typed notification payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationKind {
    GroupStarted {
        group: GroupId,
        group_name: String,
        expected_end_date: DateTime<Utc>,
    },
    MemberJoined {
        group: GroupId,
        user: UserId,
    },
    MemberRemoved {
        group: GroupId,
        user: UserId,
    },
    PaymentReceived {
        round: RoundId,
        payer: UserId,
        amount: Amount,
        late: bool,
    },
    RoundCompleted {
        round: RoundId,
        round_number: u32,
        collected: Amount,
    },
    PayoutSent {
        round: RoundId,
        amount: Amount,
    },
    GroupCompleted {
        group: GroupId,
        total_distributed: Amount,
    },
    DisputeOpened {
        transaction: TxnId,
        reason: String,
    },
    DisputeResolved {
        transaction: TxnId,
        resolution: String,
    },
}

impl NotificationKind {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::GroupStarted { .. } => "group_started",
            NotificationKind::MemberJoined { .. } => "member_joined",
            NotificationKind::MemberRemoved { .. } => "member_removed",
            NotificationKind::PaymentReceived { .. } => "payment_received",
            NotificationKind::RoundCompleted { .. } => "round_completed",
            NotificationKind::PayoutSent { .. } => "payout_sent",
            NotificationKind::GroupCompleted { .. } => "group_completed",
            NotificationKind::DisputeOpened { .. } => "dispute_opened",
            NotificationKind::DisputeResolved { .. } => "dispute_resolved",
        }
    }
}

/// Fire-and-forget delivery seam.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, user: UserId, kind: NotificationKind);
}

/// Default sink: structured log lines only. Real push/email/SMS transports
/// plug in behind the same trait.
pub struct TracingSink;

#[async_trait]
impl NotificationSink for TracingSink {
    async fn notify(&self, user: UserId, kind: NotificationKind) {
        match serde_json::to_string(&kind) {
            Ok(payload) => {
                tracing::info!(user_id = %user, event = kind.label(), %payload, "notify")
            }
            Err(e) => tracing::warn!(user_id = %user, error = %e, "notification not serializable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_tagged_by_type() {
        let kind = NotificationKind::PaymentReceived {
            round: RoundId::new(),
            payer: UserId(7),
            amount: Amount::from_minor(10_000),
            late: true,
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&kind).unwrap()).unwrap();
        assert_eq!(json["type"], "payment_received");
        assert_eq!(json["late"], true);
        assert_eq!(json["payer"], 7);
    }

    #[tokio::test]
    async fn test_tracing_sink_never_fails() {
        let sink = TracingSink;
        sink.notify(
            UserId(1),
            NotificationKind::MemberJoined {
                group: GroupId::new(),
                user: UserId(1),
            },
        )
        .await;
    }
}
