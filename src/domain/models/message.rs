use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;

/// Failure reason recorded when the phone reports a failure without one.
pub const UNKNOWN_ERROR: &str = "UNKNOWN ERROR";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    MobileOriginated,
    MobileTerminated,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::MobileOriginated => "mobile_originated",
            MessageType::MobileTerminated => "mobile_terminated",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "mobile_originated" => Some(MessageType::MobileOriginated),
            "mobile_terminated" => Some(MessageType::MobileTerminated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Sending,
    Sent,
    Delivered,
    Failed,
    Expired,
    /// Inbound messages only. The phone may still report them as failed.
    Received,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Failed => "failed",
            MessageStatus::Expired => "expired",
            MessageStatus::Received => "received",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MessageStatus::Pending),
            "sending" => Some(MessageStatus::Sending),
            "sent" => Some(MessageStatus::Sent),
            "delivered" => Some(MessageStatus::Delivered),
            "failed" => Some(MessageStatus::Failed),
            "expired" => Some(MessageStatus::Expired),
            "received" => Some(MessageStatus::Received),
            _ => None,
        }
    }

    /// The message has not reached the phone's radio yet.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, MessageStatus::Pending | MessageStatus::Sending)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Guarded status-changing operations on a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    MarkSending,
    RegisterSendAttempt,
    MarkSent,
    MarkDelivered,
    MarkFailed,
    MarkExpired,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::MarkSending => "mark_sending",
            Transition::RegisterSendAttempt => "register_send_attempt",
            Transition::MarkSent => "mark_sent",
            Transition::MarkDelivered => "mark_delivered",
            Transition::MarkFailed => "mark_failed",
            Transition::MarkExpired => "mark_expired",
        }
    }

    /// Statuses the operation may be applied to.
    pub fn allowed_from(&self) -> &'static [MessageStatus] {
        use MessageStatus::*;

        match self {
            Transition::MarkSending => &[Pending, Sending],
            Transition::RegisterSendAttempt => &[Sending],
            Transition::MarkSent => &[Sending, Expired],
            Transition::MarkDelivered => &[Sent, Sending, Expired],
            Transition::MarkFailed => &[Pending, Sending, Sent, Failed, Expired, Received],
            Transition::MarkExpired => &[Sending, Pending],
        }
    }

    pub fn target(&self) -> MessageStatus {
        match self {
            Transition::MarkSending | Transition::RegisterSendAttempt => MessageStatus::Sending,
            Transition::MarkSent => MessageStatus::Sent,
            Transition::MarkDelivered => MessageStatus::Delivered,
            Transition::MarkFailed => MessageStatus::Failed,
            Transition::MarkExpired => MessageStatus::Expired,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An SMS relayed between the API and the owner's phone.
///
/// `status` is only changed through the guarded transitions below, each of which
/// returns a new snapshot and leaves `self` untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub user_id: Uuid,
    pub owner: String,
    pub contact: String,
    pub content: String,
    pub message_type: MessageType,
    pub(crate) status: MessageStatus,
    pub request_received_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub order_timestamp: DateTime<Utc>,
    pub last_attempted_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub send_duration: Option<TimeDelta>,
    pub error_message: Option<String>,
    /// Bumped by every transition. Repositories only accept a snapshot one
    /// version ahead of the stored record.
    pub(crate) version: i64,
}

impl Message {
    /// A message requested through the API, waiting for the phone to pick it up.
    pub fn outbound(
        id: Uuid,
        user_id: Uuid,
        owner: String,
        contact: String,
        content: String,
        request_received_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            owner,
            contact,
            content,
            message_type: MessageType::MobileTerminated,
            status: MessageStatus::Pending,
            request_received_at,
            created_at: now,
            updated_at: now,
            order_timestamp: request_received_at,
            last_attempted_at: None,
            sent_at: None,
            received_at: None,
            send_duration: None,
            error_message: None,
            version: 0,
        }
    }

    /// A message the phone received from `contact`.
    pub fn inbound(
        id: Uuid,
        user_id: Uuid,
        owner: String,
        contact: String,
        content: String,
        received_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            owner,
            contact,
            content,
            message_type: MessageType::MobileOriginated,
            status: MessageStatus::Received,
            request_received_at: received_at,
            created_at: now,
            updated_at: now,
            order_timestamp: received_at,
            last_attempted_at: None,
            sent_at: None,
            received_at: Some(received_at),
            send_duration: None,
            error_message: None,
            version: 0,
        }
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    /// The repository picked the message up for delivery to the phone.
    pub fn mark_sending(&self) -> Result<Message, DomainError> {
        self.transition(Transition::MarkSending, |_| {})
    }

    pub fn register_send_attempt(&self, at: DateTime<Utc>) -> Result<Message, DomainError> {
        self.transition(Transition::RegisterSendAttempt, |message| {
            message.last_attempted_at = Some(at);
            message.advance_order_timestamp(at);
        })
    }

    /// `send_duration` is measured from `request_received_at` and may be negative
    /// when the phone clock is behind.
    pub fn mark_sent(&self, at: DateTime<Utc>) -> Result<Message, DomainError> {
        self.transition(Transition::MarkSent, |message| {
            message.sent_at = Some(at);
            message.send_duration = Some(at - message.request_received_at);
            message.advance_order_timestamp(at);
        })
    }

    pub fn mark_delivered(&self, at: DateTime<Utc>) -> Result<Message, DomainError> {
        self.transition(Transition::MarkDelivered, |message| {
            message.received_at = Some(at);
            message.advance_order_timestamp(at);
        })
    }

    pub fn mark_failed(
        &self,
        at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> Result<Message, DomainError> {
        self.transition(Transition::MarkFailed, |message| {
            message.error_message = Some(reason.unwrap_or(UNKNOWN_ERROR).to_string());
            message.advance_order_timestamp(at);
        })
    }

    pub fn mark_expired(&self, at: DateTime<Utc>) -> Result<Message, DomainError> {
        self.transition(Transition::MarkExpired, |message| {
            message.advance_order_timestamp(at);
        })
    }

    fn transition(
        &self,
        operation: Transition,
        apply: impl FnOnce(&mut Message),
    ) -> Result<Message, DomainError> {
        if !operation.allowed_from().contains(&self.status) {
            return Err(DomainError::InvalidTransition {
                operation,
                status: self.status,
            });
        }

        let mut next = self.clone();
        apply(&mut next);
        next.status = operation.target();
        next.version += 1;
        next.touch();
        Ok(next)
    }

    fn advance_order_timestamp(&mut self, at: DateTime<Utc>) {
        if at > self.order_timestamp {
            self.order_timestamp = at;
        }
    }

    // strictly increasing, even when two transitions land in the same clock tick
    fn touch(&mut self) {
        let floor = self.updated_at + TimeDelta::microseconds(1);
        self.updated_at = Utc::now().max(floor);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    const ALL_STATUSES: [MessageStatus; 7] = [
        MessageStatus::Pending,
        MessageStatus::Sending,
        MessageStatus::Sent,
        MessageStatus::Delivered,
        MessageStatus::Failed,
        MessageStatus::Expired,
        MessageStatus::Received,
    ];

    const ALL_TRANSITIONS: [Transition; 6] = [
        Transition::MarkSending,
        Transition::RegisterSendAttempt,
        Transition::MarkSent,
        Transition::MarkDelivered,
        Transition::MarkFailed,
        Transition::MarkExpired,
    ];

    fn message_with_status(status: MessageStatus) -> Message {
        let mut message = Message::outbound(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "+18005550199".to_string(),
            "+18005550100".to_string(),
            "hello".to_string(),
            Utc::now() - Duration::minutes(5),
        );
        message.status = status;
        message
    }

    fn apply(message: &Message, transition: Transition) -> Result<Message, DomainError> {
        let at = Utc::now();
        match transition {
            Transition::MarkSending => message.mark_sending(),
            Transition::RegisterSendAttempt => message.register_send_attempt(at),
            Transition::MarkSent => message.mark_sent(at),
            Transition::MarkDelivered => message.mark_delivered(at),
            Transition::MarkFailed => message.mark_failed(at, Some("timeout")),
            Transition::MarkExpired => message.mark_expired(at),
        }
    }

    #[test]
    fn allowed_transitions_reach_target_with_newer_updated_at() {
        for transition in ALL_TRANSITIONS {
            for status in transition.allowed_from() {
                let message = message_with_status(*status);
                let next = apply(&message, transition)
                    .unwrap_or_else(|err| panic!("{transition} from {status}: {err}"));

                assert_eq!(next.status(), transition.target(), "{transition} from {status}");
                assert!(next.updated_at > message.updated_at, "{transition} from {status}");
            }
        }
    }

    #[test]
    fn disallowed_transitions_are_rejected() {
        for transition in ALL_TRANSITIONS {
            for status in ALL_STATUSES {
                if transition.allowed_from().contains(&status) {
                    continue;
                }
                let message = message_with_status(status);
                let before = message.clone();

                let err = apply(&message, transition).expect_err("transition should be rejected");

                assert!(err.is_invalid_transition(), "{transition} from {status}");
                assert_eq!(message, before);
            }
        }
    }

    #[test]
    fn each_transition_bumps_the_version() {
        let message = message_with_status(MessageStatus::Pending);

        let sending = message.mark_sending().unwrap();
        let attempt = sending.register_send_attempt(Utc::now()).unwrap();
        let expired = attempt.mark_expired(Utc::now()).unwrap();

        assert_eq!(message.version(), 0);
        assert_eq!(sending.version(), 1);
        assert_eq!(attempt.version(), 2);
        assert_eq!(expired.version(), 3);
        assert!(expired.mark_expired(Utc::now()).is_err());
    }

    #[test]
    fn received_message_can_be_failed() {
        let message = Message::inbound(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "+18005550199".to_string(),
            "+18005550100".to_string(),
            "hello".to_string(),
            Utc::now(),
        );

        let failed = message.mark_failed(Utc::now(), Some("storage full")).unwrap();

        assert_eq!(failed.status(), MessageStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("storage full"));
    }

    #[test]
    fn delivered_can_not_be_failed() {
        let message = message_with_status(MessageStatus::Delivered);
        let err = message.mark_failed(Utc::now(), Some("timeout")).unwrap_err();

        match err {
            DomainError::InvalidTransition { operation, status } => {
                assert_eq!(operation, Transition::MarkFailed);
                assert_eq!(status, MessageStatus::Delivered);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn sent_records_send_duration_from_request_time() {
        let message = message_with_status(MessageStatus::Sending);
        let at = message.request_received_at + Duration::seconds(42);

        let sent = message.mark_sent(at).unwrap();

        assert_eq!(sent.sent_at, Some(at));
        assert_eq!(sent.send_duration, Some(Duration::seconds(42)));
    }

    #[test]
    fn sent_before_request_time_yields_negative_duration() {
        let message = message_with_status(MessageStatus::Sending);
        let at = message.request_received_at - Duration::milliseconds(1500);

        let sent = message.mark_sent(at).unwrap();

        assert_eq!(sent.send_duration, Some(Duration::milliseconds(-1500)));
    }

    #[test]
    fn failed_without_reason_uses_unknown_error() {
        let message = message_with_status(MessageStatus::Sending);
        let failed = message.mark_failed(Utc::now(), None).unwrap();

        assert_eq!(failed.error_message.as_deref(), Some(UNKNOWN_ERROR));
    }

    #[test]
    fn send_attempt_records_time_and_keeps_sending() {
        let message = message_with_status(MessageStatus::Sending);
        let at = Utc::now();

        let next = message.register_send_attempt(at).unwrap();

        assert_eq!(next.status(), MessageStatus::Sending);
        assert_eq!(next.last_attempted_at, Some(at));
        assert_eq!(next.order_timestamp, at);
    }

    #[test]
    fn order_timestamp_never_moves_backwards() {
        let message = message_with_status(MessageStatus::Sending);
        let earlier = message.order_timestamp - Duration::hours(1);

        let delivered = message.mark_delivered(earlier).unwrap();

        assert_eq!(delivered.order_timestamp, message.order_timestamp);
        assert_eq!(delivered.received_at, Some(earlier));
    }

    #[test]
    fn status_round_trips_through_its_text_form() {
        for status in ALL_STATUSES {
            assert_eq!(MessageStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(MessageStatus::from_str("scheduled"), None);
    }
}
