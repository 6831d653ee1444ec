use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload of `message.api.sent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageApiSentPayload {
    pub id: Uuid,
    pub user_id: Uuid,
    pub owner: String,
    pub contact: String,
    pub request_received_at: DateTime<Utc>,
    pub content: String,
}

/// Shared payload of the phone-side notifications: `message.phone.sending`,
/// `message.phone.sent`, `message.phone.delivered` and `message.phone.received`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePhonePayload {
    pub id: Uuid,
    pub user_id: Uuid,
    pub owner: String,
    pub contact: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

/// Payload of `message.send.failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSendFailedPayload {
    pub id: Uuid,
    pub user_id: Uuid,
    pub owner: String,
    pub contact: String,
    pub timestamp: DateTime<Utc>,
    pub error_message: String,
    pub content: String,
}

/// Payload of `message.send.expired`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSendExpiredPayload {
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub owner: String,
    pub contact: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

/// Payload of `message.send.expired.check`, delivered no earlier than `scheduled_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSendExpiredCheckPayload {
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
}
