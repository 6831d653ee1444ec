use poem_openapi::Object;
use uuid::Uuid;

use crate::presentation::models::{MessageStatusKind, MessageTypeKind};

#[derive(Object)]
pub struct MessageDto {
    pub id: Uuid,
    pub owner: String,
    pub contact: String,
    pub content: String,
    #[oai(rename = "type")]
    pub message_type: MessageTypeKind,
    pub status: MessageStatusKind,
    pub request_received_at: String,
    pub created_at: String,
    pub updated_at: String,
    pub order_timestamp: String,
    pub last_attempted_at: Option<String>,
    pub sent_at: Option<String>,
    pub received_at: Option<String>,
    /// Milliseconds between the API request and the phone sending the message.
    pub send_duration_ms: Option<i64>,
    pub error_message: Option<String>,
}

#[derive(Object)]
pub struct HeartbeatDto {
    pub id: Uuid,
    pub owner: String,
    pub timestamp: String,
    pub quantity: u32,
}
