use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload of `heartbeat.phone.outstanding`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatPhoneOutstandingPayload {
    pub heartbeat_id: Uuid,
    pub user_id: Uuid,
    pub owner: String,
    pub timestamp: DateTime<Utc>,
    pub quantity: u32,
}
