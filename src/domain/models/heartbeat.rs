use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A liveness ping from the owner's phone. Heartbeats are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub owner: String,
    pub timestamp: DateTime<Utc>,
    /// Messages the phone still has queued locally.
    pub quantity: u32,
}
