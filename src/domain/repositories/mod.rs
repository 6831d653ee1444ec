use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    errors::DomainError,
    models::{Heartbeat, Message},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexParams {
    pub skip: u32,
    pub limit: u32,
    /// Case-insensitive substring filter on the content.
    pub query: Option<String>,
}

impl IndexParams {
    pub const MAX_LIMIT: u32 = 200;

    pub fn new(skip: Option<u32>, limit: Option<u32>, query: Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            skip: skip.unwrap_or(defaults.skip),
            limit: limit.unwrap_or(defaults.limit).clamp(1, Self::MAX_LIMIT),
            query: query.filter(|q| !q.trim().is_empty()),
        }
    }
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 50,
            query: None,
        }
    }
}

/// Durable store of messages. Every lookup is keyed by tenant and id.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Fails with [`DomainError::AlreadyExists`] when the id is taken.
    async fn store(&self, message: &Message) -> Result<(), DomainError>;

    /// Replaces the record `message` was derived from. Fails with
    /// [`DomainError::Conflict`] when the stored record has moved on since that
    /// snapshot was loaded, and with [`DomainError::NotFound`] when absent.
    async fn update(&self, message: &Message) -> Result<(), DomainError>;

    async fn load(&self, user_id: Uuid, message_id: Uuid) -> Result<Message, DomainError>;

    /// Messages between `owner` and `contact`, newest `order_timestamp` first.
    async fn index(
        &self,
        user_id: Uuid,
        owner: &str,
        contact: &str,
        params: &IndexParams,
    ) -> Result<Vec<Message>, DomainError>;

    /// Claims a message that is due for delivery to the phone and moves it to
    /// `sending`. Fails with [`DomainError::NotFound`] when nothing is due.
    async fn get_outstanding(&self, user_id: Uuid, message_id: Uuid)
    -> Result<Message, DomainError>;
}

#[async_trait]
pub trait HeartbeatRepository: Send + Sync {
    async fn store(&self, heartbeat: &Heartbeat) -> Result<(), DomainError>;

    /// Heartbeats of one phone, newest first.
    async fn index(
        &self,
        user_id: Uuid,
        owner: &str,
        params: &IndexParams,
    ) -> Result<Vec<Heartbeat>, DomainError>;
}
