use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    errors::DomainError,
    models::{Heartbeat, Message},
    repositories::{HeartbeatRepository, IndexParams, MessageRepository},
};

type MessageKey = (Uuid, Uuid);

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: Arc<RwLock<HashMap<MessageKey, Message>>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found(user_id: Uuid, message_id: Uuid) -> DomainError {
    DomainError::NotFound(format!("message [{message_id}] of user [{user_id}]"))
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn store(&self, message: &Message) -> Result<(), DomainError> {
        let mut messages = self.messages.write().await;
        let key = (message.user_id, message.id);
        if messages.contains_key(&key) {
            return Err(DomainError::AlreadyExists(format!("message [{}]", message.id)));
        }
        messages.insert(key, message.clone());
        Ok(())
    }

    async fn update(&self, message: &Message) -> Result<(), DomainError> {
        let mut messages = self.messages.write().await;
        match messages.get_mut(&(message.user_id, message.id)) {
            Some(existing) if existing.version() + 1 == message.version() => {
                *existing = message.clone();
                Ok(())
            }
            Some(existing) => Err(DomainError::Conflict(format!(
                "message [{}] is at version {}, snapshot expects {}",
                message.id,
                existing.version(),
                message.version() - 1
            ))),
            None => Err(not_found(message.user_id, message.id)),
        }
    }

    async fn load(&self, user_id: Uuid, message_id: Uuid) -> Result<Message, DomainError> {
        let messages = self.messages.read().await;
        messages
            .get(&(user_id, message_id))
            .cloned()
            .ok_or_else(|| not_found(user_id, message_id))
    }

    async fn index(
        &self,
        user_id: Uuid,
        owner: &str,
        contact: &str,
        params: &IndexParams,
    ) -> Result<Vec<Message>, DomainError> {
        let messages = self.messages.read().await;
        let query = params.query.as_ref().map(|q| q.to_lowercase());

        let mut found: Vec<Message> = messages
            .values()
            .filter(|m| m.user_id == user_id && m.owner == owner && m.contact == contact)
            .filter(|m| match &query {
                Some(q) => m.content.to_lowercase().contains(q),
                None => true,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.order_timestamp.cmp(&a.order_timestamp));

        Ok(found
            .into_iter()
            .skip(params.skip as usize)
            .take(params.limit as usize)
            .collect())
    }

    async fn get_outstanding(
        &self,
        user_id: Uuid,
        message_id: Uuid,
    ) -> Result<Message, DomainError> {
        let mut messages = self.messages.write().await;
        let entry = messages
            .get_mut(&(user_id, message_id))
            .ok_or_else(|| not_found(user_id, message_id))?;

        // anything past sending is not outstanding
        let claimed = entry
            .mark_sending()
            .map_err(|_| not_found(user_id, message_id))?;
        *entry = claimed.clone();
        Ok(claimed)
    }
}

#[derive(Default)]
pub struct InMemoryHeartbeatRepository {
    heartbeats: Arc<RwLock<Vec<Heartbeat>>>,
}

impl InMemoryHeartbeatRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HeartbeatRepository for InMemoryHeartbeatRepository {
    async fn store(&self, heartbeat: &Heartbeat) -> Result<(), DomainError> {
        let mut heartbeats = self.heartbeats.write().await;
        if heartbeats.iter().any(|h| h.id == heartbeat.id) {
            return Err(DomainError::AlreadyExists(format!(
                "heartbeat [{}]",
                heartbeat.id
            )));
        }
        heartbeats.push(heartbeat.clone());
        Ok(())
    }

    async fn index(
        &self,
        user_id: Uuid,
        owner: &str,
        params: &IndexParams,
    ) -> Result<Vec<Heartbeat>, DomainError> {
        let heartbeats = self.heartbeats.read().await;
        let mut found: Vec<Heartbeat> = heartbeats
            .iter()
            .filter(|h| h.user_id == user_id && h.owner == owner)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(found
            .into_iter()
            .skip(params.skip as usize)
            .take(params.limit as usize)
            .collect())
    }
}
