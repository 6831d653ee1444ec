#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use sms_gateway::{
    application::services::{
        event_bus::EventDispatcher,
        expiration::ExpirationScheduler,
        messages::{HandleMessageFailedParams, HandleMessageParams, MessageService, StoreMessageParams},
    },
    domain::{
        events::{Event, EventType},
        models::{Message, MessageStatus},
        repositories::MessageRepository,
    },
    infrastructure::repositories::in_memory::InMemoryMessageRepository,
};

pub const SOURCE: &str = "sms-gateway/tests";
pub const OWNER: &str = "+18005550199";
pub const CONTACT: &str = "+18005550100";

#[derive(Debug, Clone)]
pub struct Dispatched {
    pub event: Event,
    pub delay: Option<Duration>,
}

/// Dispatcher that keeps every accepted event and can be told to reject.
#[derive(Default)]
pub struct RecordingDispatcher {
    dispatched: Mutex<Vec<Dispatched>>,
    failing: AtomicBool,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn dispatched(&self) -> Vec<Dispatched> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn of_type(&self, event_type: EventType) -> Vec<Dispatched> {
        self.dispatched()
            .into_iter()
            .filter(|d| d.event.event_type == event_type)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.dispatched.lock().unwrap().len()
    }

    pub fn clear(&self) {
        self.dispatched.lock().unwrap().clear();
    }

    fn record(&self, event: Event, delay: Option<Duration>) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("broker unavailable");
        }
        self.dispatched.lock().unwrap().push(Dispatched { event, delay });
        Ok(())
    }
}

#[async_trait]
impl EventDispatcher for RecordingDispatcher {
    async fn dispatch(&self, event: Event) -> anyhow::Result<()> {
        self.record(event, None)
    }

    async fn dispatch_with_timeout(&self, event: Event, delay: Duration) -> anyhow::Result<()> {
        self.record(event, Some(delay))
    }
}

pub struct Harness {
    pub user_id: Uuid,
    pub repository: Arc<InMemoryMessageRepository>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub messages: Arc<MessageService>,
    pub expirations: Arc<ExpirationScheduler>,
}

impl Harness {
    pub fn new() -> Self {
        let repository = Arc::new(InMemoryMessageRepository::new());
        let dispatcher = RecordingDispatcher::new();
        let messages = Arc::new(MessageService::new(repository.clone(), dispatcher.clone()));
        let expirations = Arc::new(ExpirationScheduler::new(
            repository.clone(),
            dispatcher.clone(),
        ));

        Self {
            user_id: Uuid::new_v4(),
            repository,
            dispatcher,
            messages,
            expirations,
        }
    }

    pub fn handle(&self, message: &Message) -> HandleMessageParams {
        HandleMessageParams {
            user_id: message.user_id,
            message_id: message.id,
            timestamp: Utc::now(),
            source: SOURCE.to_string(),
        }
    }

    pub fn handle_failed(&self, message: &Message, reason: Option<&str>) -> HandleMessageFailedParams {
        HandleMessageFailedParams {
            user_id: message.user_id,
            message_id: message.id,
            timestamp: Utc::now(),
            error_message: reason.map(str::to_string),
            source: SOURCE.to_string(),
        }
    }

    pub async fn load(&self, message: &Message) -> Message {
        self.repository
            .load(message.user_id, message.id)
            .await
            .expect("message should be stored")
    }

    pub async fn pending_message(&self) -> Message {
        self.messages
            .store_sent_message(StoreMessageParams {
                id: Uuid::new_v4(),
                user_id: self.user_id,
                owner: OWNER.to_string(),
                contact: CONTACT.to_string(),
                content: "This is a sample text message".to_string(),
                timestamp: Utc::now(),
            })
            .await
            .expect("message should be stored")
    }

    /// Drives a fresh message to `status` through the public operations and forgets
    /// the events emitted on the way.
    pub async fn message_with_status(&self, status: MessageStatus) -> Message {
        let message = match status {
            MessageStatus::Received => self
                .messages
                .store_received_message(StoreMessageParams {
                    id: Uuid::new_v4(),
                    user_id: self.user_id,
                    owner: OWNER.to_string(),
                    contact: CONTACT.to_string(),
                    content: "Inbound text".to_string(),
                    timestamp: Utc::now(),
                })
                .await
                .expect("message should be stored"),
            MessageStatus::Pending => self.pending_message().await,
            MessageStatus::Sending => self.sending_message().await,
            MessageStatus::Sent => {
                let message = self.sending_message().await;
                self.messages.mark_sent(self.handle(&message)).await.unwrap()
            }
            MessageStatus::Delivered => {
                let message = self.sending_message().await;
                self.messages.mark_delivered(self.handle(&message)).await.unwrap()
            }
            MessageStatus::Failed => {
                let message = self.pending_message().await;
                self.messages
                    .mark_failed(self.handle_failed(&message, Some("radio off")))
                    .await
                    .unwrap()
            }
            MessageStatus::Expired => {
                let message = self.pending_message().await;
                self.messages.mark_expired(self.handle(&message)).await.unwrap()
            }
        };
        assert_eq!(message.status(), status);
        self.dispatcher.clear();
        message
    }

    async fn sending_message(&self) -> Message {
        let message = self.pending_message().await;
        self.repository
            .get_outstanding(message.user_id, message.id)
            .await
            .expect("pending message should be outstanding")
    }
}

pub const ALL_STATUSES: [MessageStatus; 7] = [
    MessageStatus::Pending,
    MessageStatus::Sending,
    MessageStatus::Sent,
    MessageStatus::Delivered,
    MessageStatus::Failed,
    MessageStatus::Expired,
    MessageStatus::Received,
];
