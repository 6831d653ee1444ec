use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    application::services::event_bus::{EventDispatcher, publish},
    domain::{
        errors::DomainError,
        events::{
            EventPayload, MessageApiSentPayload, MessagePhonePayload, MessageSendFailedPayload,
        },
        models::{Message, UNKNOWN_ERROR},
        repositories::{IndexParams, MessageRepository},
    },
};

pub struct SendMessageParams {
    pub user_id: Uuid,
    pub owner: String,
    pub contact: String,
    pub content: String,
    pub request_received_at: DateTime<Utc>,
    pub source: String,
}

pub struct ReceiveMessageParams {
    pub user_id: Uuid,
    pub owner: String,
    pub contact: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

pub struct StoreMessageParams {
    pub id: Uuid,
    pub user_id: Uuid,
    pub owner: String,
    pub contact: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

pub struct GetMessagesParams {
    pub user_id: Uuid,
    pub owner: String,
    pub contact: String,
    pub index: IndexParams,
}

pub struct GetOutstandingParams {
    pub user_id: Uuid,
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

/// Delivery reports the phone can send for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageEventName {
    Sent,
    Delivered,
    Failed,
}

pub struct StoreEventParams {
    pub user_id: Uuid,
    pub message_id: Uuid,
    pub event_name: MessageEventName,
    pub timestamp: DateTime<Utc>,
    pub error_message: Option<String>,
    pub source: String,
}

pub struct HandleMessageParams {
    pub user_id: Uuid,
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

pub struct HandleMessageFailedParams {
    pub user_id: Uuid,
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub error_message: Option<String>,
    pub source: String,
}

/// Drives the lifecycle of messages.
///
/// Status-changing operations follow the same steps: load by tenant and id, apply
/// the guarded transition, dispatch the matching notification, then persist the new
/// snapshot. A failure at any step aborts the operation without undoing earlier
/// steps; the trigger is expected to be redelivered.
pub struct MessageService {
    repository: Arc<dyn MessageRepository>,
    dispatcher: Arc<dyn EventDispatcher>,
}

impl MessageService {
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Self {
        Self {
            repository,
            dispatcher,
        }
    }

    /// Accepts a message from the API. It is persisted once `message.api.sent` is consumed.
    #[instrument(skip_all, fields(user_id = %params.user_id))]
    pub async fn send_message(&self, params: SendMessageParams) -> Result<Message, DomainError> {
        let message = Message::outbound(
            Uuid::new_v4(),
            params.user_id,
            params.owner,
            params.contact,
            params.content,
            params.request_received_at,
        );

        let payload = MessageApiSentPayload {
            id: message.id,
            user_id: message.user_id,
            owner: message.owner.clone(),
            contact: message.contact.clone(),
            request_received_at: message.request_received_at,
            content: message.content.clone(),
        };
        publish(
            self.dispatcher.as_ref(),
            &params.source,
            EventPayload::MessageApiSent(payload),
            None,
        )
        .await
        .map_err(|err| err.context(format!("cannot send message with id [{}]", message.id)))?;

        info!(message_id = %message.id, "message accepted for sending");
        Ok(message)
    }

    /// Accepts a message the phone received. It is persisted once
    /// `message.phone.received` is consumed.
    #[instrument(skip_all, fields(user_id = %params.user_id))]
    pub async fn receive_message(
        &self,
        params: ReceiveMessageParams,
    ) -> Result<Message, DomainError> {
        let message = Message::inbound(
            Uuid::new_v4(),
            params.user_id,
            params.owner,
            params.contact,
            params.content,
            params.timestamp,
        );

        publish(
            self.dispatcher.as_ref(),
            &params.source,
            EventPayload::MessagePhoneReceived(phone_payload(&message, params.timestamp)),
            None,
        )
        .await
        .map_err(|err| err.context(format!("cannot receive message with id [{}]", message.id)))?;

        info!(message_id = %message.id, "received message accepted");
        Ok(message)
    }

    #[instrument(skip_all, fields(message_id = %params.id, user_id = %params.user_id))]
    pub async fn store_sent_message(
        &self,
        params: StoreMessageParams,
    ) -> Result<Message, DomainError> {
        let message = Message::outbound(
            params.id,
            params.user_id,
            params.owner,
            params.contact,
            params.content,
            params.timestamp,
        );
        self.store(&message).await?;
        Ok(message)
    }

    #[instrument(skip_all, fields(message_id = %params.id, user_id = %params.user_id))]
    pub async fn store_received_message(
        &self,
        params: StoreMessageParams,
    ) -> Result<Message, DomainError> {
        let message = Message::inbound(
            params.id,
            params.user_id,
            params.owner,
            params.contact,
            params.content,
            params.timestamp,
        );
        self.store(&message).await?;
        Ok(message)
    }

    pub async fn get_message(
        &self,
        user_id: Uuid,
        message_id: Uuid,
    ) -> Result<Message, DomainError> {
        self.load(user_id, message_id).await
    }

    #[instrument(skip_all, fields(user_id = %params.user_id))]
    pub async fn get_messages(&self, params: GetMessagesParams) -> Result<Vec<Message>, DomainError> {
        let messages = self
            .repository
            .index(params.user_id, &params.owner, &params.contact, &params.index)
            .await
            .map_err(|err| {
                err.context(format!(
                    "could not fetch messages between [{}] and [{}]",
                    params.owner, params.contact
                ))
            })?;

        info!(count = messages.len(), "fetched messages");
        Ok(messages)
    }

    /// Claims a message for the phone and tells the phone to fetch it. When the
    /// notification cannot be dispatched the phone is not considered notified and
    /// the caller is expected to poll again.
    #[instrument(skip_all, fields(message_id = %params.message_id, user_id = %params.user_id))]
    pub async fn get_outstanding(
        &self,
        params: GetOutstandingParams,
    ) -> Result<Message, DomainError> {
        let message = self
            .repository
            .get_outstanding(params.user_id, params.message_id)
            .await
            .map_err(|err| {
                err.context(format!(
                    "could not fetch outstanding message with id [{}]",
                    params.message_id
                ))
            })?;

        publish(
            self.dispatcher.as_ref(),
            &params.source,
            EventPayload::MessagePhoneSending(phone_payload(&message, params.timestamp)),
            None,
        )
        .await
        .map_err(|err| {
            err.context(format!(
                "cannot notify phone about message with id [{}]",
                message.id
            ))
        })?;

        Ok(message)
    }

    /// Applies a delivery report from the phone and returns the updated message.
    pub async fn store_event(&self, params: StoreEventParams) -> Result<Message, DomainError> {
        match params.event_name {
            MessageEventName::Sent => {
                self.mark_sent(HandleMessageParams {
                    user_id: params.user_id,
                    message_id: params.message_id,
                    timestamp: params.timestamp,
                    source: params.source,
                })
                .await
            }
            MessageEventName::Delivered => {
                self.mark_delivered(HandleMessageParams {
                    user_id: params.user_id,
                    message_id: params.message_id,
                    timestamp: params.timestamp,
                    source: params.source,
                })
                .await
            }
            MessageEventName::Failed => {
                self.mark_failed(HandleMessageFailedParams {
                    user_id: params.user_id,
                    message_id: params.message_id,
                    timestamp: params.timestamp,
                    error_message: params.error_message,
                    source: params.source,
                })
                .await
            }
        }
    }

    /// Records that the phone is attempting to send. Triggered by
    /// `message.phone.sending`, so nothing is dispatched here.
    #[instrument(skip_all, fields(message_id = %params.message_id, user_id = %params.user_id))]
    pub async fn register_send_attempt(
        &self,
        params: HandleMessageParams,
    ) -> Result<Message, DomainError> {
        let message = self.load(params.user_id, params.message_id).await?;
        let next = message
            .register_send_attempt(params.timestamp)
            .map_err(|err| err.context(rejected(&message)))?;

        self.update(&next).await?;
        info!(status = %next.status(), "registered send attempt");
        Ok(next)
    }

    #[instrument(skip_all, fields(message_id = %params.message_id, user_id = %params.user_id))]
    pub async fn mark_sent(&self, params: HandleMessageParams) -> Result<Message, DomainError> {
        let message = self.load(params.user_id, params.message_id).await?;
        let next = message
            .mark_sent(params.timestamp)
            .map_err(|err| err.context(rejected(&message)))?;

        let payload = EventPayload::MessagePhoneSent(phone_payload(&next, params.timestamp));
        self.commit(&next, &params.source, payload).await?;
        Ok(next)
    }

    #[instrument(skip_all, fields(message_id = %params.message_id, user_id = %params.user_id))]
    pub async fn mark_delivered(
        &self,
        params: HandleMessageParams,
    ) -> Result<Message, DomainError> {
        let message = self.load(params.user_id, params.message_id).await?;
        let next = message
            .mark_delivered(params.timestamp)
            .map_err(|err| err.context(rejected(&message)))?;

        let payload = EventPayload::MessagePhoneDelivered(phone_payload(&next, params.timestamp));
        self.commit(&next, &params.source, payload).await?;
        Ok(next)
    }

    #[instrument(skip_all, fields(message_id = %params.message_id, user_id = %params.user_id))]
    pub async fn mark_failed(
        &self,
        params: HandleMessageFailedParams,
    ) -> Result<Message, DomainError> {
        let message = self.load(params.user_id, params.message_id).await?;
        let next = message
            .mark_failed(params.timestamp, params.error_message.as_deref())
            .map_err(|err| err.context(rejected(&message)))?;

        let payload = EventPayload::MessageSendFailed(MessageSendFailedPayload {
            id: next.id,
            user_id: next.user_id,
            owner: next.owner.clone(),
            contact: next.contact.clone(),
            timestamp: params.timestamp,
            error_message: next
                .error_message
                .clone()
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            content: next.content.clone(),
        });
        self.commit(&next, &params.source, payload).await?;
        Ok(next)
    }

    /// Triggered by `message.send.expired`, so nothing is dispatched here.
    #[instrument(skip_all, fields(message_id = %params.message_id, user_id = %params.user_id))]
    pub async fn mark_expired(&self, params: HandleMessageParams) -> Result<Message, DomainError> {
        let message = self.load(params.user_id, params.message_id).await?;
        let next = message
            .mark_expired(params.timestamp)
            .map_err(|err| err.context(rejected(&message)))?;

        self.update(&next).await?;
        info!(status = %next.status(), "message expired");
        Ok(next)
    }

    async fn commit(
        &self,
        message: &Message,
        source: &str,
        payload: EventPayload,
    ) -> Result<(), DomainError> {
        publish(self.dispatcher.as_ref(), source, payload, None)
            .await
            .map_err(|err| {
                err.context(format!(
                    "cannot announce status [{}] of message with id [{}]",
                    message.status(),
                    message.id
                ))
            })?;

        self.update(message).await?;
        info!(status = %message.status(), "message updated");
        Ok(())
    }

    async fn load(&self, user_id: Uuid, message_id: Uuid) -> Result<Message, DomainError> {
        self.repository
            .load(user_id, message_id)
            .await
            .map_err(|err| err.context(format!("cannot find message with id [{message_id}]")))
    }

    async fn store(&self, message: &Message) -> Result<(), DomainError> {
        self.repository
            .store(message)
            .await
            .map_err(|err| err.context(format!("cannot save message with id [{}]", message.id)))?;

        info!(message_id = %message.id, status = %message.status(), "message saved");
        Ok(())
    }

    async fn update(&self, message: &Message) -> Result<(), DomainError> {
        self.repository.update(message).await.map_err(|err| {
            err.context(format!("cannot update message with id [{}]", message.id))
        })
    }
}

fn phone_payload(message: &Message, timestamp: DateTime<Utc>) -> MessagePhonePayload {
    MessagePhonePayload {
        id: message.id,
        user_id: message.user_id,
        owner: message.owner.clone(),
        contact: message.contact.clone(),
        timestamp,
        content: message.content.clone(),
    }
}

fn rejected(message: &Message) -> String {
    format!("message with id [{}] was left unchanged", message.id)
}
