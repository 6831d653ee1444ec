use std::{sync::Arc, time::Duration};

use tracing::debug;

use crate::{
    application::services::{
        expiration::{CheckExpiredParams, ExpirationScheduler, ScheduleExpirationParams},
        messages::{HandleMessageParams, MessageService, StoreMessageParams},
    },
    domain::{
        errors::DomainError,
        events::{Event, EventPayload},
    },
};

#[derive(Clone)]
pub struct MessageListenerConfig {
    /// Envelope source for events emitted while handling.
    pub source: String,
    /// Window after a send attempt before the message counts as expired.
    pub expiration: Duration,
}

/// Routes envelopes consumed from the broker to the lifecycle operations.
pub struct MessageListener {
    messages: Arc<MessageService>,
    expirations: Arc<ExpirationScheduler>,
    config: MessageListenerConfig,
}

impl MessageListener {
    pub fn new(
        messages: Arc<MessageService>,
        expirations: Arc<ExpirationScheduler>,
        config: MessageListenerConfig,
    ) -> Self {
        Self {
            messages,
            expirations,
            config,
        }
    }

    pub async fn handle(&self, event: &Event) -> Result<(), DomainError> {
        let payload = event.payload().map_err(|err| {
            err.context(format!(
                "cannot handle event [{}] with id [{}]",
                event.event_type, event.id
            ))
        })?;

        match payload {
            EventPayload::MessageApiSent(payload) => {
                self.messages
                    .store_sent_message(StoreMessageParams {
                        id: payload.id,
                        user_id: payload.user_id,
                        owner: payload.owner,
                        contact: payload.contact,
                        content: payload.content,
                        timestamp: payload.request_received_at,
                    })
                    .await?;
            }
            EventPayload::MessagePhoneReceived(payload) => {
                self.messages
                    .store_received_message(StoreMessageParams {
                        id: payload.id,
                        user_id: payload.user_id,
                        owner: payload.owner,
                        contact: payload.contact,
                        content: payload.content,
                        timestamp: payload.timestamp,
                    })
                    .await?;
            }
            EventPayload::MessagePhoneSending(payload) => {
                self.messages
                    .register_send_attempt(HandleMessageParams {
                        user_id: payload.user_id,
                        message_id: payload.id,
                        timestamp: payload.timestamp,
                        source: self.config.source.clone(),
                    })
                    .await?;
                self.expirations
                    .schedule_expiration_check(ScheduleExpirationParams {
                        message_id: payload.id,
                        user_id: payload.user_id,
                        notification_sent_at: payload.timestamp,
                        expiration: self.config.expiration,
                        source: self.config.source.clone(),
                    })
                    .await?;
            }
            EventPayload::MessageSendExpiredCheck(payload) => {
                self.expirations
                    .check_expired(CheckExpiredParams {
                        message_id: payload.message_id,
                        user_id: payload.user_id,
                        source: self.config.source.clone(),
                    })
                    .await?;
            }
            EventPayload::MessageSendExpired(payload) => {
                self.messages
                    .mark_expired(HandleMessageParams {
                        user_id: payload.user_id,
                        message_id: payload.message_id,
                        timestamp: payload.timestamp,
                        source: self.config.source.clone(),
                    })
                    .await?;
            }
            EventPayload::MessagePhoneSent(_)
            | EventPayload::MessagePhoneDelivered(_)
            | EventPayload::MessageSendFailed(_)
            | EventPayload::HeartbeatPhoneOutstanding(_) => {
                debug!(event_type = %event.event_type, event_id = %event.id, "no listener for event");
            }
        }

        Ok(())
    }
}
