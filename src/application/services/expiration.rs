use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    application::services::event_bus::{EventDispatcher, publish},
    domain::{
        errors::DomainError,
        events::{EventPayload, MessageSendExpiredCheckPayload, MessageSendExpiredPayload},
        repositories::MessageRepository,
    },
};

pub struct ScheduleExpirationParams {
    pub message_id: Uuid,
    pub user_id: Uuid,
    /// When the triggering notification was recorded. The window starts here.
    pub notification_sent_at: DateTime<Utc>,
    /// Zero disables expiration for the message.
    pub expiration: Duration,
    pub source: String,
}

pub struct CheckExpiredParams {
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub source: String,
}

/// Detects messages the phone never resolved, using delayed dispatch as the only timer.
pub struct ExpirationScheduler {
    repository: Arc<dyn MessageRepository>,
    dispatcher: Arc<dyn EventDispatcher>,
}

impl ExpirationScheduler {
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Self {
        Self {
            repository,
            dispatcher,
        }
    }

    /// Enqueues a `message.send.expired.check` that becomes visible once the window
    /// has passed. Each send attempt schedules its own check.
    #[instrument(skip_all, fields(message_id = %params.message_id, user_id = %params.user_id))]
    pub async fn schedule_expiration_check(
        &self,
        params: ScheduleExpirationParams,
    ) -> Result<(), DomainError> {
        if params.expiration.is_zero() {
            info!("message expiration is disabled");
            return Ok(());
        }

        let scheduled_at = TimeDelta::from_std(params.expiration)
            .ok()
            .and_then(|window| params.notification_sent_at.checked_add_signed(window))
            .ok_or_else(|| {
                DomainError::Validation(format!(
                    "expiration of {:?} is out of range",
                    params.expiration
                ))
            })?;

        let payload = MessageSendExpiredCheckPayload {
            message_id: params.message_id,
            user_id: params.user_id,
            scheduled_at,
        };
        publish(
            self.dispatcher.as_ref(),
            &params.source,
            EventPayload::MessageSendExpiredCheck(payload),
            Some(params.expiration),
        )
        .await
        .map_err(|err| {
            err.context(format!(
                "cannot schedule expiration check for message with id [{}]",
                params.message_id
            ))
        })?;

        info!(%scheduled_at, "scheduled expiration check");
        Ok(())
    }

    /// Announces `message.send.expired` when the message is still unresolved. Once
    /// the message has moved on this is a no-op, so a redelivered check never
    /// produces a second notification.
    #[instrument(skip_all, fields(message_id = %params.message_id, user_id = %params.user_id))]
    pub async fn check_expired(&self, params: CheckExpiredParams) -> Result<(), DomainError> {
        let message = self
            .repository
            .load(params.user_id, params.message_id)
            .await
            .map_err(|err| {
                err.context(format!(
                    "cannot load message with id [{}] to check expiration",
                    params.message_id
                ))
            })?;

        if !message.status().is_unresolved() {
            info!(status = %message.status(), "message is not expired");
            return Ok(());
        }

        let payload = MessageSendExpiredPayload {
            message_id: message.id,
            user_id: message.user_id,
            owner: message.owner.clone(),
            contact: message.contact.clone(),
            timestamp: Utc::now(),
            content: message.content.clone(),
        };
        publish(
            self.dispatcher.as_ref(),
            &params.source,
            EventPayload::MessageSendExpired(payload),
            None,
        )
        .await
        .map_err(|err| {
            err.context(format!(
                "cannot announce expiry of message with id [{}]",
                message.id
            ))
        })?;

        info!(status = %message.status(), "message has expired");
        Ok(())
    }
}
