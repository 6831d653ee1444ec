use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    application::services::event_bus::{EventDispatcher, publish},
    domain::{
        errors::DomainError,
        events::{EventPayload, HeartbeatPhoneOutstandingPayload},
        models::Heartbeat,
        repositories::{HeartbeatRepository, IndexParams},
    },
};

pub struct StoreHeartbeatParams {
    pub user_id: Uuid,
    pub owner: String,
    pub timestamp: DateTime<Utc>,
    pub quantity: u32,
    pub source: String,
}

pub struct HeartbeatService {
    repository: Arc<dyn HeartbeatRepository>,
    dispatcher: Arc<dyn EventDispatcher>,
}

impl HeartbeatService {
    pub fn new(
        repository: Arc<dyn HeartbeatRepository>,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Self {
        Self {
            repository,
            dispatcher,
        }
    }

    pub async fn index(
        &self,
        user_id: Uuid,
        owner: &str,
        params: &IndexParams,
    ) -> Result<Vec<Heartbeat>, DomainError> {
        self.repository
            .index(user_id, owner, params)
            .await
            .map_err(|err| err.context(format!("could not fetch heartbeats of [{owner}]")))
    }

    /// Appends a heartbeat. A phone that reports queued messages also triggers
    /// `heartbeat.phone.outstanding`.
    #[instrument(skip_all, fields(user_id = %params.user_id, owner = %params.owner))]
    pub async fn store(&self, params: StoreHeartbeatParams) -> Result<Heartbeat, DomainError> {
        let heartbeat = Heartbeat {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            owner: params.owner,
            timestamp: params.timestamp,
            quantity: params.quantity,
        };

        self.repository.store(&heartbeat).await.map_err(|err| {
            err.context(format!("cannot save heartbeat with id [{}]", heartbeat.id))
        })?;
        info!(heartbeat_id = %heartbeat.id, "heartbeat saved");

        if heartbeat.quantity > 0 {
            let payload = HeartbeatPhoneOutstandingPayload {
                heartbeat_id: heartbeat.id,
                user_id: heartbeat.user_id,
                owner: heartbeat.owner.clone(),
                timestamp: heartbeat.timestamp,
                quantity: heartbeat.quantity,
            };
            publish(
                self.dispatcher.as_ref(),
                &params.source,
                EventPayload::HeartbeatPhoneOutstanding(payload),
                None,
            )
            .await
            .map_err(|err| {
                err.context(format!(
                    "cannot announce outstanding messages for heartbeat [{}]",
                    heartbeat.id
                ))
            })?;
        }

        Ok(heartbeat)
    }
}
