use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use crate::domain::{
    errors::DomainError,
    events::{Event, EventPayload},
};

/// Publishes envelopes to the broker.
///
/// Both calls return once the broker has accepted or rejected the event. Acceptance
/// says nothing about consumers having processed it.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    async fn dispatch(&self, event: Event) -> anyhow::Result<()>;

    /// Durably enqueues `event` for delivery no earlier than `delay` from now.
    async fn dispatch_with_timeout(&self, event: Event, delay: Duration) -> anyhow::Result<()>;
}

/// Wraps `payload` in a new envelope and hands it to the dispatcher, delayed when
/// `delay` is set.
pub(crate) async fn publish(
    dispatcher: &dyn EventDispatcher,
    source: &str,
    payload: EventPayload,
    delay: Option<Duration>,
) -> Result<(), DomainError> {
    let event_type = payload.event_type();
    let event = Event::new(source, payload)
        .map_err(|err| err.context(format!("cannot create event [{event_type}]")))?;
    let event_id = event.id;

    let result = match delay {
        Some(delay) => dispatcher.dispatch_with_timeout(event, delay).await,
        None => dispatcher.dispatch(event).await,
    };
    result.map_err(|err| {
        DomainError::Dispatch(err)
            .context(format!("cannot dispatch event [{event_type}] with id [{event_id}]"))
    })?;

    info!(%event_type, %event_id, "dispatched event");
    Ok(())
}
