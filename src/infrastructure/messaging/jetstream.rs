use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_nats::{
    HeaderMap,
    jetstream::{
        self, AckKind,
        consumer::{AckPolicy, PullConsumer, pull},
    },
};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

use crate::{
    application::{
        handlers::message_listener::MessageListener, services::event_bus::EventDispatcher,
    },
    domain::{errors::DomainError, events::Event},
};

/// Lets the stream deduplicate republished envelopes.
const MSG_ID_HEADER: &str = "Nats-Msg-Id";
/// Earliest instant a delayed envelope may be handled, RFC3339.
const DELIVER_AT_HEADER: &str = "Sms-Deliver-At";

#[derive(Clone)]
pub struct JetstreamConfig {
    pub url: String,
    pub stream: String,
    pub subject: String,
    pub durable: String,
    pub pull_batch: usize,
    pub ack_wait_seconds: u64,
    pub max_deliver: i64,
}

pub struct JetstreamDispatcher {
    context: jetstream::Context,
    subject: String,
}

impl JetstreamDispatcher {
    pub async fn new(
        config: &JetstreamConfig,
    ) -> anyhow::Result<(Arc<Self>, JetstreamWorker)> {
        let client = async_nats::connect(&config.url)
            .await
            .with_context(|| format!("cannot connect to NATS at [{}]", config.url))?;
        let context = jetstream::new(client);

        let stream = context
            .get_or_create_stream(jetstream::stream::Config {
                name: config.stream.clone(),
                subjects: vec![config.subject.clone()],
                ..Default::default()
            })
            .await?;

        let consumer = stream
            .get_or_create_consumer(
                &config.durable,
                pull::Config {
                    durable_name: Some(config.durable.clone()),
                    ack_policy: AckPolicy::Explicit,
                    ack_wait: Duration::from_secs(config.ack_wait_seconds),
                    max_deliver: config.max_deliver,
                    ..Default::default()
                },
            )
            .await?;

        let dispatcher = Arc::new(Self {
            context,
            subject: config.subject.clone(),
        });

        let worker = JetstreamWorker {
            consumer,
            pull_batch: config.pull_batch,
        };

        Ok((dispatcher, worker))
    }

    async fn publish(&self, event: &Event, deliver_at: Option<DateTime<Utc>>) -> anyhow::Result<()> {
        let payload = event.to_json()?;
        let event_id = event.id.to_string();

        let mut headers = HeaderMap::new();
        headers.insert(MSG_ID_HEADER, event_id.as_str());
        if let Some(deliver_at) = deliver_at {
            headers.insert(DELIVER_AT_HEADER, deliver_at.to_rfc3339().as_str());
        }

        // the second await waits for the stream to persist the envelope
        self.context
            .publish_with_headers(self.subject.clone(), headers, payload.into())
            .await
            .with_context(|| format!("cannot publish event [{}]", event.id))?
            .await
            .with_context(|| format!("stream did not acknowledge event [{}]", event.id))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventDispatcher for JetstreamDispatcher {
    async fn dispatch(&self, event: Event) -> anyhow::Result<()> {
        self.publish(&event, None).await
    }

    async fn dispatch_with_timeout(&self, event: Event, delay: Duration) -> anyhow::Result<()> {
        let deliver_at = TimeDelta::from_std(delay)
            .ok()
            .and_then(|delay| Utc::now().checked_add_signed(delay))
            .with_context(|| format!("delay {delay:?} is out of range"))?;
        self.publish(&event, Some(deliver_at)).await
    }
}

pub struct JetstreamWorker {
    consumer: PullConsumer,
    pull_batch: usize,
}

impl JetstreamWorker {
    pub fn spawn(self, listener: Arc<MessageListener>) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(err) = self.run(listener).await {
                error!(error = ?err, "jetstream worker stopped");
            }
        })
    }

    async fn run(self, listener: Arc<MessageListener>) -> anyhow::Result<()> {
        info!(batch = self.pull_batch, "jetstream worker started");
        loop {
            let mut batch = self
                .consumer
                .batch()
                .max_messages(self.pull_batch)
                .messages()
                .await?;
            while let Some(message) = batch.next().await {
                match message {
                    Ok(msg) => {
                        if let Err(err) = Self::process_message(msg, &listener).await {
                            error!(error = ?err, "failed to process message");
                        }
                    }
                    Err(err) => {
                        warn!(error = ?err, "jetstream batch error");
                    }
                }
            }
        }
    }

    async fn process_message(
        message: jetstream::Message,
        listener: &MessageListener,
    ) -> anyhow::Result<()> {
        let deliver_at = message
            .headers
            .as_ref()
            .and_then(|headers| headers.get(DELIVER_AT_HEADER))
            .and_then(|value| DateTime::parse_from_rfc3339(value.as_str()).ok())
            .map(|at| at.with_timezone(&Utc));

        if let Some(remaining) = remaining_delay(deliver_at, Utc::now()) {
            return message
                .ack_with(AckKind::Nak(Some(remaining)))
                .await
                .map_err(|e| anyhow::anyhow!("failed to delay message: {}", e));
        }

        let (result, event_type, event_id) = match Event::from_json(&message.payload) {
            Ok(event) => (
                listener.handle(&event).await,
                event.event_type.to_string(),
                event.id.to_string(),
            ),
            Err(err) => (Err(err), "undecodable".to_string(), "unknown".to_string()),
        };

        let outcome = disposition(&result);
        if let Err(err) = &result {
            match outcome {
                Disposition::Retry => {
                    error!(%event_type, %event_id, error = %err, "event handling failed, requesting redelivery")
                }
                _ => warn!(%event_type, %event_id, error = %err, "event rejected"),
            }
        }

        message
            .ack_with(outcome.ack_kind())
            .await
            .map_err(|e| anyhow::anyhow!("failed to acknowledge message: {}", e))
    }
}

/// What the worker tells the stream after handling a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Handled.
    Ack,
    /// Redelivery can never succeed, so the delivery is acknowledged and dropped.
    Reject,
    /// Left for redelivery.
    Retry,
}

impl Disposition {
    fn ack_kind(self) -> AckKind {
        match self {
            Disposition::Ack | Disposition::Reject => AckKind::Ack,
            Disposition::Retry => AckKind::Nak(None),
        }
    }
}

fn disposition(result: &Result<(), DomainError>) -> Disposition {
    match result {
        Ok(()) => Disposition::Ack,
        Err(err) if err.is_permanent() => Disposition::Reject,
        Err(_) => Disposition::Retry,
    }
}

/// Time left before a delayed envelope may be handled, if any.
fn remaining_delay(deliver_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Duration> {
    let remaining = deliver_at? - now;
    remaining.to_std().ok().filter(|d| !d.is_zero())
}
