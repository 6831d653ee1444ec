//! Self-describing notification envelopes.
//!
//! Every notification travels as an [`Event`] whose `type` tag selects the schema of
//! `data`. [`EventPayload`] is the closed set of typed payloads; converting between
//! the two is an exhaustive match in both directions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::errors::DomainError;

pub mod heartbeat;
pub mod message;

pub use heartbeat::HeartbeatPhoneOutstandingPayload;
pub use message::{
    MessageApiSentPayload, MessagePhonePayload, MessageSendExpiredCheckPayload,
    MessageSendExpiredPayload, MessageSendFailedPayload,
};

pub const SPEC_VERSION: &str = "1.0";
pub const DATA_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventType {
    #[serde(rename = "message.api.sent")]
    MessageApiSent,
    #[serde(rename = "message.phone.sending")]
    MessagePhoneSending,
    #[serde(rename = "message.phone.sent")]
    MessagePhoneSent,
    #[serde(rename = "message.phone.delivered")]
    MessagePhoneDelivered,
    #[serde(rename = "message.phone.received")]
    MessagePhoneReceived,
    #[serde(rename = "message.send.failed")]
    MessageSendFailed,
    #[serde(rename = "message.send.expired")]
    MessageSendExpired,
    #[serde(rename = "message.send.expired.check")]
    MessageSendExpiredCheck,
    #[serde(rename = "heartbeat.phone.outstanding")]
    HeartbeatPhoneOutstanding,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::MessageApiSent => "message.api.sent",
            EventType::MessagePhoneSending => "message.phone.sending",
            EventType::MessagePhoneSent => "message.phone.sent",
            EventType::MessagePhoneDelivered => "message.phone.delivered",
            EventType::MessagePhoneReceived => "message.phone.received",
            EventType::MessageSendFailed => "message.send.failed",
            EventType::MessageSendExpired => "message.send.expired",
            EventType::MessageSendExpiredCheck => "message.send.expired.check",
            EventType::HeartbeatPhoneOutstanding => "heartbeat.phone.outstanding",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    MessageApiSent(MessageApiSentPayload),
    MessagePhoneSending(MessagePhonePayload),
    MessagePhoneSent(MessagePhonePayload),
    MessagePhoneDelivered(MessagePhonePayload),
    MessagePhoneReceived(MessagePhonePayload),
    MessageSendFailed(MessageSendFailedPayload),
    MessageSendExpired(MessageSendExpiredPayload),
    MessageSendExpiredCheck(MessageSendExpiredCheckPayload),
    HeartbeatPhoneOutstanding(HeartbeatPhoneOutstandingPayload),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::MessageApiSent(_) => EventType::MessageApiSent,
            EventPayload::MessagePhoneSending(_) => EventType::MessagePhoneSending,
            EventPayload::MessagePhoneSent(_) => EventType::MessagePhoneSent,
            EventPayload::MessagePhoneDelivered(_) => EventType::MessagePhoneDelivered,
            EventPayload::MessagePhoneReceived(_) => EventType::MessagePhoneReceived,
            EventPayload::MessageSendFailed(_) => EventType::MessageSendFailed,
            EventPayload::MessageSendExpired(_) => EventType::MessageSendExpired,
            EventPayload::MessageSendExpiredCheck(_) => EventType::MessageSendExpiredCheck,
            EventPayload::HeartbeatPhoneOutstanding(_) => EventType::HeartbeatPhoneOutstanding,
        }
    }

    fn to_data(&self) -> Result<Value, DomainError> {
        let event_type = self.event_type();
        match self {
            EventPayload::MessageApiSent(payload) => encode_data(event_type, payload),
            EventPayload::MessagePhoneSending(payload)
            | EventPayload::MessagePhoneSent(payload)
            | EventPayload::MessagePhoneDelivered(payload)
            | EventPayload::MessagePhoneReceived(payload) => encode_data(event_type, payload),
            EventPayload::MessageSendFailed(payload) => encode_data(event_type, payload),
            EventPayload::MessageSendExpired(payload) => encode_data(event_type, payload),
            EventPayload::MessageSendExpiredCheck(payload) => encode_data(event_type, payload),
            EventPayload::HeartbeatPhoneOutstanding(payload) => encode_data(event_type, payload),
        }
    }

    fn from_data(event_type: EventType, data: &Value) -> Result<Self, DomainError> {
        Ok(match event_type {
            EventType::MessageApiSent => {
                EventPayload::MessageApiSent(decode_data(event_type, data)?)
            }
            EventType::MessagePhoneSending => {
                EventPayload::MessagePhoneSending(decode_data(event_type, data)?)
            }
            EventType::MessagePhoneSent => {
                EventPayload::MessagePhoneSent(decode_data(event_type, data)?)
            }
            EventType::MessagePhoneDelivered => {
                EventPayload::MessagePhoneDelivered(decode_data(event_type, data)?)
            }
            EventType::MessagePhoneReceived => {
                EventPayload::MessagePhoneReceived(decode_data(event_type, data)?)
            }
            EventType::MessageSendFailed => {
                EventPayload::MessageSendFailed(decode_data(event_type, data)?)
            }
            EventType::MessageSendExpired => {
                EventPayload::MessageSendExpired(decode_data(event_type, data)?)
            }
            EventType::MessageSendExpiredCheck => {
                EventPayload::MessageSendExpiredCheck(decode_data(event_type, data)?)
            }
            EventType::HeartbeatPhoneOutstanding => {
                EventPayload::HeartbeatPhoneOutstanding(decode_data(event_type, data)?)
            }
        })
    }
}

/// Envelope in CloudEvents JSON layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub specversion: String,
    pub id: Uuid,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub source: String,
    pub time: DateTime<Utc>,
    pub datacontenttype: String,
    pub data: Value,
}

impl Event {
    /// Builds a fresh envelope around `payload`. An unencodable payload is an error,
    /// never an empty event.
    pub fn new(source: &str, payload: EventPayload) -> Result<Self, DomainError> {
        let event_type = payload.event_type();
        let data = payload.to_data()?;

        Ok(Self {
            specversion: SPEC_VERSION.to_string(),
            id: Uuid::new_v4(),
            event_type,
            source: source.to_string(),
            time: Utc::now(),
            datacontenttype: DATA_CONTENT_TYPE.to_string(),
            data,
        })
    }

    /// Decodes `data` according to the envelope's type tag.
    pub fn payload(&self) -> Result<EventPayload, DomainError> {
        EventPayload::from_data(self.event_type, &self.data)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, DomainError> {
        serde_json::to_vec(self).map_err(|error| DomainError::Serialization {
            event_type: self.event_type,
            error,
        })
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, DomainError> {
        serde_json::from_slice(bytes)
            .map_err(|err| DomainError::Validation(format!("cannot decode event envelope: {err}")))
    }
}

fn encode_data<T: Serialize>(event_type: EventType, payload: &T) -> Result<Value, DomainError> {
    serde_json::to_value(payload).map_err(|error| DomainError::Serialization { event_type, error })
}

fn decode_data<T: DeserializeOwned>(event_type: EventType, data: &Value) -> Result<T, DomainError> {
    T::deserialize(data).map_err(|err| {
        DomainError::Validation(format!("cannot decode [{event_type}] payload: {err}"))
    })
}
