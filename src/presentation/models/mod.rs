use poem_openapi::Enum;

use crate::{
    application::services::messages::MessageEventName,
    domain::models::{MessageStatus, MessageType},
};

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum MessageStatusKind {
    #[oai(rename = "pending")]
    Pending,
    #[oai(rename = "sending")]
    Sending,
    #[oai(rename = "sent")]
    Sent,
    #[oai(rename = "delivered")]
    Delivered,
    #[oai(rename = "failed")]
    Failed,
    #[oai(rename = "expired")]
    Expired,
    #[oai(rename = "received")]
    Received,
}

impl From<MessageStatus> for MessageStatusKind {
    fn from(value: MessageStatus) -> Self {
        match value {
            MessageStatus::Pending => MessageStatusKind::Pending,
            MessageStatus::Sending => MessageStatusKind::Sending,
            MessageStatus::Sent => MessageStatusKind::Sent,
            MessageStatus::Delivered => MessageStatusKind::Delivered,
            MessageStatus::Failed => MessageStatusKind::Failed,
            MessageStatus::Expired => MessageStatusKind::Expired,
            MessageStatus::Received => MessageStatusKind::Received,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum MessageTypeKind {
    #[oai(rename = "mobile_originated")]
    MobileOriginated,
    #[oai(rename = "mobile_terminated")]
    MobileTerminated,
}

impl From<MessageType> for MessageTypeKind {
    fn from(value: MessageType) -> Self {
        match value {
            MessageType::MobileOriginated => MessageTypeKind::MobileOriginated,
            MessageType::MobileTerminated => MessageTypeKind::MobileTerminated,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum MessageEventKind {
    #[oai(rename = "sent")]
    Sent,
    #[oai(rename = "delivered")]
    Delivered,
    #[oai(rename = "failed")]
    Failed,
}

impl From<MessageEventKind> for MessageEventName {
    fn from(value: MessageEventKind) -> Self {
        match value {
            MessageEventKind::Sent => MessageEventName::Sent,
            MessageEventKind::Delivered => MessageEventName::Delivered,
            MessageEventKind::Failed => MessageEventName::Failed,
        }
    }
}
