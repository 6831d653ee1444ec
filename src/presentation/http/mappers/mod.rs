use crate::{
    domain::models::{Heartbeat, Message},
    presentation::http::responses::{HeartbeatDto, MessageDto},
};

pub fn map_message(message: &Message) -> MessageDto {
    MessageDto {
        id: message.id,
        owner: message.owner.clone(),
        contact: message.contact.clone(),
        content: message.content.clone(),
        message_type: message.message_type.into(),
        status: message.status().into(),
        request_received_at: message.request_received_at.to_rfc3339(),
        created_at: message.created_at.to_rfc3339(),
        updated_at: message.updated_at.to_rfc3339(),
        order_timestamp: message.order_timestamp.to_rfc3339(),
        last_attempted_at: message.last_attempted_at.map(|t| t.to_rfc3339()),
        sent_at: message.sent_at.map(|t| t.to_rfc3339()),
        received_at: message.received_at.map(|t| t.to_rfc3339()),
        send_duration_ms: message.send_duration.map(|d| d.num_milliseconds()),
        error_message: message.error_message.clone(),
    }
}

pub fn map_heartbeat(heartbeat: &Heartbeat) -> HeartbeatDto {
    HeartbeatDto {
        id: heartbeat.id,
        owner: heartbeat.owner.clone(),
        timestamp: heartbeat.timestamp.to_rfc3339(),
        quantity: heartbeat.quantity,
    }
}
