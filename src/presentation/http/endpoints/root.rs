use std::sync::Arc;

use poem_openapi::Tags;

use crate::application::services::{
    heartbeats::HeartbeatService, jwt::JwtService, messages::MessageService,
};

#[derive(Clone)]
pub struct ApiState {
    pub message_service: Arc<MessageService>,
    pub heartbeat_service: Arc<HeartbeatService>,
    pub jwt: JwtService,
    /// Envelope source for events produced by HTTP requests.
    pub source: String,
}

/// Endpoints that need no state.
pub struct Endpoints;

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Messages,
    Heartbeats,
}
