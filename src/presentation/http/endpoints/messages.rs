use std::sync::Arc;

use chrono::Utc;
use poem::Result as PoemResult;
use poem_openapi::{
    OpenApi,
    param::{Path, Query},
    payload::Json,
};
use uuid::Uuid;

use crate::{
    application::services::messages::{
        GetMessagesParams, GetOutstandingParams, ReceiveMessageParams, SendMessageParams,
        StoreEventParams,
    },
    domain::repositories::IndexParams,
    presentation::http::{
        endpoints::{
            map_error,
            root::{ApiState, EndpointsTags},
        },
        mappers::map_message,
        requests::{ReceiveMessageRequestDto, SendMessageRequestDto, StoreEventRequestDto},
        responses::MessageDto,
        security::JwtAuth,
    },
};

#[derive(Clone)]
pub struct MessagesEndpoints {
    state: Arc<ApiState>,
}

impl MessagesEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl MessagesEndpoints {
    #[oai(path = "/messages/send", method = "post", tag = EndpointsTags::Messages)]
    pub async fn send_message(
        &self,
        auth: JwtAuth,
        request: Json<SendMessageRequestDto>,
    ) -> PoemResult<Json<MessageDto>> {
        let request_received_at = Utc::now();
        let user = auth.into_user(&self.state.jwt)?;
        let request = request.0;

        let message = self
            .state
            .message_service
            .send_message(SendMessageParams {
                user_id: user.user_id,
                owner: request.from,
                contact: request.to,
                content: request.content,
                request_received_at,
                source: self.state.source.clone(),
            })
            .await
            .map_err(map_error)?;

        Ok(Json(map_message(&message)))
    }

    #[oai(path = "/messages/receive", method = "post", tag = EndpointsTags::Messages)]
    pub async fn receive_message(
        &self,
        auth: JwtAuth,
        request: Json<ReceiveMessageRequestDto>,
    ) -> PoemResult<Json<MessageDto>> {
        let user = auth.into_user(&self.state.jwt)?;
        let request = request.0;

        let message = self
            .state
            .message_service
            .receive_message(ReceiveMessageParams {
                user_id: user.user_id,
                owner: request.to,
                contact: request.from,
                content: request.content,
                timestamp: request.timestamp,
                source: self.state.source.clone(),
            })
            .await
            .map_err(map_error)?;

        Ok(Json(map_message(&message)))
    }

    #[oai(path = "/messages", method = "get", tag = EndpointsTags::Messages)]
    pub async fn list_messages(
        &self,
        auth: JwtAuth,
        owner: Query<String>,
        contact: Query<String>,
        skip: Query<Option<u32>>,
        limit: Query<Option<u32>>,
        query: Query<Option<String>>,
    ) -> PoemResult<Json<Vec<MessageDto>>> {
        let user = auth.into_user(&self.state.jwt)?;

        let messages = self
            .state
            .message_service
            .get_messages(GetMessagesParams {
                user_id: user.user_id,
                owner: owner.0,
                contact: contact.0,
                index: IndexParams::new(skip.0, limit.0, query.0),
            })
            .await
            .map_err(map_error)?;

        Ok(Json(messages.iter().map(map_message).collect()))
    }

    /// Polled by the phone to claim a message it was told about.
    #[oai(path = "/messages/outstanding", method = "get", tag = EndpointsTags::Messages)]
    pub async fn get_outstanding(
        &self,
        auth: JwtAuth,
        message_id: Query<Uuid>,
    ) -> PoemResult<Json<MessageDto>> {
        let user = auth.into_user(&self.state.jwt)?;

        let message = self
            .state
            .message_service
            .get_outstanding(GetOutstandingParams {
                user_id: user.user_id,
                message_id: message_id.0,
                timestamp: Utc::now(),
                source: self.state.source.clone(),
            })
            .await
            .map_err(map_error)?;

        Ok(Json(map_message(&message)))
    }

    #[oai(path = "/messages/:message_id", method = "get", tag = EndpointsTags::Messages)]
    pub async fn get_message(
        &self,
        auth: JwtAuth,
        message_id: Path<Uuid>,
    ) -> PoemResult<Json<MessageDto>> {
        let user = auth.into_user(&self.state.jwt)?;

        let message = self
            .state
            .message_service
            .get_message(user.user_id, message_id.0)
            .await
            .map_err(map_error)?;

        Ok(Json(map_message(&message)))
    }

    /// Delivery report from the phone.
    #[oai(
        path = "/messages/:message_id/events",
        method = "post",
        tag = EndpointsTags::Messages,
    )]
    pub async fn store_event(
        &self,
        auth: JwtAuth,
        message_id: Path<Uuid>,
        request: Json<StoreEventRequestDto>,
    ) -> PoemResult<Json<MessageDto>> {
        let user = auth.into_user(&self.state.jwt)?;
        let request = request.0;

        let message = self
            .state
            .message_service
            .store_event(StoreEventParams {
                user_id: user.user_id,
                message_id: message_id.0,
                event_name: request.event_name.into(),
                timestamp: request.timestamp,
                error_message: request.reason,
                source: self.state.source.clone(),
            })
            .await
            .map_err(map_error)?;

        Ok(Json(map_message(&message)))
    }
}
