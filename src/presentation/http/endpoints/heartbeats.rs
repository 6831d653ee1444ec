use std::sync::Arc;

use chrono::Utc;
use poem::Result as PoemResult;
use poem_openapi::{OpenApi, param::Query, payload::Json};

use crate::{
    application::services::heartbeats::StoreHeartbeatParams,
    domain::repositories::IndexParams,
    presentation::http::{
        endpoints::{
            map_error,
            root::{ApiState, EndpointsTags},
        },
        mappers::map_heartbeat,
        requests::StoreHeartbeatRequestDto,
        responses::HeartbeatDto,
        security::JwtAuth,
    },
};

#[derive(Clone)]
pub struct HeartbeatsEndpoints {
    state: Arc<ApiState>,
}

impl HeartbeatsEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl HeartbeatsEndpoints {
    #[oai(path = "/heartbeats", method = "post", tag = EndpointsTags::Heartbeats)]
    pub async fn store_heartbeat(
        &self,
        auth: JwtAuth,
        request: Json<StoreHeartbeatRequestDto>,
    ) -> PoemResult<Json<HeartbeatDto>> {
        let user = auth.into_user(&self.state.jwt)?;
        let request = request.0;

        let heartbeat = self
            .state
            .heartbeat_service
            .store(StoreHeartbeatParams {
                user_id: user.user_id,
                owner: request.owner,
                timestamp: Utc::now(),
                quantity: request.quantity,
                source: self.state.source.clone(),
            })
            .await
            .map_err(map_error)?;

        Ok(Json(map_heartbeat(&heartbeat)))
    }

    #[oai(path = "/heartbeats", method = "get", tag = EndpointsTags::Heartbeats)]
    pub async fn list_heartbeats(
        &self,
        auth: JwtAuth,
        owner: Query<String>,
        skip: Query<Option<u32>>,
        limit: Query<Option<u32>>,
    ) -> PoemResult<Json<Vec<HeartbeatDto>>> {
        let user = auth.into_user(&self.state.jwt)?;
        let params = IndexParams::new(skip.0, limit.0, None);

        let heartbeats = self
            .state
            .heartbeat_service
            .index(user.user_id, &owner.0, &params)
            .await
            .map_err(map_error)?;

        Ok(Json(heartbeats.iter().map(map_heartbeat).collect()))
    }
}
