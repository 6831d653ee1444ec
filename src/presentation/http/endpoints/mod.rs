use poem::http::StatusCode;
use tracing::error;

use crate::domain::errors::DomainError;

pub mod health;
pub mod heartbeats;
pub mod messages;
pub mod root;

pub(crate) fn map_error(err: DomainError) -> poem::Error {
    let status = match err.root() {
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InvalidTransition { .. } | DomainError::Validation(_) => {
            StatusCode::BAD_REQUEST
        }
        DomainError::AlreadyExists(_) | DomainError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %err, "request failed");
    }
    poem::Error::from_string(err.to_string(), status)
}
