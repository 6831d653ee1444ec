use thiserror::Error;

use crate::domain::{
    events::EventType,
    models::{MessageStatus, Transition},
};

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Entity already exists: {0}")]
    AlreadyExists(String),
    /// The stored record changed since the snapshot being written was loaded.
    #[error("Concurrent update: {0}")]
    Conflict(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("cannot apply [{operation}] to a message with status [{status}]")]
    InvalidTransition {
        operation: Transition,
        status: MessageStatus,
    },
    #[error("cannot encode [{event_type}] payload as JSON: {error}")]
    Serialization {
        event_type: EventType,
        error: serde_json::Error,
    },
    #[error("event dispatch failed: {0:#}")]
    Dispatch(anyhow::Error),
    #[error("repository failure: {0:#}")]
    Repository(anyhow::Error),
    #[error("{context}: {inner}")]
    Context {
        context: String,
        inner: Box<DomainError>,
    },
}

impl DomainError {
    /// Wraps the error with a description of the operation and the entity it was acting on.
    pub fn context(self, context: impl Into<String>) -> Self {
        DomainError::Context {
            context: context.into(),
            inner: Box::new(self),
        }
    }

    /// The innermost error, with every context layer stripped.
    pub fn root(&self) -> &DomainError {
        match self {
            DomainError::Context { inner, .. } => inner.root(),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), DomainError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), DomainError::Conflict(_))
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self.root(), DomainError::InvalidTransition { .. })
    }

    /// Errors that redelivering the same trigger can never fix.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self.root(),
            DomainError::NotFound(_)
                | DomainError::AlreadyExists(_)
                | DomainError::Validation(_)
                | DomainError::InvalidTransition { .. }
                | DomainError::Serialization { .. }
        )
    }
}
