//! The `error` module defines the error type shared by the registry, the
//! control-surface router and the transport.
//!
//! Every failure a caller can observe maps to one `RegistryError` variant.
//! None of them are fatal to the service: the registry keeps running and the
//! caller decides whether to retry (only `Busy` is worth retrying).

use crate::broker::surface::{SurfaceId, SurfaceKind};
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Creating one of a topic's control surfaces failed. Surfaces created
    /// before the failure have already been released.
    #[error("cannot allocate {kind} surface for topic '{topic}': {reason}")]
    Allocation {
        topic: String,
        kind: SurfaceKind,
        reason: String,
    },

    #[error("'{0}' is not a pid")]
    InvalidSubscriberId(String),

    #[error("invalid topic name '{0}'")]
    InvalidTopicName(String),

    #[error("topic '{0}' already exists")]
    TopicExists(String),

    #[error("topic '{0}' not found")]
    TopicNotFound(String),

    #[error("no control surface with id {0}")]
    UnknownSurface(SurfaceId),

    #[error("operation needs a {expected} surface, got {actual}")]
    WrongSurface {
        expected: SurfaceKind,
        actual: SurfaceKind,
    },

    #[error("{0} surface is not writable")]
    NotWritable(SurfaceKind),

    #[error("{0} is busy")]
    Busy(&'static str),

    #[error("{0} surface is not implemented")]
    NotImplemented(SurfaceKind),
}

impl RegistryError {
    /// Stable identifier sent to clients alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::Allocation { .. } => "allocation_error",
            RegistryError::InvalidSubscriberId(_) => "invalid_subscriber_id",
            RegistryError::InvalidTopicName(_) => "invalid_topic_name",
            RegistryError::TopicExists(_) => "topic_exists",
            RegistryError::TopicNotFound(_) => "topic_not_found",
            RegistryError::UnknownSurface(_) => "unknown_surface",
            RegistryError::WrongSurface { .. } => "wrong_surface",
            RegistryError::NotWritable(_) => "not_writable",
            RegistryError::Busy(_) => "busy",
            RegistryError::NotImplemented(_) => "not_implemented",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::Busy(_))
    }
}
