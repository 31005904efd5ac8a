use serde::{Deserialize, Serialize};

use crate::broker::{SurfaceId, TopicHandleSet, TopicSummary};
use crate::utils::error::RegistryError;

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateTopic {
        name: String,
    },
    Subscribe {
        topic: String,
        pid: String,
    },
    /// Raw write to a surface by id; dispatched on the surface's kind.
    Write {
        surface: SurfaceId,
        data: String,
    },
    ListSubscribers {
        topic: String,
    },
    OpenListing {
        topic: String,
    },
    ReadListing {
        #[serde(default)]
        max_len: Option<usize>,
    },
    CloseListing {},
    ConfigureSignal {
        topic: String,
        value: String,
    },
    Publish {
        topic: String,
        payload: String,
    },
    ListTopics {},
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    TopicCreated {
        topic: String,
        path: String,
        surfaces: SurfaceIds,
    },
    /// Transport acknowledgement of a write plus its domain outcome.
    Written {
        surface: SurfaceId,
        received: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorBody>,
    },
    Listing {
        topic: String,
        data: String,
    },
    ListingOpened {
        topic: String,
    },
    ListingChunk {
        topic: String,
        data: String,
        eof: bool,
    },
    ListingClosed {},
    Topics {
        topics: Vec<TopicSummary>,
    },
    Error {
        code: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SurfaceIds {
    pub subscribe: SurfaceId,
    pub subscribers_list: SurfaceId,
    pub signal_nr: SurfaceId,
    pub endpoint: SurfaceId,
}

impl From<&TopicHandleSet> for SurfaceIds {
    fn from(handles: &TopicHandleSet) -> Self {
        Self {
            subscribe: handles.subscribe.id,
            subscribers_list: handles.subscribers_list.id,
            signal_nr: handles.signal_nr.id,
            endpoint: handles.endpoint.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&RegistryError> for ErrorBody {
    fn from(err: &RegistryError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<RegistryError> for ServerMessage {
    fn from(err: RegistryError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
