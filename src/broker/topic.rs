//! Topic entries
//!
//! A `TopicEntry` is one topic: its name and full path, the four control
//! surfaces created with it, the (inert) signal configuration and the
//! subscriber list. Entries are owned by the registry and shared as
//! `Arc<TopicEntry>`; the subscriber list has its own lock so subscribing to
//! one topic never blocks another.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::broker::gate::ExclusiveFlag;
use crate::broker::pid_set::{PidSet, SubscriberId};
use crate::broker::surface::{SurfaceHandle, SurfaceId, SurfaceKind, TopicHandleSet};
use crate::utils::error::{RegistryError, Result};

/// Which signal subscribers would receive on publish. Nothing writes it yet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SignalConfig {
    pub nr_signal: Option<i32>,
}

#[derive(Debug)]
pub struct TopicEntry {
    name: String,
    path: String,
    surfaces: TopicHandleSet,
    signal: SignalConfig,
    subscribers: Mutex<PidSet>,
    listing: ExclusiveFlag,
    created_at: DateTime<Utc>,
}

/// Snapshot of a topic for listings and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub name: String,
    pub path: String,
    pub subscribers: usize,
    pub created_at: i64,
}

impl TopicEntry {
    /// `ids` are the allocated surface ids, in `SurfaceKind::ALL` order.
    pub(crate) fn new(name: &str, prefix: &str, ids: [SurfaceId; 4]) -> Self {
        let path = format!("{prefix}{name}");
        let [subscribe, subscribers_list, signal_nr, endpoint] = ids;
        let surfaces = TopicHandleSet {
            subscribe: SurfaceHandle::new(subscribe, SurfaceKind::Subscribe, &path, name),
            subscribers_list: SurfaceHandle::new(
                subscribers_list,
                SurfaceKind::SubscribersList,
                &path,
                name,
            ),
            signal_nr: SurfaceHandle::new(signal_nr, SurfaceKind::SignalNr, &path, name),
            endpoint: SurfaceHandle::new(endpoint, SurfaceKind::Endpoint, &path, name),
        };

        Self {
            name: name.to_string(),
            path,
            surfaces,
            signal: SignalConfig::default(),
            subscribers: Mutex::new(PidSet::new()),
            listing: ExclusiveFlag::new(),
            created_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn surfaces(&self) -> &TopicHandleSet {
        &self.surfaces
    }

    pub fn signal(&self) -> SignalConfig {
        self.signal
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn subscribe(&self, pid: SubscriberId) {
        let mut subscribers = self.subscribers.lock();
        subscribers.insert(pid);
        debug!(
            topic = %self.name,
            pids = ?subscribers.iter().collect::<Vec<_>>(),
            "added pid {pid}"
        );
    }

    pub fn subscribers(&self) -> PidSet {
        self.subscribers.lock().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn format_listing(&self) -> String {
        self.subscribers.lock().format_listing()
    }

    pub fn summary(&self) -> TopicSummary {
        TopicSummary {
            name: self.name.clone(),
            path: self.path.clone(),
            subscribers: self.subscriber_count(),
            created_at: self.created_at.timestamp_millis(),
        }
    }

    pub(crate) fn listing_flag(&self) -> &ExclusiveFlag {
        &self.listing
    }

    /// Drops every subscriber; returns how many there were.
    pub(crate) fn clear_subscribers(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        let n = subscribers.len();
        subscribers.clear();
        n
    }
}

/// Validates a staged creation body as a topic name.
///
/// Names become a path component, so they must be non-empty UTF-8 without
/// `/`.
pub fn validate_topic_name(body: &[u8]) -> Result<String> {
    let name = std::str::from_utf8(body)
        .map_err(|_| RegistryError::InvalidTopicName(String::from_utf8_lossy(body).into_owned()))?;

    if name.is_empty() || name.contains('/') {
        return Err(RegistryError::InvalidTopicName(name.to_string()));
    }

    Ok(name.to_string())
}
