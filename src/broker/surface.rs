//! Control surfaces
//!
//! Every topic exposes four control surfaces. A surface is identified by a
//! `SurfaceId` handed out by the `SurfaceAllocator` (ids are never reused
//! while the process lives, much like ephemeral ports) and is bound to
//! exactly one topic for its whole life through an immutable `SurfaceHandle`.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::utils::error::{RegistryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Subscribe,
    SubscribersList,
    SignalNr,
    Endpoint,
}

/// How a surface may be used by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl SurfaceKind {
    /// Creation order of a topic's surfaces.
    pub const ALL: [SurfaceKind; 4] = [
        SurfaceKind::Subscribe,
        SurfaceKind::SubscribersList,
        SurfaceKind::SignalNr,
        SurfaceKind::Endpoint,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            SurfaceKind::Subscribe => "subscribe",
            SurfaceKind::SubscribersList => "subscribers_list",
            SurfaceKind::SignalNr => "signal_nr",
            SurfaceKind::Endpoint => "endpoint",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.file_name() == name)
    }

    pub fn access(self) -> AccessMode {
        match self {
            SurfaceKind::Subscribe | SurfaceKind::SignalNr => AccessMode::WriteOnly,
            SurfaceKind::SubscribersList => AccessMode::ReadOnly,
            SurfaceKind::Endpoint => AccessMode::ReadWrite,
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// One control surface, bound to its topic by name at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceHandle {
    pub id: SurfaceId,
    pub kind: SurfaceKind,
    pub topic: String,
    path: String,
}

impl SurfaceHandle {
    pub(crate) fn new(id: SurfaceId, kind: SurfaceKind, topic_path: &str, topic: &str) -> Self {
        Self {
            id,
            kind,
            topic: topic.to_string(),
            path: format!("{}/{}", topic_path, kind.file_name()),
        }
    }

    /// Full address of the surface, e.g. `psipc/topics/news/subscribe`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn expect_kind(&self, expected: SurfaceKind) -> Result<()> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(RegistryError::WrongSurface {
                expected,
                actual: self.kind,
            })
        }
    }
}

/// The four surfaces of one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicHandleSet {
    pub subscribe: SurfaceHandle,
    pub subscribers_list: SurfaceHandle,
    pub signal_nr: SurfaceHandle,
    pub endpoint: SurfaceHandle,
}

impl TopicHandleSet {
    pub fn get(&self, kind: SurfaceKind) -> &SurfaceHandle {
        match kind {
            SurfaceKind::Subscribe => &self.subscribe,
            SurfaceKind::SubscribersList => &self.subscribers_list,
            SurfaceKind::SignalNr => &self.signal_nr,
            SurfaceKind::Endpoint => &self.endpoint,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SurfaceHandle> {
        SurfaceKind::ALL.into_iter().map(move |kind| self.get(kind))
    }

    pub fn topic(&self) -> &str {
        &self.subscribe.topic
    }
}

/// Hands out surface ids up to a fixed number of live surfaces.
#[derive(Debug)]
pub struct SurfaceAllocator {
    next: AtomicU64,
    live: Mutex<HashSet<SurfaceId>>,
    capacity: usize,
}

impl SurfaceAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            next: AtomicU64::new(1),
            live: Mutex::new(HashSet::new()),
            capacity,
        }
    }

    pub fn allocate(&self, topic: &str, kind: SurfaceKind) -> Result<SurfaceId> {
        let mut live = self.live.lock();
        if live.len() >= self.capacity {
            return Err(RegistryError::Allocation {
                topic: topic.to_string(),
                kind,
                reason: format!("surface capacity of {} exhausted", self.capacity),
            });
        }

        let id = SurfaceId(self.next.fetch_add(1, Ordering::Relaxed));
        live.insert(id);
        Ok(id)
    }

    /// Returns `false` if the id was not live.
    pub fn release(&self, id: SurfaceId) -> bool {
        self.live.lock().remove(&id)
    }

    pub fn live(&self) -> usize {
        self.live.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
