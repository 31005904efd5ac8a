//! Control-surface router
//!
//! Every operation arrives through one surface handle. The router checks the
//! handle's kind, resolves the topic the handle was bound to when it was
//! created and dispatches to that topic. Callers never name the topic
//! themselves once they hold a handle.
//!
//! Writes report two things separately in a `Receipt`: how many bytes the
//! transport consumed, and whether the request was valid. A malformed pid is
//! still "received".

use std::sync::Arc;

use tracing::{debug, warn};

use crate::broker::gate::{GateGuard, RegistrationGate};
use crate::broker::pid_set::parse_subscriber_id;
use crate::broker::registry::TopicRegistry;
use crate::broker::request::Staged;
use crate::broker::surface::{SurfaceHandle, SurfaceId, SurfaceKind, TopicHandleSet};
use crate::broker::topic::{TopicEntry, validate_topic_name};
use crate::config::RegistrySettings;
use crate::utils::error::{RegistryError, Result};

/// Outcome of a write to a control surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub received: usize,
    pub outcome: Result<()>,
}

impl Receipt {
    fn rejected(err: RegistryError) -> Self {
        Self {
            received: 0,
            outcome: Err(err),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug)]
pub struct ControlSurfaceRouter {
    registry: Arc<TopicRegistry>,
    gate: RegistrationGate,
    max_message_len: usize,
    list_chunk_len: usize,
}

impl ControlSurfaceRouter {
    pub fn new(registry: Arc<TopicRegistry>, settings: &RegistrySettings) -> Self {
        Self {
            registry,
            gate: RegistrationGate::new(settings.listing_lock),
            max_message_len: settings.max_message_len,
            list_chunk_len: settings.list_chunk_len,
        }
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    pub fn gate(&self) -> &RegistrationGate {
        &self.gate
    }

    /// Default size of one listing read handed to remote clients.
    pub fn list_chunk_len(&self) -> usize {
        self.list_chunk_len
    }

    /// Opens the creation surface. Only one creator may be open at a time.
    pub fn open_creator(&self) -> Result<TopicCreator<'_>> {
        let guard = self.gate.acquire_creation()?;
        Ok(TopicCreator {
            router: self,
            staged: Vec::new(),
            _guard: guard,
        })
    }

    /// Open, write and close the creation surface in one go.
    pub fn create_topic(&self, raw: &[u8]) -> Result<TopicHandleSet> {
        let mut creator = self.open_creator()?;
        creator.write(raw)
    }

    pub fn resolve(&self, id: SurfaceId) -> Result<SurfaceHandle> {
        self.registry
            .resolve_surface(id)
            .ok_or(RegistryError::UnknownSurface(id))
    }

    pub fn surface(&self, topic: &str, kind: SurfaceKind) -> Result<SurfaceHandle> {
        self.registry
            .surface_for(topic, kind)
            .ok_or_else(|| RegistryError::TopicNotFound(topic.to_string()))
    }

    /// Dispatches a raw write to the operation behind `surface`.
    pub fn write(&self, surface: &SurfaceHandle, raw: &[u8]) -> Receipt {
        match surface.kind {
            SurfaceKind::Subscribe => self.subscribe(surface, raw),
            SurfaceKind::SignalNr => self.configure_signal(surface, raw),
            SurfaceKind::Endpoint => self.publish(surface, raw),
            SurfaceKind::SubscribersList => {
                Receipt::rejected(RegistryError::NotWritable(surface.kind))
            }
        }
    }

    pub fn subscribe(&self, surface: &SurfaceHandle, raw: &[u8]) -> Receipt {
        if let Err(err) = surface.expect_kind(SurfaceKind::Subscribe) {
            return Receipt::rejected(err);
        }

        let staged = Staged::new(raw, self.max_message_len);
        let outcome = parse_subscriber_id(staged.body()).and_then(|pid| {
            let entry = bound_entry(&self.registry, surface)?;
            entry.subscribe(pid);
            Ok(())
        });

        if let Err(err) = &outcome {
            warn!("subscribe on {} rejected: {err}", surface.path());
        }

        Receipt {
            received: staged.received(),
            outcome,
        }
    }

    /// Opens a subscribers listing. A second open while one is in flight
    /// fails with `Busy` until the first reader is dropped.
    pub fn open_listing(&self, surface: &SurfaceHandle) -> Result<ListingReader> {
        surface.expect_kind(SurfaceKind::SubscribersList)?;
        let entry = bound_entry(&self.registry, surface)?;
        let guard = self.gate.acquire_listing(&entry)?;

        Ok(ListingReader {
            registry: self.registry.clone(),
            surface: surface.clone(),
            buffer: None,
            offset: 0,
            _guard: guard,
        })
    }

    pub fn list_subscribers(&self, surface: &SurfaceHandle) -> Result<String> {
        self.open_listing(surface)?.read_to_string()
    }

    /// Accepted and ignored: the signal configuration has no effect yet.
    pub fn configure_signal(&self, surface: &SurfaceHandle, raw: &[u8]) -> Receipt {
        if let Err(err) = surface.expect_kind(SurfaceKind::SignalNr) {
            return Receipt::rejected(err);
        }

        let staged = Staged::new(raw, self.max_message_len);
        let outcome = bound_entry(&self.registry, surface).map(|_| {
            debug!("ignoring signal_nr write '{}' on {}", staged.lossy(), surface.path());
        });

        Receipt {
            received: staged.received(),
            outcome,
        }
    }

    /// Payload delivery is reserved; every publish is rejected.
    pub fn publish(&self, surface: &SurfaceHandle, _payload: &[u8]) -> Receipt {
        let err = match surface.expect_kind(SurfaceKind::Endpoint) {
            Ok(()) => RegistryError::NotImplemented(SurfaceKind::Endpoint),
            Err(err) => err,
        };
        Receipt::rejected(err)
    }
}

/// Finds the topic a handle belongs to. A handle outlives its topic only
/// across `destroy_all`; a topic re-created under the same name gets new
/// surfaces, so old handles keep failing.
fn bound_entry(registry: &TopicRegistry, surface: &SurfaceHandle) -> Result<Arc<TopicEntry>> {
    registry
        .find_topic(&surface.topic)
        .filter(|entry| entry.surfaces().get(surface.kind).id == surface.id)
        .ok_or_else(|| {
            warn!("cannot find topic '{}' for surface {}", surface.topic, surface.id);
            RegistryError::TopicNotFound(surface.topic.clone())
        })
}

/// An open creation surface.
pub struct TopicCreator<'a> {
    router: &'a ControlSurfaceRouter,
    staged: Vec<u8>,
    _guard: GateGuard,
}

impl TopicCreator<'_> {
    /// Creates the topic named by `raw` (trailing newline allowed).
    pub fn write(&mut self, raw: &[u8]) -> Result<TopicHandleSet> {
        let staged = Staged::new(raw, self.router.max_message_len);
        self.staged = staged.body().to_vec();

        let name = validate_topic_name(staged.body())?;
        let handles = self.router.registry.create_topic(&name)?;
        self.staged.clear();
        Ok(handles)
    }

    /// The staged request; empty after a successful write.
    pub fn read(&self) -> &[u8] {
        &self.staged
    }
}

/// A subscribers listing in progress.
///
/// The list is formatted on the first read and handed out in bounded chunks.
/// Once everything has been delivered every read returns an empty chunk;
/// reading again from the start needs a new `open_listing`.
#[derive(Debug)]
pub struct ListingReader {
    registry: Arc<TopicRegistry>,
    surface: SurfaceHandle,
    buffer: Option<Vec<u8>>,
    offset: usize,
    _guard: GateGuard,
}

impl ListingReader {
    pub fn topic(&self) -> &str {
        &self.surface.topic
    }

    pub fn read(&mut self, max: usize) -> Result<Vec<u8>> {
        if self.buffer.is_none() {
            let entry = bound_entry(&self.registry, &self.surface)?;
            self.buffer = Some(entry.format_listing().into_bytes());
        }
        let Some(buffer) = self.buffer.as_ref() else {
            return Ok(Vec::new());
        };

        let end = self.offset.saturating_add(max).min(buffer.len());
        let chunk = buffer[self.offset..end].to_vec();
        self.offset = end;
        if chunk.is_empty() {
            debug!("listing of {} exhausted", self.surface.path());
        }
        Ok(chunk)
    }

    pub fn is_exhausted(&self) -> bool {
        self.buffer
            .as_ref()
            .is_some_and(|buffer| self.offset >= buffer.len())
    }

    pub fn read_to_string(&mut self) -> Result<String> {
        let mut out = Vec::new();
        loop {
            let chunk = self.read(4096)?;
            if chunk.is_empty() {
                break;
            }
            out.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}
