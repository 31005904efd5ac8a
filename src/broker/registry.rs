//! Topic registry
//!
//! The registry is the single owner of every `TopicEntry`. Topics and the
//! surface bindings that point at them live together under one `RwLock`, so
//! a lookup can never observe a topic whose four surfaces are only partly
//! registered: creation allocates all four and links the entry in while
//! holding the write lock.
//!
//! Concurrency notes:
//! - lookups take the read lock only long enough to clone an
//!   `Arc<TopicEntry>`; subscriber lists are locked per topic afterwards.
//! - there is no single-topic removal; `destroy_all` tears everything down
//!   at shutdown.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::broker::surface::{SurfaceAllocator, SurfaceHandle, SurfaceId, SurfaceKind, TopicHandleSet};
use crate::broker::topic::{TopicEntry, TopicSummary, validate_topic_name};
use crate::config::RegistrySettings;
use crate::utils::error::{RegistryError, Result};

#[derive(Debug, Default)]
struct RegistryState {
    topics: HashMap<String, Arc<TopicEntry>>,
    /// Topic names in creation order.
    order: Vec<String>,
    surfaces: HashMap<SurfaceId, SurfaceHandle>,
}

#[derive(Debug)]
pub struct TopicRegistry {
    state: RwLock<RegistryState>,
    allocator: SurfaceAllocator,
    prefix: String,
}

impl Default for TopicRegistry {
    fn default() -> Self {
        Self::new(&RegistrySettings::default())
    }
}

impl TopicRegistry {
    pub fn new(settings: &RegistrySettings) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            allocator: SurfaceAllocator::new(settings.max_surfaces),
            prefix: settings.topic_prefix.clone(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Creates a topic and its four control surfaces.
    ///
    /// Either the whole topic is registered or nothing is: if any surface
    /// cannot be allocated, the ones already allocated are released.
    pub fn create_topic(&self, name: &str) -> Result<TopicHandleSet> {
        let name = validate_topic_name(name.as_bytes())?;

        let mut state = self.state.write();
        if state.topics.contains_key(&name) {
            warn!("topic '{name}' already exists");
            return Err(RegistryError::TopicExists(name));
        }

        let ids = self.allocate_surfaces(&name)?;
        let entry = Arc::new(TopicEntry::new(&name, &self.prefix, ids));
        for handle in entry.surfaces().iter() {
            state.surfaces.insert(handle.id, handle.clone());
        }
        let handles = entry.surfaces().clone();
        let path = entry.path().to_string();
        state.topics.insert(name.clone(), entry);
        state.order.push(name);
        drop(state);

        info!("surfaces created on {path}");
        self.display_topics();

        Ok(handles)
    }

    fn allocate_surfaces(&self, name: &str) -> Result<[SurfaceId; 4]> {
        let mut ids = [SurfaceId(0); 4];
        for (i, kind) in SurfaceKind::ALL.into_iter().enumerate() {
            match self.allocator.allocate(name, kind) {
                Ok(id) => ids[i] = id,
                Err(err) => {
                    error!("{err}; rolling back {i} surface(s)");
                    for id in &ids[..i] {
                        self.allocator.release(*id);
                    }
                    return Err(err);
                }
            }
        }
        Ok(ids)
    }

    pub fn find_topic(&self, name: &str) -> Option<Arc<TopicEntry>> {
        self.state.read().topics.get(name).cloned()
    }

    /// Looks a topic up by its full path, e.g. `psipc/topics/news`.
    pub fn find_by_path(&self, path: &str) -> Option<Arc<TopicEntry>> {
        let name = path.strip_prefix(self.prefix.as_str())?;
        self.find_topic(name)
    }

    pub fn resolve_surface(&self, id: SurfaceId) -> Option<SurfaceHandle> {
        self.state.read().surfaces.get(&id).cloned()
    }

    /// Resolves a surface path such as `psipc/topics/news/subscribe`: the
    /// parent component names the topic, the last one the surface.
    pub fn resolve_path(&self, path: &str) -> Option<SurfaceHandle> {
        let (topic_path, file) = path.rsplit_once('/')?;
        let kind = SurfaceKind::from_file_name(file)?;
        self.find_by_path(topic_path)
            .map(|entry| entry.surfaces().get(kind).clone())
    }

    pub fn surface_for(&self, topic: &str, kind: SurfaceKind) -> Option<SurfaceHandle> {
        self.find_topic(topic)
            .map(|entry| entry.surfaces().get(kind).clone())
    }

    /// Summaries of all topics in creation order.
    pub fn topics(&self) -> Vec<TopicSummary> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|name| state.topics.get(name))
            .map(|entry| entry.summary())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().topics.is_empty()
    }

    pub fn live_surfaces(&self) -> usize {
        self.allocator.live()
    }

    /// Tears down every topic: subscriber lists are cleared, surfaces
    /// released and entries unlinked. Returns the number of topics removed.
    pub fn destroy_all(&self) -> usize {
        let mut state = self.state.write();
        let names = std::mem::take(&mut state.order);
        let mut destroyed = 0;

        for name in names {
            let Some(entry) = state.topics.remove(&name) else {
                continue;
            };

            let pids = entry.clear_subscribers();
            debug!("freed {pids} pid(s) of {}", entry.path());

            for handle in entry.surfaces().iter() {
                state.surfaces.remove(&handle.id);
                self.allocator.release(handle.id);
                info!("destroyed {}", handle.path());
            }
            destroyed += 1;
        }

        if destroyed == 0 {
            debug!("no topic to destroy");
        }
        destroyed
    }

    fn display_topics(&self) {
        for (i, topic) in self.topics().iter().enumerate() {
            debug!("topic[{i}] dir: {}", topic.path);
        }
    }
}
