//! Exclusivity gates
//!
//! Opening the creation surface or a subscribers listing takes an exclusive
//! flag. A second opener is turned away with `Busy` instead of waiting; the
//! flag is released when the returned `GateGuard` is dropped (the "close").

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use tracing::debug;

use crate::broker::topic::TopicEntry;
use crate::utils::error::{RegistryError, Result};

/// Scope of the listing flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingLock {
    /// One flag per topic: listings of different topics never collide.
    #[default]
    PerTopic,
    /// A single flag shared by every topic.
    Global,
}

#[derive(Debug, Clone, Default)]
pub struct ExclusiveFlag {
    held: Arc<AtomicBool>,
}

impl ExclusiveFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self, what: &'static str) -> Result<GateGuard> {
        if self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("{what} already open, rejecting");
            return Err(RegistryError::Busy(what));
        }

        Ok(GateGuard {
            held: self.held.clone(),
        })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Proof of exclusive access; releases the flag on drop.
#[derive(Debug)]
pub struct GateGuard {
    held: Arc<AtomicBool>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub struct RegistrationGate {
    creation: ExclusiveFlag,
    listing: ExclusiveFlag,
    listing_lock: ListingLock,
}

impl RegistrationGate {
    pub fn new(listing_lock: ListingLock) -> Self {
        Self {
            creation: ExclusiveFlag::new(),
            listing: ExclusiveFlag::new(),
            listing_lock,
        }
    }

    pub fn acquire_creation(&self) -> Result<GateGuard> {
        self.creation.try_acquire("new_topic")
    }

    pub fn acquire_listing(&self, topic: &TopicEntry) -> Result<GateGuard> {
        match self.listing_lock {
            ListingLock::PerTopic => topic.listing_flag().try_acquire("subscribers_list"),
            ListingLock::Global => self.listing.try_acquire("subscribers_list"),
        }
    }

    pub fn listing_lock(&self) -> ListingLock {
        self.listing_lock
    }

    pub fn creation_open(&self) -> bool {
        self.creation.is_held()
    }
}
