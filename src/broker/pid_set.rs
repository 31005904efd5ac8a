//! Subscriber lists
//!
//! A `PidSet` keeps the pids subscribed to one topic in subscription order.
//! Duplicates are kept: subscribing the same pid twice lists it twice.

use std::fmt::Write as _;

use crate::utils::error::{RegistryError, Result};

pub type SubscriberId = u32;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PidSet {
    pids: Vec<SubscriberId>,
}

impl PidSet {
    pub fn new() -> Self {
        Self { pids: Vec::new() }
    }

    pub fn insert(&mut self, pid: SubscriberId) {
        self.pids.push(pid);
    }

    pub fn iter(&self) -> impl Iterator<Item = SubscriberId> + '_ {
        self.pids.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    pub fn clear(&mut self) {
        self.pids.clear();
    }

    /// Renders the list as `"<pid> <pid> ... \n"`. An empty set renders as a
    /// lone newline.
    pub fn format_listing(&self) -> String {
        let mut out = String::with_capacity(self.pids.len() * 8 + 1);
        for pid in &self.pids {
            // writing to a String cannot fail
            let _ = write!(out, "{pid} ");
        }
        out.push('\n');
        out
    }
}

/// Parses a staged subscribe body as a decimal pid.
///
/// Every byte must be an ASCII digit; there is no partial parse. Empty input
/// and values that overflow `SubscriberId` are rejected.
pub fn parse_subscriber_id(body: &[u8]) -> Result<SubscriberId> {
    let invalid = || RegistryError::InvalidSubscriberId(String::from_utf8_lossy(body).into_owned());

    if body.is_empty() {
        return Err(invalid());
    }

    body.iter().try_fold(0 as SubscriberId, |acc, &b| {
        if !b.is_ascii_digit() {
            return Err(invalid());
        }
        acc.checked_mul(10)
            .and_then(|n| n.checked_add(SubscriberId::from(b - b'0')))
            .ok_or_else(invalid)
    })
}
