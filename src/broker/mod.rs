//! The `broker` module is the core of the service: the topic registry, the
//! per-topic subscriber lists, the control surfaces each topic exposes, and
//! the router and exclusivity gates that sit in front of them.

pub mod gate;
pub mod pid_set;
pub mod registry;
pub mod request;
pub mod router;
pub mod surface;
pub mod topic;

pub use gate::{ListingLock, RegistrationGate};
pub use pid_set::{PidSet, SubscriberId};
pub use registry::TopicRegistry;
pub use router::{ControlSurfaceRouter, ListingReader, Receipt, TopicCreator};
pub use surface::{SurfaceHandle, SurfaceId, SurfaceKind, TopicHandleSet};
pub use topic::{TopicEntry, TopicSummary};

#[cfg(test)]
mod tests;
