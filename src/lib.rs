//! # psipc
//!
//! `psipc` is an in-memory topic registry for pid-based publish/subscribe.
//! Clients create named topics at runtime; every topic exposes four control
//! surfaces (`subscribe`, `subscribers_list`, `signal_nr`, `endpoint`) and
//! the service tracks which process ids are subscribed to each topic.
//!
//! ## Core Modules
//!
//! - `broker`: topic registry, subscriber lists, control surfaces, router and exclusivity gates.
//! - `client`: per-connection session state.
//! - `config`: loading and merging service configuration.
//! - `transport`: the JSON protocol and the WebSocket server.
//! - `utils`: error type and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
