//! The `client` module defines the server-side view of a connected client.
//!
//! A `Session` carries the client's identifier, the channel used to push
//! messages back to it, and any control surface it currently holds open.

pub mod session;
pub use session::Session;
