//! The `transport` module exposes the control surfaces over the network.
//!
//! It defines the JSON protocol spoken with clients and the WebSocket server
//! that parses requests, hands them to the `ControlSurfaceRouter` and sends
//! back the replies.

pub mod message;
pub mod websocket;
