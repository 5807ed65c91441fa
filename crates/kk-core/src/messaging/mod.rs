//! Messenger abstractions: inbound updates, outbound reply actions, the port.

pub mod port;
pub mod throttled;
pub mod types;
