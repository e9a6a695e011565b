//! Named-event messaging over a raw duplex channel.
//!
//! This is the "just works" layer. Wrap a channel in a [`LightSocket`], then
//! `emit` events with optional payloads and register listeners with `on`.
//! Inbound frames are decoded and routed to the listeners registered for
//! their event name, in registration order.

pub mod config;
pub mod error;
pub mod listener;
pub mod registry;
pub mod socket;

pub use config::SocketConfig;
pub use error::{ErrorEvent, ListenerError, ListenerResult, Result, SocketError};
pub use listener::Listener;
pub use registry::{DuplicatePolicy, ListenerRegistry};
pub use socket::{Binding, LightSocket};
