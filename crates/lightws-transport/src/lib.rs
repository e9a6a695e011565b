//! Raw duplex channel contract.
//!
//! The event layer only needs a channel that can send one discrete binary
//! message, be closed, and report inbound messages and channel errors to a
//! registered handler. Channels expose handlers in one of two styles:
//! - subscribe-method style ([`Subscribe`]), any number of subscribers
//! - callback-attribute style ([`HandlerSlots`]), one handler per slot
//!
//! Two channels ship with the crate:
//! - [`MemoryChannel`]: an in-process duplex pair, driven by `pump`
//! - `WebSocketChannel`: a `tungstenite` WebSocket (behind `websocket` feature)

pub mod error;
pub mod memory;
pub mod message;
pub mod traits;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use bytes::Bytes;
pub use error::{HandlerError, Result, TransportError};
pub use memory::MemoryChannel;
pub use message::{BinaryType, MessageData, MessageEvent};
pub use traits::{
    ErrorHandler, HandlerSlots, MessageHandler, PumpStatus, RawChannel, Subscribe, Subscription,
};

#[cfg(feature = "websocket")]
pub use websocket::{connect, WebSocketChannel, WebSocketListener};
