//! Lightweight named-event messaging over WebSocket-style channels.
//!
//! lightws frames an event name and an optional text or JSON payload into a
//! single binary message, and layers an event emitter on top of any channel
//! that can carry such messages.
//!
//! # Crate Structure
//!
//! - [`transport`]: raw channel contract, in-memory channel and the
//!   WebSocket channel (behind the `websocket` feature)
//! - [`frame`]: binary frame codec
//! - [`socket`]: event emitter and listener registry (behind the `socket` feature)

/// Re-export transport types.
pub mod transport {
    pub use lightws_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use lightws_frame::*;
}

/// Re-export socket types (requires `socket` feature).
#[cfg(feature = "socket")]
pub mod socket {
    pub use lightws_socket::*;
}
