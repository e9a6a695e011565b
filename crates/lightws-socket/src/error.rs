use std::fmt;

use lightws_frame::{DecodeError, EncodeError};
use lightws_transport::TransportError;

/// Error a listener returns to signal failure.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Return type of listener callbacks.
pub type ListenerResult = std::result::Result<(), ListenerError>;

/// Errors that can occur in socket operations.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// The outbound payload could not be framed.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// An inbound message is not a valid frame.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The underlying channel failed.
    #[error("channel error: {0}")]
    Channel(#[from] TransportError),

    /// A listener returned an error during dispatch.
    #[error("listener for '{event}' failed: {source}")]
    Listener { event: String, source: ListenerError },

    /// A listener panicked during dispatch.
    #[error("listener for '{event}' panicked: {message}")]
    ListenerPanicked { event: String, message: String },

    /// The channel exposes neither subscribe-method nor handler-slot registration.
    #[error("channel supports neither subscribe nor handler slots")]
    Unbindable,
}

pub type Result<T> = std::result::Result<T, SocketError>;

/// Error reported to the socket's `onerror` observer.
#[derive(Debug, Clone, Copy)]
pub enum ErrorEvent<'a> {
    /// A channel-level error, forwarded as the channel reported it.
    Channel(&'a TransportError),
    /// A failure while dispatching an inbound message (decode or listener).
    Dispatch(&'a SocketError),
}

impl fmt::Display for ErrorEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorEvent::Channel(err) => write!(f, "channel error: {err}"),
            ErrorEvent::Dispatch(err) => write!(f, "{err}"),
        }
    }
}
