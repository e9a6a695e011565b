/// Error returned by an inbound message handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in raw channel operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The WebSocket layer reported an error.
    #[cfg(feature = "websocket")]
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// The WebSocket opening handshake failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The channel has been closed.
    #[error("channel closed")]
    Closed,

    /// The channel was pumped from inside one of its own message handlers.
    #[error("channel pumped from inside its own message handler")]
    Reentrant,

    /// The inbound message handler failed while processing a message.
    #[error("message handler failed: {0}")]
    Handler(HandlerError),
}

pub type Result<T> = std::result::Result<T, TransportError>;
