use std::fmt;

/// Frame section a length check or UTF-8 check failed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    EventLength,
    Event,
    PayloadLength,
    Payload,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::EventLength => "event length",
            Field::Event => "event",
            Field::PayloadLength => "payload length",
            Field::Payload => "payload",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while encoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// Event names must be non-empty.
    #[error("event name must not be empty")]
    EmptyEvent,

    /// The event name or payload does not fit the length field or configured limit.
    #[error("{field} too large ({len} bytes, max {max})")]
    TooLarge { field: Field, len: usize, max: usize },

    /// The payload could not be serialized to JSON.
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that can occur while decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The buffer ended before a length field or its bytes were complete.
    #[error("truncated frame: {field} needs {needed} bytes, {available} available")]
    Truncated {
        field: Field,
        needed: usize,
        available: usize,
    },

    /// Event or payload bytes are not valid UTF-8.
    #[error("{field} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        field: Field,
        source: std::string::FromUtf8Error,
    },

    /// A length field exceeds the configured limit.
    #[error("{field} too large ({len} bytes, max {max})")]
    TooLarge { field: Field, len: usize, max: usize },

    /// The frame carries a zero-length event name.
    #[error("frame has an empty event name")]
    EmptyEvent,

    /// Bytes remain after the payload; the buffer held more than one frame.
    #[error("{extra} trailing bytes after frame")]
    TrailingBytes { extra: usize },
}
