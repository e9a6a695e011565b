use std::fmt;
use std::io;

use lightws_frame::{DecodeError, EncodeError};
use lightws_socket::SocketError;
use lightws_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused => FAILURE,
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        TransportError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
        TransportError::Handler(source) => match source.downcast::<SocketError>() {
            Ok(err) => socket_error(context, *err),
            Err(other) => CliError::new(FAILURE, format!("{context}: {other}")),
        },
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn encode_error(context: &str, err: EncodeError) -> CliError {
    match err {
        EncodeError::EmptyEvent => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn decode_error(context: &str, err: DecodeError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn socket_error(context: &str, err: SocketError) -> CliError {
    match err {
        SocketError::Encode(err) => encode_error(context, err),
        SocketError::Decode(err) => decode_error(context, err),
        SocketError::Channel(err) => transport_error(context, err),
        SocketError::Listener { .. } | SocketError::ListenerPanicked { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        SocketError::Unbindable => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}
