//! Length-prefixed event/payload framing.
//!
//! Every message is one frame carrying a named event and an optional payload:
//! - A 4-byte big-endian event name length, then the UTF-8 event name
//! - A 4-byte big-endian payload length (or `0xFFFFFFFF` for "no payload"),
//!   then the UTF-8 payload text
//!
//! The codec is stateless. It assumes the underlying channel already preserves
//! message boundaries, so one buffer is always exactly one frame.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{
    decode, decode_with_config, encode, encode_into, encode_with_config, encoded_len, FrameConfig,
    CONSTRAINED_MAX_EVENT_LEN, CONSTRAINED_MAX_PAYLOAD, HEADER_OVERHEAD, LENGTH_FIELD_SIZE,
    MAX_EVENT_LEN, MAX_PAYLOAD_LEN, NO_PAYLOAD,
};
pub use error::{DecodeError, EncodeError, Field};
pub use message::{Message, Payload};
