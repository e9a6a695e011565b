use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError, Field};
use crate::message::{Message, Payload};

/// Size of each big-endian length field.
pub const LENGTH_FIELD_SIZE: usize = 4;

/// Fixed per-frame overhead: event length (4) + payload length (4) = 8 bytes.
pub const HEADER_OVERHEAD: usize = 2 * LENGTH_FIELD_SIZE;

/// Payload length sentinel meaning "no payload" (-1 as signed 32-bit).
pub const NO_PAYLOAD: u32 = u32::MAX;

/// Largest event name the length field can describe.
pub const MAX_EVENT_LEN: usize = u32::MAX as usize;

/// Largest payload length representable without colliding with the sentinel.
pub const MAX_PAYLOAD_LEN: usize = (NO_PAYLOAD - 1) as usize;

/// Event name limit of [`FrameConfig::constrained`]: 64 KiB.
pub const CONSTRAINED_MAX_EVENT_LEN: usize = 64 * 1024;

/// Payload limit of [`FrameConfig::constrained`]: 16 MiB.
pub const CONSTRAINED_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Size limits applied while encoding and decoding.
///
/// The default accepts every frame the length fields can express, so it
/// interoperates with any peer. Use [`FrameConfig::constrained`] or explicit
/// limits to bound memory spent on a single inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum event name size in bytes. Default: [`MAX_EVENT_LEN`].
    pub max_event_len: usize,
    /// Maximum payload size in bytes. Default: [`MAX_PAYLOAD_LEN`].
    pub max_payload_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_event_len: MAX_EVENT_LEN,
            max_payload_len: MAX_PAYLOAD_LEN,
        }
    }
}

impl FrameConfig {
    /// Limits of 64 KiB per event name and 16 MiB per payload.
    pub fn constrained() -> Self {
        Self {
            max_event_len: CONSTRAINED_MAX_EVENT_LEN,
            max_payload_len: CONSTRAINED_MAX_PAYLOAD,
        }
    }

    fn event_limit(&self) -> usize {
        self.max_event_len.min(MAX_EVENT_LEN)
    }

    fn payload_limit(&self) -> usize {
        self.max_payload_len.min(MAX_PAYLOAD_LEN)
    }
}

/// Encode an event and optional payload into a frame using default limits.
///
/// Wire format (big-endian, no padding):
/// ```text
/// ┌──────────────┬──────────────┬────────────────┬─────────────────┐
/// │ Event length │ Event        │ Payload length │ Payload          │
/// │ (4B BE)      │ (UTF-8)      │ (4B BE)        │ (UTF-8, if any)  │
/// │              │              │ 0xFFFFFFFF =   │                  │
/// │              │              │ no payload     │                  │
/// └──────────────┴──────────────┴────────────────┴─────────────────┘
/// ```
pub fn encode(event: &str, payload: Option<&Payload>) -> Result<Bytes, EncodeError> {
    encode_with_config(event, payload, &FrameConfig::default())
}

/// Encode a frame with explicit size limits.
pub fn encode_with_config(
    event: &str,
    payload: Option<&Payload>,
    config: &FrameConfig,
) -> Result<Bytes, EncodeError> {
    let mut dst = BytesMut::new();
    encode_into(event, payload, config, &mut dst)?;
    Ok(dst.freeze())
}

/// Append an encoded frame to `dst`.
///
/// Nothing is written when validation fails.
pub fn encode_into(
    event: &str,
    payload: Option<&Payload>,
    config: &FrameConfig,
    dst: &mut BytesMut,
) -> Result<(), EncodeError> {
    let event_bytes = event.as_bytes();
    check_event_len(event_bytes.len(), config)?;

    let payload_bytes = payload.map(Payload::wire_bytes).transpose()?;
    if let Some(bytes) = &payload_bytes {
        let max = config.payload_limit();
        if bytes.len() > max {
            return Err(EncodeError::TooLarge {
                field: Field::Payload,
                len: bytes.len(),
                max,
            });
        }
    }

    let payload_len = payload_bytes.as_ref().map_or(0, |bytes| bytes.len());
    dst.reserve(HEADER_OVERHEAD + event_bytes.len() + payload_len);
    dst.put_u32(event_bytes.len() as u32);
    dst.put_slice(event_bytes);
    match payload_bytes {
        Some(bytes) => {
            dst.put_u32(bytes.len() as u32);
            dst.put_slice(&bytes);
        }
        None => dst.put_u32(NO_PAYLOAD),
    }
    Ok(())
}

/// Total frame size for an event and payload: `8 + event bytes + payload bytes`.
pub fn encoded_len(event: &str, payload: Option<&Payload>) -> Result<usize, EncodeError> {
    let payload_len = match payload {
        Some(payload) => payload.wire_bytes()?.len(),
        None => 0,
    };
    Ok(HEADER_OVERHEAD + event.len() + payload_len)
}

/// Decode exactly one frame using default limits.
///
/// Accepts anything that exposes the frame bytes, so both a bare buffer and a
/// message envelope implementing `AsRef<[u8]>` decode the same way.
pub fn decode(src: impl AsRef<[u8]>) -> Result<Message, DecodeError> {
    decode_with_config(src, &FrameConfig::default())
}

/// Decode exactly one frame with explicit size limits.
///
/// Malformed framing (short buffer, bad UTF-8, oversized length) is an error.
/// Payload text that is not JSON is kept as [`Payload::Text`].
pub fn decode_with_config(
    src: impl AsRef<[u8]>,
    config: &FrameConfig,
) -> Result<Message, DecodeError> {
    let mut buf = src.as_ref();

    let event_len = read_u32(&mut buf, Field::EventLength)? as usize;
    if event_len == 0 {
        return Err(DecodeError::EmptyEvent);
    }
    let max = config.event_limit();
    if event_len > max {
        return Err(DecodeError::TooLarge {
            field: Field::Event,
            len: event_len,
            max,
        });
    }
    let event = read_text(&mut buf, event_len, Field::Event)?;

    let payload_len = read_u32(&mut buf, Field::PayloadLength)?;
    let payload = if payload_len == NO_PAYLOAD {
        None
    } else {
        let len = payload_len as usize;
        let max = config.payload_limit();
        if len > max {
            return Err(DecodeError::TooLarge {
                field: Field::Payload,
                len,
                max,
            });
        }
        Some(Payload::parse(read_text(&mut buf, len, Field::Payload)?))
    };

    if !buf.is_empty() {
        return Err(DecodeError::TrailingBytes { extra: buf.len() });
    }

    Ok(Message { event, payload })
}

fn check_event_len(len: usize, config: &FrameConfig) -> Result<(), EncodeError> {
    if len == 0 {
        return Err(EncodeError::EmptyEvent);
    }
    let max = config.event_limit();
    if len > max {
        return Err(EncodeError::TooLarge {
            field: Field::Event,
            len,
            max,
        });
    }
    Ok(())
}

fn take<'a>(buf: &mut &'a [u8], len: usize, field: Field) -> Result<&'a [u8], DecodeError> {
    if buf.len() < len {
        return Err(DecodeError::Truncated {
            field,
            needed: len,
            available: buf.len(),
        });
    }
    let (head, rest) = buf.split_at(len);
    *buf = rest;
    Ok(head)
}

fn read_u32(buf: &mut &[u8], field: Field) -> Result<u32, DecodeError> {
    let bytes = take(buf, LENGTH_FIELD_SIZE, field)?;
    let mut raw = [0u8; LENGTH_FIELD_SIZE];
    raw.copy_from_slice(bytes);
    Ok(u32::from_be_bytes(raw))
}

fn read_text(buf: &mut &[u8], len: usize, field: Field) -> Result<String, DecodeError> {
    let bytes = take(buf, len, field)?;
    String::from_utf8(bytes.to_vec()).map_err(|source| DecodeError::InvalidUtf8 { field, source })
}
