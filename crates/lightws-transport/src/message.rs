use bytes::Bytes;

/// How a channel should deliver inbound binary messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinaryType {
    /// Deliver binary messages as raw bytes.
    #[default]
    Binary,
    /// Deliver binary messages as (lossily decoded) text.
    Text,
}

impl BinaryType {
    /// Apply this delivery mode to an inbound message body.
    pub fn apply(self, data: MessageData) -> MessageData {
        match (self, data) {
            (BinaryType::Text, MessageData::Binary(bytes)) => {
                MessageData::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
            (_, data) => data,
        }
    }
}

/// Body of one discrete inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageData {
    Binary(Bytes),
    Text(String),
}

impl MessageData {
    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_ref().is_empty()
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, MessageData::Binary(_))
    }
}

impl AsRef<[u8]> for MessageData {
    fn as_ref(&self) -> &[u8] {
        match self {
            MessageData::Binary(bytes) => bytes.as_ref(),
            MessageData::Text(text) => text.as_bytes(),
        }
    }
}

/// Inbound message envelope handed to message handlers.
///
/// Exposes its body through `AsRef<[u8]>`, so code that decodes frames
/// accepts the envelope and a bare byte buffer alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub data: MessageData,
}

impl MessageEvent {
    pub fn new(data: MessageData) -> Self {
        Self { data }
    }

    pub fn binary(bytes: impl Into<Bytes>) -> Self {
        Self::new(MessageData::Binary(bytes.into()))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(MessageData::Text(text.into()))
    }
}

impl AsRef<[u8]> for MessageEvent {
    fn as_ref(&self) -> &[u8] {
        self.data.as_ref()
    }
}
