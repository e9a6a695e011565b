use std::rc::Rc;

use bytes::Bytes;

use crate::error::{HandlerError, Result, TransportError};
use crate::message::{BinaryType, MessageEvent};

/// Handler invoked once per discrete inbound message.
///
/// A failure is returned to whatever drove the channel (usually a `pump` call).
pub type MessageHandler = Box<dyn FnMut(MessageEvent) -> std::result::Result<(), HandlerError>>;

/// Handler invoked on channel-level errors.
pub type ErrorHandler = Box<dyn FnMut(&TransportError)>;

/// A handler registration for subscribe-method style channels.
pub enum Subscription {
    Message(MessageHandler),
    Error(ErrorHandler),
}

/// Outcome of driving a channel for one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// A message was delivered to the installed handlers.
    Delivered,
    /// Nothing was delivered (no pending data, or a control message was consumed).
    Idle,
    /// The channel is closed; no more messages will arrive.
    Closed,
}

/// Subscribe-method style handler registration (`on('message', ...)`).
pub trait Subscribe {
    /// Add a handler. Earlier subscriptions stay installed.
    fn subscribe(&self, subscription: Subscription);
}

/// Callback-attribute style handler registration (`onmessage = ...`).
pub trait HandlerSlots {
    /// Install the message handler, replacing any previous one.
    fn set_onmessage(&self, handler: MessageHandler);

    /// Install the error handler, replacing any previous one.
    fn set_onerror(&self, handler: ErrorHandler);
}

/// A duplex, message-boundary-preserving channel.
///
/// Implementations expose at least one of [`RawChannel::subscriber`] or
/// [`RawChannel::handler_slots`]. Binders probe the subscriber first.
pub trait RawChannel {
    /// Send one discrete binary message.
    fn send(&self, data: Bytes) -> Result<()>;

    /// Close the channel.
    fn close(&self) -> Result<()>;

    /// Ask the channel to deliver inbound binary messages in the given form.
    ///
    /// Returns `false` if the channel does not support the setting.
    fn set_binary_type(&self, _binary_type: BinaryType) -> bool {
        false
    }

    /// Subscribe-method style registration, if supported.
    fn subscriber(&self) -> Option<&dyn Subscribe> {
        None
    }

    /// Callback-attribute style registration, if supported.
    fn handler_slots(&self) -> Option<&dyn HandlerSlots> {
        None
    }
}

impl<C: RawChannel + ?Sized> RawChannel for Rc<C> {
    fn send(&self, data: Bytes) -> Result<()> {
        (**self).send(data)
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn set_binary_type(&self, binary_type: BinaryType) -> bool {
        (**self).set_binary_type(binary_type)
    }

    fn subscriber(&self) -> Option<&dyn Subscribe> {
        (**self).subscriber()
    }

    fn handler_slots(&self) -> Option<&dyn HandlerSlots> {
        (**self).handler_slots()
    }
}
