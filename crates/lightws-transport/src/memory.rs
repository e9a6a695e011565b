use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::message::{BinaryType, MessageData, MessageEvent};
use crate::traits::{
    ErrorHandler, MessageHandler, PumpStatus, RawChannel, Subscribe, Subscription,
};

#[derive(Default)]
struct Endpoint {
    inbox: VecDeque<MessageData>,
    closed: bool,
    dispatching: bool,
    binary_type: BinaryType,
    message_handlers: Vec<MessageHandler>,
    error_handlers: Vec<ErrorHandler>,
}

/// One end of an in-process duplex channel.
///
/// Messages sent on one end are queued on the other and delivered, one per
/// handler call, when that end is pumped. Boundaries are preserved exactly.
/// Handlers are registered subscribe-method style.
pub struct MemoryChannel {
    local: Rc<RefCell<Endpoint>>,
    remote: Rc<RefCell<Endpoint>>,
}

impl MemoryChannel {
    /// Create a connected pair of channel ends.
    pub fn pair() -> (Self, Self) {
        let left = Rc::new(RefCell::new(Endpoint::default()));
        let right = Rc::new(RefCell::new(Endpoint::default()));
        (
            Self {
                local: Rc::clone(&left),
                remote: Rc::clone(&right),
            },
            Self {
                local: right,
                remote: left,
            },
        )
    }

    /// Send a text message, as a peer that does not speak binary would.
    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.push_remote(MessageData::Text(text.into()))
    }

    /// Deliver the next queued inbound message to every message subscriber.
    ///
    /// Stops at the first subscriber that fails and returns its error.
    /// Calling this from inside a subscriber fails with
    /// [`TransportError::Reentrant`] and leaves the queue untouched.
    pub fn pump_one(&self) -> Result<PumpStatus> {
        let (data, mut handlers) = {
            let mut endpoint = self.local.borrow_mut();
            if endpoint.dispatching {
                return Err(TransportError::Reentrant);
            }
            match endpoint.inbox.pop_front() {
                Some(data) => {
                    let data = endpoint.binary_type.apply(data);
                    endpoint.dispatching = true;
                    (data, std::mem::take(&mut endpoint.message_handlers))
                }
                None if endpoint.closed => return Ok(PumpStatus::Closed),
                None => return Ok(PumpStatus::Idle),
            }
        };

        if handlers.is_empty() {
            trace!(size = data.len(), "no message subscribers; dropping message");
        }

        let mut result = Ok(PumpStatus::Delivered);
        for handler in handlers.iter_mut() {
            if let Err(err) = handler(MessageEvent::new(data.clone())) {
                result = Err(TransportError::Handler(err));
                break;
            }
        }

        // Subscriptions added while handlers ran go after the existing ones.
        let mut endpoint = self.local.borrow_mut();
        endpoint.dispatching = false;
        let added = std::mem::replace(&mut endpoint.message_handlers, handlers);
        endpoint.message_handlers.extend(added);
        result
    }

    /// Deliver every queued inbound message. Returns how many were delivered.
    pub fn pump(&self) -> Result<usize> {
        let mut delivered = 0usize;
        while self.pump_one()? == PumpStatus::Delivered {
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Report a channel-level error to every error subscriber.
    pub fn fail(&self, err: TransportError) {
        let mut handlers = std::mem::take(&mut self.local.borrow_mut().error_handlers);
        if handlers.is_empty() {
            trace!(error = %err, "no error subscribers; dropping channel error");
        }
        for handler in handlers.iter_mut() {
            handler(&err);
        }
        let mut endpoint = self.local.borrow_mut();
        let added = std::mem::replace(&mut endpoint.error_handlers, handlers);
        endpoint.error_handlers.extend(added);
    }

    /// Number of inbound messages waiting to be pumped.
    pub fn pending(&self) -> usize {
        self.local.borrow().inbox.len()
    }

    pub fn is_open(&self) -> bool {
        !self.local.borrow().closed
    }

    fn push_remote(&self, data: MessageData) -> Result<()> {
        if self.local.borrow().closed {
            return Err(TransportError::Closed);
        }
        let mut remote = self.remote.borrow_mut();
        if remote.closed {
            return Err(TransportError::Closed);
        }
        trace!(size = data.len(), "queued message for peer");
        remote.inbox.push_back(data);
        Ok(())
    }
}

impl RawChannel for MemoryChannel {
    fn send(&self, data: Bytes) -> Result<()> {
        self.push_remote(MessageData::Binary(data))
    }

    fn close(&self) -> Result<()> {
        let mut local = self.local.borrow_mut();
        if local.closed {
            return Ok(());
        }
        local.closed = true;
        local.inbox.clear();
        // The peer still drains what was already queued for it.
        self.remote.borrow_mut().closed = true;
        debug!("memory channel closed");
        Ok(())
    }

    fn set_binary_type(&self, binary_type: BinaryType) -> bool {
        self.local.borrow_mut().binary_type = binary_type;
        true
    }

    fn subscriber(&self) -> Option<&dyn Subscribe> {
        Some(self)
    }
}

impl Subscribe for MemoryChannel {
    fn subscribe(&self, subscription: Subscription) {
        let mut endpoint = self.local.borrow_mut();
        match subscription {
            Subscription::Message(handler) => endpoint.message_handlers.push(handler),
            Subscription::Error(handler) => endpoint.error_handlers.push(handler),
        }
    }
}

impl std::fmt::Debug for MemoryChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let local = self.local.borrow();
        f.debug_struct("MemoryChannel")
            .field("pending", &local.inbox.len())
            .field("closed", &local.closed)
            .field("binary_type", &local.binary_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn collect_messages(channel: &MemoryChannel) -> Rc<RefCell<Vec<MessageData>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        channel.subscribe(Subscription::Message(Box::new(move |event| {
            sink.borrow_mut().push(event.data);
            Ok(())
        })));
        seen
    }

    #[test]
    fn preserves_message_boundaries_and_order() {
        let (a, b) = MemoryChannel::pair();
        let seen = collect_messages(&b);

        a.send(Bytes::from_static(b"one")).unwrap();
        a.send(Bytes::from_static(b"two")).unwrap();
        assert_eq!(b.pending(), 2);

        assert_eq!(b.pump().unwrap(), 2);
        assert_eq!(
            *seen.borrow(),
            vec![
                MessageData::Binary(Bytes::from_static(b"one")),
                MessageData::Binary(Bytes::from_static(b"two")),
            ]
        );
    }

    #[test]
    fn duplex_in_both_directions() {
        let (a, b) = MemoryChannel::pair();
        let seen_a = collect_messages(&a);
        let seen_b = collect_messages(&b);

        a.send(Bytes::from_static(b"to-b")).unwrap();
        b.send(Bytes::from_static(b"to-a")).unwrap();
        a.pump().unwrap();
        b.pump().unwrap();

        assert_eq!(seen_a.borrow().len(), 1);
        assert_eq!(seen_b.borrow().len(), 1);
    }

    #[test]
    fn pump_idle_when_nothing_queued() {
        let (_a, b) = MemoryChannel::pair();
        assert_eq!(b.pump_one().unwrap(), PumpStatus::Idle);
    }

    #[test]
    fn handler_failure_is_returned_to_pump_caller() {
        let (a, b) = MemoryChannel::pair();
        b.subscribe(Subscription::Message(Box::new(|_| Err("boom".into()))));

        a.send(Bytes::from_static(b"x")).unwrap();
        let err = b.pump_one().unwrap_err();
        assert!(matches!(err, TransportError::Handler(e) if e.to_string() == "boom"));
    }

    #[test]
    fn text_binary_type_delivers_text() {
        let (a, b) = MemoryChannel::pair();
        assert!(b.set_binary_type(BinaryType::Text));
        let seen = collect_messages(&b);

        a.send(Bytes::from_static(b"hello")).unwrap();
        b.pump().unwrap();
        assert_eq!(*seen.borrow(), vec![MessageData::Text("hello".to_string())]);
    }

    #[test]
    fn close_rejects_sends_and_drains_peer() {
        let (a, b) = MemoryChannel::pair();
        let seen = collect_messages(&b);

        a.send(Bytes::from_static(b"last")).unwrap();
        a.close().unwrap();
        assert!(!a.is_open());
        assert!(matches!(
            a.send(Bytes::from_static(b"late")),
            Err(TransportError::Closed)
        ));
        assert!(matches!(
            b.send(Bytes::from_static(b"reply")),
            Err(TransportError::Closed)
        ));

        assert_eq!(b.pump_one().unwrap(), PumpStatus::Delivered);
        assert_eq!(b.pump_one().unwrap(), PumpStatus::Closed);
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn close_is_idempotent() {
        let (a, _b) = MemoryChannel::pair();
        a.close().unwrap();
        a.close().unwrap();
    }

    #[test]
    fn fail_reaches_every_error_subscriber() {
        let (a, _b) = MemoryChannel::pair();
        let count = Rc::new(RefCell::new(0usize));
        for _ in 0..2 {
            let count = Rc::clone(&count);
            a.subscribe(Subscription::Error(Box::new(move |err| {
                assert!(matches!(err, TransportError::Closed));
                *count.borrow_mut() += 1;
            })));
        }

        a.fail(TransportError::Closed);
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn pump_from_inside_a_subscriber_is_rejected() {
        let (a, b) = MemoryChannel::pair();
        let b = Rc::new(b);
        let nested = Rc::new(RefCell::new(Vec::new()));
        {
            let channel = Rc::downgrade(&b);
            let nested = Rc::clone(&nested);
            b.subscribe(Subscription::Message(Box::new(move |_| {
                if let Some(channel) = channel.upgrade() {
                    nested.borrow_mut().push(channel.pump_one());
                }
                Ok(())
            })));
        }

        a.send(Bytes::from_static(b"first")).unwrap();
        a.send(Bytes::from_static(b"second")).unwrap();
        assert_eq!(b.pump_one().unwrap(), PumpStatus::Delivered);

        assert!(matches!(
            nested.borrow().as_slice(),
            [Err(TransportError::Reentrant)]
        ));
        assert_eq!(b.pending(), 1);
        assert_eq!(b.pump_one().unwrap(), PumpStatus::Delivered);
        assert_eq!(nested.borrow().len(), 2);
    }

    #[test]
    fn subscriptions_added_during_dispatch_are_kept() {
        let (a, b) = MemoryChannel::pair();
        let b = Rc::new(b);
        let late = Rc::new(RefCell::new(0usize));
        {
            let channel = Rc::downgrade(&b);
            let late = Rc::clone(&late);
            b.subscribe(Subscription::Message(Box::new(move |_| {
                if let Some(channel) = channel.upgrade() {
                    let late = Rc::clone(&late);
                    channel.subscribe(Subscription::Message(Box::new(move |_| {
                        *late.borrow_mut() += 1;
                        Ok(())
                    })));
                }
                Ok(())
            })));
        }

        a.send(Bytes::from_static(b"first")).unwrap();
        b.pump().unwrap();
        assert_eq!(*late.borrow(), 0);

        a.send(Bytes::from_static(b"second")).unwrap();
        b.pump().unwrap();
        assert_eq!(*late.borrow(), 1);
    }
}
