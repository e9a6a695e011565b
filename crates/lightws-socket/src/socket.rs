use std::any::Any;
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use lightws_frame::{decode_with_config, encode_with_config, Payload};
use lightws_transport::{
    BinaryType, ErrorHandler, HandlerError, MessageEvent, MessageHandler, RawChannel,
    Subscription, TransportError,
};
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::SocketConfig;
use crate::error::{ErrorEvent, Result, SocketError};
use crate::listener::Listener;
use crate::registry::ListenerRegistry;

type MessageObserver = Box<dyn FnMut(&MessageEvent)>;
type ErrorObserver = Box<dyn FnMut(ErrorEvent<'_>)>;

/// How the socket attached itself to its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Through the channel's subscribe method.
    Subscribe,
    /// Through the channel's `onmessage`/`onerror` slots.
    HandlerSlots,
}

struct Inner<C> {
    channel: C,
    registry: RefCell<ListenerRegistry>,
    onmessage: RefCell<Option<MessageObserver>>,
    onerror: RefCell<Option<ErrorObserver>>,
    config: SocketConfig,
}

/// Event emitter bound to one raw channel.
///
/// Owns message and error dispatch for the channel from construction on.
/// All calls, including dispatch, happen on the thread that drives the
/// channel; the socket is deliberately not `Send`.
pub struct LightSocket<C: RawChannel + 'static> {
    inner: Rc<Inner<C>>,
    binding: Binding,
}

impl<C: RawChannel + 'static> LightSocket<C> {
    /// Bind a socket to `channel` with default configuration.
    pub fn new(channel: C) -> Result<Self> {
        Self::with_config(channel, SocketConfig::default())
    }

    /// Bind a socket to `channel` with explicit configuration.
    pub fn with_config(channel: C, config: SocketConfig) -> Result<Self> {
        let inner = Rc::new(Inner {
            channel,
            registry: RefCell::new(ListenerRegistry::with_policy(config.duplicate_policy)),
            onmessage: RefCell::new(None),
            onerror: RefCell::new(None),
            config,
        });
        let binding = bind(&inner)?;
        Ok(Self { inner, binding })
    }

    /// Emit an event with a payload.
    pub fn emit(&self, event: &str, payload: impl Into<Payload>) -> Result<()> {
        self.send(event, Some(&payload.into()))
    }

    /// Emit an event with any serializable payload, sent as JSON.
    pub fn emit_json<T: Serialize + ?Sized>(&self, event: &str, payload: &T) -> Result<()> {
        let payload = Payload::to_json(payload)?;
        self.send(event, Some(&payload))
    }

    /// Emit an event without a payload.
    pub fn emit_empty(&self, event: &str) -> Result<()> {
        self.send(event, None)
    }

    /// Encode and write one frame to the channel.
    ///
    /// Returns once the channel accepted the write. Channel failures are
    /// returned unchanged and never retried.
    pub fn send(&self, event: &str, payload: Option<&Payload>) -> Result<()> {
        let frame = encode_with_config(event, payload, &self.inner.config.frame)?;
        trace!(event, size = frame.len(), "emitting frame");
        self.inner.channel.send(frame)?;
        Ok(())
    }

    /// Register `listener` for `event`.
    pub fn on(&self, event: &str, listener: &Listener) {
        let added = self
            .inner
            .registry
            .borrow_mut()
            .add(event, listener.clone());
        if !added {
            trace!(event, "listener already registered");
        }
    }

    /// Remove the first registration of `listener` for `event`, if any.
    pub fn off(&self, event: &str, listener: &Listener) {
        self.inner.registry.borrow_mut().remove(event, listener);
    }

    /// Close the underlying channel and drop all listeners.
    pub fn close(&self) -> Result<()> {
        self.inner.channel.close()?;
        self.inner.registry.borrow_mut().clear();
        debug!("socket closed");
        Ok(())
    }

    /// Observe every inbound message after listener dispatch.
    ///
    /// Replaces any previous observer.
    pub fn set_onmessage<F>(&self, observer: F)
    where
        F: FnMut(&MessageEvent) + 'static,
    {
        *self.inner.onmessage.borrow_mut() = Some(Box::new(observer));
    }

    pub fn clear_onmessage(&self) {
        self.inner.onmessage.borrow_mut().take();
    }

    /// Observe channel errors and dispatch failures.
    ///
    /// Replaces any previous observer. Without an observer, channel errors
    /// are ignored.
    pub fn set_onerror<F>(&self, observer: F)
    where
        F: FnMut(ErrorEvent<'_>) + 'static,
    {
        *self.inner.onerror.borrow_mut() = Some(Box::new(observer));
    }

    pub fn clear_onerror(&self) {
        self.inner.onerror.borrow_mut().take();
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.registry.borrow().len(event)
    }

    /// Event names with at least one listener, sorted.
    pub fn events(&self) -> Vec<String> {
        self.inner.registry.borrow().events()
    }

    /// The bound channel.
    pub fn channel(&self) -> &C {
        &self.inner.channel
    }

    /// How the socket attached to its channel.
    pub fn binding(&self) -> Binding {
        self.binding
    }

    pub fn config(&self) -> &SocketConfig {
        &self.inner.config
    }
}

impl<C: RawChannel + 'static> std::fmt::Debug for LightSocket<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightSocket")
            .field("binding", &self.binding)
            .field("events", &self.events())
            .finish()
    }
}

/// Attach dispatch handlers to the channel, preferring subscribe style.
fn bind<C: RawChannel + 'static>(inner: &Rc<Inner<C>>) -> Result<Binding> {
    let on_message: MessageHandler = {
        let weak: Weak<Inner<C>> = Rc::downgrade(inner);
        Box::new(move |event: MessageEvent| match weak.upgrade() {
            Some(inner) => inner.dispatch(event),
            None => Ok(()),
        })
    };
    let on_error: ErrorHandler = {
        let weak: Weak<Inner<C>> = Rc::downgrade(inner);
        Box::new(move |err: &TransportError| {
            if let Some(inner) = weak.upgrade() {
                inner.channel_error(err);
            }
        })
    };

    let binding = if let Some(subscriber) = inner.channel.subscriber() {
        subscriber.subscribe(Subscription::Message(on_message));
        subscriber.subscribe(Subscription::Error(on_error));
        Binding::Subscribe
    } else if let Some(slots) = inner.channel.handler_slots() {
        slots.set_onmessage(on_message);
        slots.set_onerror(on_error);
        Binding::HandlerSlots
    } else {
        return Err(SocketError::Unbindable);
    };

    if !inner.channel.set_binary_type(BinaryType::Binary) {
        debug!("channel does not support binary type selection");
    }
    debug!(?binding, "socket bound to channel");
    Ok(binding)
}

impl<C> Inner<C> {
    fn dispatch(&self, event: MessageEvent) -> std::result::Result<(), HandlerError> {
        let message = match decode_with_config(&event, &self.config.frame) {
            Ok(message) => message,
            Err(err) => {
                debug!(
                    error = %err,
                    size = event.data.len(),
                    "inbound message is not a valid frame"
                );
                let err = SocketError::Decode(err);
                self.report(ErrorEvent::Dispatch(&err));
                return Err(Box::new(err));
            }
        };

        // Registry changes made by listeners apply from the next message on.
        let listeners = self.registry.borrow().snapshot(&message.event);
        if listeners.is_empty() {
            trace!(event = %message.event, "no listeners for event");
        }
        for listener in &listeners {
            if let Some(err) = self.invoke(listener, &message.event, message.payload.as_ref()) {
                debug!(event = %message.event, error = %err, "listener failed");
                self.report(ErrorEvent::Dispatch(&err));
            }
        }

        let observer = self.onmessage.borrow_mut().take();
        if let Some(mut observer) = observer {
            observer(&event);
            let mut slot = self.onmessage.borrow_mut();
            if slot.is_none() {
                *slot = Some(observer);
            }
        }
        Ok(())
    }

    fn invoke(
        &self,
        listener: &Listener,
        event: &str,
        payload: Option<&Payload>,
    ) -> Option<SocketError> {
        let outcome = if self.config.catch_listener_panics {
            match catch_unwind(AssertUnwindSafe(|| listener.call(payload))) {
                Ok(outcome) => outcome,
                Err(panic) => {
                    return Some(SocketError::ListenerPanicked {
                        event: event.to_string(),
                        message: panic_message(panic.as_ref()),
                    })
                }
            }
        } else {
            listener.call(payload)
        };

        outcome.err().map(|source| SocketError::Listener {
            event: event.to_string(),
            source,
        })
    }

    fn channel_error(&self, err: &TransportError) {
        debug!(error = %err, "channel reported an error");
        self.report(ErrorEvent::Channel(err));
    }

    fn report(&self, event: ErrorEvent<'_>) {
        let observer = self.onerror.borrow_mut().take();
        let Some(mut observer) = observer else {
            return;
        };
        observer(event);
        let mut slot = self.onerror.borrow_mut();
        if slot.is_none() {
            *slot = Some(observer);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
