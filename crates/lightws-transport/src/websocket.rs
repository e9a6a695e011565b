//! WebSocket channel backed by `tungstenite`.
//!
//! Opening connections is a convenience for tools and tests; the event layer
//! only sees the [`RawChannel`] side.

use std::cell::{Cell, RefCell};
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, trace};
use tungstenite::client::IntoClientRequest;
use tungstenite::protocol::Message as WsMessage;
use tungstenite::WebSocket;

use crate::error::{Result, TransportError};
use crate::message::{BinaryType, MessageData, MessageEvent};
use crate::traits::{ErrorHandler, HandlerSlots, MessageHandler, PumpStatus, RawChannel};

/// A WebSocket connection exposed as a raw channel.
///
/// Handlers are installed callback-attribute style, one per slot. The channel
/// is driven by [`WebSocketChannel::pump_one`], which reads one WebSocket
/// message and hands data messages to the `onmessage` slot.
pub struct WebSocketChannel<S> {
    socket: RefCell<WebSocket<S>>,
    onmessage: RefCell<Option<MessageHandler>>,
    onerror: RefCell<Option<ErrorHandler>>,
    binary_type: Cell<BinaryType>,
    dispatching: Cell<bool>,
}

impl<S: Read + Write> WebSocketChannel<S> {
    /// Wrap an established WebSocket.
    pub fn new(socket: WebSocket<S>) -> Self {
        Self {
            socket: RefCell::new(socket),
            onmessage: RefCell::new(None),
            onerror: RefCell::new(None),
            binary_type: Cell::new(BinaryType::Binary),
            dispatching: Cell::new(false),
        }
    }

    /// Read one WebSocket message and deliver it if it carries data.
    ///
    /// Must not be called from inside the `onmessage` handler: the handler is
    /// out of its slot while it runs, so a nested call fails with
    /// [`TransportError::Reentrant`].
    ///
    /// Ping, pong and close frames are consumed and reported as
    /// [`PumpStatus::Idle`]; tungstenite answers pings and close requests on
    /// the next write or read. Read timeouts are also reported as idle.
    /// Other read errors go to the `onerror` slot and are returned.
    pub fn pump_one(&self) -> Result<PumpStatus> {
        if self.dispatching.get() {
            return Err(TransportError::Reentrant);
        }
        let read = self.socket.borrow_mut().read();
        match read {
            Ok(WsMessage::Binary(data)) => {
                self.deliver(MessageData::Binary(Bytes::from(data)))?;
                Ok(PumpStatus::Delivered)
            }
            Ok(WsMessage::Text(text)) => {
                self.deliver(MessageData::Text(text))?;
                Ok(PumpStatus::Delivered)
            }
            Ok(WsMessage::Close(frame)) => {
                debug!(?frame, "peer requested close");
                Ok(PumpStatus::Idle)
            }
            Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_)) => {
                Ok(PumpStatus::Idle)
            }
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(PumpStatus::Closed)
            }
            Err(tungstenite::Error::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                Ok(PumpStatus::Idle)
            }
            Err(err) => {
                let err = TransportError::from(err);
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Pump until the connection closes.
    ///
    /// Returns the number of delivered messages. Stops early on the first
    /// error, including handler failures.
    pub fn run(&self) -> Result<usize> {
        let mut delivered = 0usize;
        loop {
            match self.pump_one()? {
                PumpStatus::Delivered => delivered += 1,
                PumpStatus::Idle => {}
                PumpStatus::Closed => return Ok(delivered),
            }
        }
    }

    /// Whether the connection can still read and write.
    pub fn is_open(&self) -> bool {
        let socket = self.socket.borrow();
        socket.can_read() && socket.can_write()
    }

    fn deliver(&self, data: MessageData) -> Result<()> {
        let data = self.binary_type.get().apply(data);
        let handler = self.onmessage.borrow_mut().take();
        let Some(mut handler) = handler else {
            trace!(size = data.len(), "no onmessage handler; dropping message");
            return Ok(());
        };

        self.dispatching.set(true);
        let result = handler(MessageEvent::new(data));
        self.dispatching.set(false);

        // Keep a handler installed during the call if it replaced itself.
        let mut slot = self.onmessage.borrow_mut();
        if slot.is_none() {
            *slot = Some(handler);
        }
        result.map_err(TransportError::Handler)
    }

    fn report(&self, err: &TransportError) {
        let handler = self.onerror.borrow_mut().take();
        let Some(mut handler) = handler else {
            trace!(error = %err, "no onerror handler; dropping channel error");
            return;
        };
        handler(err);
        let mut slot = self.onerror.borrow_mut();
        if slot.is_none() {
            *slot = Some(handler);
        }
    }
}

impl WebSocketChannel<TcpStream> {
    /// Set the read timeout on the underlying TCP stream.
    ///
    /// With a timeout set, [`WebSocketChannel::pump_one`] returns
    /// [`PumpStatus::Idle`] when no data arrives in time.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.socket
            .borrow()
            .get_ref()
            .set_read_timeout(timeout)
            .map_err(Into::into)
    }

    /// Address of the remote peer.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.socket.borrow().get_ref().peer_addr().map_err(Into::into)
    }
}

impl<S: Read + Write> RawChannel for WebSocketChannel<S> {
    fn send(&self, data: Bytes) -> Result<()> {
        trace!(size = data.len(), "sending binary websocket message");
        self.socket
            .borrow_mut()
            .send(WsMessage::Binary(data.to_vec()))
            .map_err(Into::into)
    }

    fn close(&self) -> Result<()> {
        let mut socket = self.socket.borrow_mut();
        socket.close(None)?;
        // The close frame may already be flushed; a closed stream is fine here.
        let _ = socket.flush();
        debug!("websocket close requested");
        Ok(())
    }

    fn set_binary_type(&self, binary_type: BinaryType) -> bool {
        self.binary_type.set(binary_type);
        true
    }

    fn handler_slots(&self) -> Option<&dyn HandlerSlots> {
        Some(self)
    }
}

impl<S: Read + Write> HandlerSlots for WebSocketChannel<S> {
    fn set_onmessage(&self, handler: MessageHandler) {
        *self.onmessage.borrow_mut() = Some(handler);
    }

    fn set_onerror(&self, handler: ErrorHandler) {
        *self.onerror.borrow_mut() = Some(handler);
    }
}

impl<S> std::fmt::Debug for WebSocketChannel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketChannel")
            .field("binary_type", &self.binary_type.get())
            .field("onmessage", &self.onmessage.borrow().is_some())
            .field("onerror", &self.onerror.borrow().is_some())
            .finish()
    }
}

/// Open a plain `ws://` connection (blocking).
pub fn connect(url: &str) -> Result<WebSocketChannel<TcpStream>> {
    let request = url.into_client_request()?;
    let uri = request.uri();
    if uri.scheme_str() != Some("ws") {
        return Err(TransportError::Handshake(format!(
            "unsupported url scheme in {url} (only ws:// is supported)"
        )));
    }
    let host = uri
        .host()
        .ok_or_else(|| TransportError::Handshake(format!("missing host in {url}")))?
        .to_string();
    let port = uri.port_u16().unwrap_or(80);

    let stream = TcpStream::connect((host.as_str(), port))?;
    let _ = stream.set_nodelay(true);

    let (socket, _response) = tungstenite::client(request, stream)
        .map_err(|err| TransportError::Handshake(err.to_string()))?;
    debug!(%url, "connected to websocket");
    Ok(WebSocketChannel::new(socket))
}

/// Accepts WebSocket connections on a TCP port.
pub struct WebSocketListener {
    listener: TcpListener,
}

impl WebSocketListener {
    /// Bind and listen on a TCP address.
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        info!(addr = ?listener.local_addr().ok(), "listening for websocket connections");
        Ok(Self { listener })
    }

    /// Accept the next connection and perform the server handshake.
    ///
    /// On a non-blocking listener this returns an `Io` error of kind
    /// `WouldBlock` when no client is waiting. The accepted stream is always
    /// blocking, whatever the listener mode.
    pub fn accept(&self) -> Result<WebSocketChannel<TcpStream>> {
        let (stream, addr) = self.listener.accept()?;
        stream.set_nonblocking(false)?;
        let _ = stream.set_nodelay(true);
        let socket = tungstenite::accept(stream)
            .map_err(|err| TransportError::Handshake(err.to_string()))?;
        debug!(%addr, "accepted websocket connection");
        Ok(WebSocketChannel::new(socket))
    }

    /// Set non-blocking mode on the listener.
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        self.listener.set_nonblocking(nonblocking).map_err(Into::into)
    }

    /// The local address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr().map_err(Into::into)
    }
}
