use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use lightws_frame::{encoded_len, Message, Payload};
use lightws_socket::{LightSocket, Listener};
use lightws_transport::{connect, PumpStatus, WebSocketChannel};

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{
    encode_error, socket_error, transport_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT,
};
use crate::output::{print_message, OutputFormat};

type Reply = Rc<RefCell<Option<Option<Payload>>>>;

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = args.payload.resolve()?;

    let channel = connect(&args.url).map_err(|err| transport_error("connect failed", err))?;
    let peer = channel
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| args.url.clone());
    let socket = LightSocket::new(channel).map_err(|err| socket_error("bind failed", err))?;
    socket.set_onerror(|err| tracing::warn!(error = %err, "socket error"));

    // Register before emitting so a fast reply is not missed.
    let reply: Reply = Rc::new(RefCell::new(None));
    if let Some(event) = &args.wait {
        let slot = Rc::clone(&reply);
        let listener = Listener::infallible(move |payload| {
            slot.borrow_mut().get_or_insert_with(|| payload.cloned());
        });
        socket.on(event, &listener);
    }

    socket
        .send(&args.event, payload.as_ref())
        .map_err(|err| socket_error("send failed", err))?;
    tracing::info!(event = %args.event, %peer, "event sent");

    if let Some(event) = &args.wait {
        let payload = wait_for_reply(&socket, &reply, wait_timeout)?;
        let size = encoded_len(event, payload.as_ref())
            .map_err(|err| encode_error("reply size", err))?;
        let message = Message::new(event.clone(), payload);
        print_message(&message, size, Some(&peer), format);
    }

    if let Err(err) = socket.close() {
        tracing::debug!(error = %err, "close after send failed");
    }
    Ok(SUCCESS)
}

fn wait_for_reply(
    socket: &LightSocket<WebSocketChannel<std::net::TcpStream>>,
    reply: &Reply,
    timeout: Duration,
) -> CliResult<Option<Payload>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(payload) = reply.borrow_mut().take() {
            return Ok(payload);
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(CliError::new(
                TIMEOUT,
                format!("no reply within {}ms", timeout.as_millis()),
            ));
        }
        socket
            .channel()
            .set_read_timeout(Some(remaining))
            .map_err(|err| transport_error("set read timeout failed", err))?;
        match socket
            .channel()
            .pump_one()
            .map_err(|err| transport_error("receive failed", err))?
        {
            PumpStatus::Delivered | PumpStatus::Idle => {}
            PumpStatus::Closed => {
                return Err(CliError::new(FAILURE, "connection closed before reply"));
            }
        }
    }
}
