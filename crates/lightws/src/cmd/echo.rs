use std::cell::RefCell;
use std::net::TcpStream;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lightws_frame::{decode, Message};
use lightws_socket::LightSocket;
use lightws_transport::{PumpStatus, TransportError, WebSocketChannel};

use crate::cmd::{accept_next, bind_listener, install_ctrlc_handler, EchoArgs};
use crate::exit::{socket_error, CliResult, SUCCESS};

pub fn run(args: EchoArgs) -> CliResult<i32> {
    let listener = bind_listener(&args.host, args.port)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while let Some(channel) = accept_next(&listener, &running)? {
        let socket = LightSocket::new(channel).map_err(|err| socket_error("bind failed", err))?;

        serve(&socket, &running);
    }

    Ok(SUCCESS)
}

/// Echo events on one connection until it closes or Ctrl-C is pressed.
fn serve(socket: &LightSocket<WebSocketChannel<TcpStream>>, running: &AtomicBool) {
    // Replies are sent from the loop, not from inside dispatch.
    let pending: Rc<RefCell<Vec<Message>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&pending);
    socket.set_onmessage(move |event| {
        if let Ok(message) = decode(event) {
            sink.borrow_mut().push(message);
        }
    });
    socket.set_onerror(|err| tracing::debug!(error = %err, "socket error"));

    while running.load(Ordering::SeqCst) {
        let status = match socket.channel().pump_one() {
            Ok(status) => status,
            Err(TransportError::Handler(err)) => {
                tracing::warn!(error = %err, "dropping malformed message");
                continue;
            }
            Err(err) => {
                tracing::warn!(error = %err, "connection failed");
                return;
            }
        };

        let replies: Vec<Message> = pending.borrow_mut().drain(..).collect();
        for message in replies {
            tracing::info!(
                event = %message.event,
                kind = message.payload.as_ref().map_or("none", |p| p.kind()),
                "echoing event"
            );
            if let Err(err) = socket.send(&message.event, message.payload.as_ref()) {
                tracing::warn!(error = %err, "echo send failed");
                return;
            }
        }

        if status == PumpStatus::Closed {
            tracing::info!("peer disconnected");
            return;
        }
    }
}
