use std::cell::RefCell;
use std::net::TcpStream;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lightws_frame::{decode, Message};
use lightws_socket::LightSocket;
use lightws_transport::{PumpStatus, TransportError, WebSocketChannel};

use crate::cmd::{accept_next, bind_listener, install_ctrlc_handler, ListenArgs};
use crate::exit::{socket_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

type Inbox = Rc<RefCell<Vec<(Message, usize)>>>;

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let listener = bind_listener(&args.host, args.port)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while let Some(channel) = accept_next(&listener, &running)? {
        let peer = channel
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let socket = LightSocket::new(channel).map_err(|err| socket_error("bind failed", err))?;
        let inbox = collect_messages(&socket);

        while running.load(Ordering::SeqCst) {
            let status = match socket.channel().pump_one() {
                Ok(status) => status,
                Err(TransportError::Handler(err)) => {
                    tracing::warn!(%peer, error = %err, "dropping malformed message");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(%peer, error = %err, "connection failed");
                    break;
                }
            };

            for (message, size) in inbox.borrow_mut().drain(..) {
                if !wanted(&args, &message.event) {
                    continue;
                }
                print_message(&message, size, Some(&peer), format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    let _ = socket.close();
                    return Ok(SUCCESS);
                }
            }

            if status == PumpStatus::Closed {
                tracing::info!(%peer, "peer disconnected");
                break;
            }
        }
    }

    Ok(SUCCESS)
}

fn collect_messages(socket: &LightSocket<WebSocketChannel<TcpStream>>) -> Inbox {
    let inbox: Inbox = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&inbox);
    // Frames that fail to decode were already reported by the socket.
    socket.set_onmessage(move |event| {
        if let Ok(message) = decode(event) {
            sink.borrow_mut().push((message, event.data.len()));
        }
    });
    socket.set_onerror(|err| tracing::debug!(error = %err, "socket error"));
    inbox
}

fn wanted(args: &ListenArgs, event: &str) -> bool {
    args.events
        .as_ref()
        .is_none_or(|events| events.iter().any(|name| name == event))
}
