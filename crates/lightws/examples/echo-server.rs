//! Minimal greeting server: accepts one WebSocket client and answers every
//! `greet` event with a `greet-ack` event.
//!
//! Run with:
//!   cargo run --example echo-server --features websocket
//!
//! In another terminal:
//!   cargo run --features cli -- send ws://127.0.0.1:9001 greet \
//!     --json '{"name":"world"}' --wait greet-ack --wait-timeout 3s

use std::cell::RefCell;
use std::rc::Rc;

use lightws::frame::Payload;
use lightws::socket::{LightSocket, Listener};
use lightws::transport::{PumpStatus, WebSocketListener};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = WebSocketListener::bind("127.0.0.1:9001")?;
    eprintln!("Listening on ws://{}", listener.local_addr()?);

    let channel = listener.accept()?;
    eprintln!("Client connected: {}", channel.peer_addr()?);
    let socket = LightSocket::new(channel)?;

    let greeted: Rc<RefCell<Vec<Option<Payload>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&greeted);
    socket.on(
        "greet",
        &Listener::infallible(move |payload| sink.borrow_mut().push(payload.cloned())),
    );
    socket.set_onerror(|err| eprintln!("socket error: {err}"));

    loop {
        let status = socket.channel().pump_one()?;
        for payload in greeted.borrow_mut().drain(..) {
            let name = payload
                .as_ref()
                .and_then(Payload::as_json)
                .and_then(|value| value.get("name"))
                .and_then(|name| name.as_str())
                .unwrap_or("stranger")
                .to_string();
            eprintln!("Greeting {name}");
            socket.emit_json("greet-ack", &json!({ "hello": name }))?;
        }
        if status == PumpStatus::Closed {
            eprintln!("Client disconnected");
            break;
        }
    }

    Ok(())
}
