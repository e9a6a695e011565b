//! Two sockets joined by an in-memory channel exchanging text, number and
//! object payloads.
//!
//! Run with:
//!   cargo run --example memory-pair

use lightws::socket::{LightSocket, Listener};
use lightws::transport::MemoryChannel;
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (left, right) = MemoryChannel::pair();
    let a = LightSocket::new(left)?;
    let b = LightSocket::new(right)?;

    for event in ["str-test", "number-test", "obj-test"] {
        let listener = Listener::infallible(move |payload| match payload {
            Some(payload) => println!("{event}: {} {payload:?}", payload.kind()),
            None => println!("{event}: no payload"),
        });
        b.on(event, &listener);
    }
    b.set_onmessage(|event| println!("  ({} byte frame)", event.data.len()));

    a.emit("str-test", "string data")?;
    a.emit_json("number-test", &4.4)?;
    a.emit_json(
        "obj-test",
        &json!({ "a": 1, "b": "test", "c": { "d": 4, "e": { "f": 1 } } }),
    )?;
    a.emit_empty("str-test")?;

    let delivered = b.channel().pump()?;
    println!("delivered {delivered} messages");

    a.close()?;
    Ok(())
}
