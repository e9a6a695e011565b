#![cfg(feature = "websocket")]

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use lightws_transport::{
    connect, HandlerSlots, MessageData, PumpStatus, RawChannel, TransportError, WebSocketListener,
};

#[test]
fn binary_message_roundtrip_over_websocket() {
    let listener = WebSocketListener::bind("127.0.0.1:0").expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");

    let server = thread::spawn(move || {
        let channel = listener.accept().expect("listener should accept");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        channel.set_onmessage(Box::new(move |event| {
            sink.borrow_mut().push(event.data);
            Ok(())
        }));

        while channel.pump_one().expect("pump should succeed") != PumpStatus::Delivered {}
        channel
            .send(Bytes::from_static(b"pong"))
            .expect("reply should send");
        let seen = seen.borrow().clone();
        seen
    });

    let client = connect(&format!("ws://{addr}")).expect("client should connect");
    let replies = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&replies);
    client.set_onmessage(Box::new(move |event| {
        sink.borrow_mut().push(event.data);
        Ok(())
    }));

    client
        .send(Bytes::from_static(b"ping"))
        .expect("client should send");
    while client.pump_one().expect("pump should succeed") != PumpStatus::Delivered {}

    let received = server.join().expect("server thread should finish");
    assert_eq!(
        received,
        vec![MessageData::Binary(Bytes::from_static(b"ping"))]
    );
    assert_eq!(
        *replies.borrow(),
        vec![MessageData::Binary(Bytes::from_static(b"pong"))]
    );
}

#[test]
fn run_returns_after_peer_closes() {
    let listener = WebSocketListener::bind("127.0.0.1:0").expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");

    let server = thread::spawn(move || {
        let channel = listener.accept().expect("listener should accept");
        channel.set_onmessage(Box::new(|_| Ok(())));
        channel.run().expect("run should end cleanly")
    });

    let client = connect(&format!("ws://{addr}")).expect("client should connect");
    client.send(Bytes::from_static(b"a")).expect("send a");
    client.send(Bytes::from_static(b"b")).expect("send b");
    client.close().expect("close should succeed");
    client.set_read_timeout(Some(Duration::from_secs(2))).expect("timeout");
    // Drain the server's close reply.
    let _ = client.pump_one();

    assert_eq!(server.join().expect("server thread should finish"), 2);
}

#[test]
fn connect_rejects_non_ws_scheme() {
    let err = connect("wss://127.0.0.1:9").unwrap_err();
    assert!(matches!(err, TransportError::Handshake(_)));
}

#[test]
fn connect_refused_is_io_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = connect(&format!("ws://{addr}")).unwrap_err();
    assert!(matches!(err, TransportError::Io(_)));
}

#[test]
fn nonblocking_listener_polls_then_accepts_blocking_stream() {
    let listener = WebSocketListener::bind("127.0.0.1:0").expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");
    listener
        .set_nonblocking(true)
        .expect("listener should switch to non-blocking");

    let err = listener.accept().unwrap_err();
    assert!(
        matches!(&err, TransportError::Io(io) if io.kind() == std::io::ErrorKind::WouldBlock),
        "unexpected error: {err}"
    );

    let client = thread::spawn(move || {
        let client = connect(&format!("ws://{addr}")).expect("client should connect");
        client
            .send(Bytes::from_static(b"hello"))
            .expect("client should send");
        client.close().expect("close should succeed");
        let _ = client.pump_one();
    });

    let channel = loop {
        match listener.accept() {
            Ok(channel) => break channel,
            Err(TransportError::Io(io)) if io.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(err) => panic!("accept failed: {err}"),
        }
    };
    channel.set_onmessage(Box::new(|_| Ok(())));
    // A non-blocking stream would fail the read with WouldBlock and report idle.
    assert_eq!(channel.run().expect("run should end cleanly"), 1);
    client.join().expect("client thread should finish");
}

#[test]
fn pump_from_inside_handler_is_rejected() {
    let listener = WebSocketListener::bind("127.0.0.1:0").expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an address");

    let server = thread::spawn(move || {
        let channel = listener.accept().expect("listener should accept");
        channel.send(Bytes::from_static(b"one")).expect("send one");
        channel.send(Bytes::from_static(b"two")).expect("send two");
        channel.set_onmessage(Box::new(|_| Ok(())));
        channel.run().expect("run should end cleanly")
    });

    let client = Rc::new(connect(&format!("ws://{addr}")).expect("client should connect"));
    client
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("timeout");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let nested = Rc::new(RefCell::new(Vec::new()));
    {
        let weak = Rc::downgrade(&client);
        let seen = Rc::clone(&seen);
        let nested = Rc::clone(&nested);
        client.set_onmessage(Box::new(move |event| {
            seen.borrow_mut().push(event.data);
            if let Some(client) = weak.upgrade() {
                nested.borrow_mut().push(client.pump_one());
            }
            Ok(())
        }));
    }

    while seen.borrow().len() < 2 {
        client.pump_one().expect("pump should succeed");
    }
    assert_eq!(
        *seen.borrow(),
        vec![
            MessageData::Binary(Bytes::from_static(b"one")),
            MessageData::Binary(Bytes::from_static(b"two")),
        ]
    );
    assert!(nested
        .borrow()
        .iter()
        .all(|result| matches!(result, Err(TransportError::Reentrant))));

    client.close().expect("close should succeed");
    let _ = client.pump_one();
    assert_eq!(server.join().expect("server thread should finish"), 0);
}
