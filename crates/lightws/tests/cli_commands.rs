#![cfg(feature = "cli")]

use std::io::Write;
use std::net::TcpListener;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn lightws() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_lightws"));
    cmd.arg("--log-level").arg("off");
    cmd
}

fn run_with_stdin(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = lightws()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("command should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(stdin)
        .expect("stdin should be writable");
    child.wait_with_output().expect("command should finish")
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("ephemeral port should be available")
}

struct KillOnDrop(Child);

impl Drop for KillOnDrop {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

#[test]
fn encode_hex_matches_wire_layout() {
    let output = lightws()
        .args(["encode", "hi", "--data", "ok", "--hex"])
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "000000026869000000026f6b"
    );
}

#[test]
fn encode_without_payload_writes_sentinel() {
    let output = lightws()
        .args(["encode", "ping", "--hex"])
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "0000000470696e67ffffffff"
    );
}

#[test]
fn encode_rejects_empty_event() {
    let output = lightws()
        .args(["encode", "", "--hex"])
        .output()
        .expect("encode should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn raw_encode_output_decodes_from_stdin() {
    let encoded = lightws()
        .args(["encode", "obj-test", "--json", r#"{"a":1,"c":{"d":4}}"#])
        .output()
        .expect("encode should run");
    assert!(encoded.status.success());

    let decoded = run_with_stdin(&["--format", "json", "decode"], &encoded.stdout);
    assert!(decoded.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&decoded.stdout).expect("decode output should be JSON");
    assert_eq!(value["event"], "obj-test");
    assert_eq!(value["payload_kind"], "object");
    assert_eq!(value["payload"]["c"]["d"], 4);
    assert_eq!(value["frame_size"], encoded.stdout.len());
}

#[test]
fn decode_hex_reports_text_payload() {
    let decoded = run_with_stdin(
        &["--format", "json", "decode", "--hex"],
        b"00000002 6869 00000005 68656c6c6f\n",
    );
    assert!(decoded.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&decoded.stdout).expect("decode output should be JSON");
    assert_eq!(value["event"], "hi");
    assert_eq!(value["payload_kind"], "text");
    assert_eq!(value["payload"], "hello");
}

#[test]
fn decode_truncated_frame_is_data_invalid() {
    let decoded = run_with_stdin(&["decode", "--hex"], b"0000000a6869");
    assert_eq!(decoded.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&decoded.stderr).contains("truncated"));
}

#[test]
fn send_to_closed_port_fails() {
    let port = free_port();
    let output = lightws()
        .args(["send", &format!("ws://127.0.0.1:{port}"), "evt"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn send_rejects_secure_urls() {
    let output = lightws()
        .args(["send", "wss://127.0.0.1:1", "evt"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn send_waits_for_echoed_event() {
    let port = free_port();
    let _server = KillOnDrop(
        lightws()
            .args(["echo", &port.to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("echo should start"),
    );

    let url = format!("ws://127.0.0.1:{port}");
    let start = Instant::now();
    let output = loop {
        let output = lightws()
            .args([
                "--format",
                "json",
                "send",
                &url,
                "number-test",
                "--json",
                "4.4",
                "--wait",
                "number-test",
                "--wait-timeout",
                "3s",
            ])
            .output()
            .expect("send should run");
        if output.status.success() || start.elapsed() > Duration::from_secs(5) {
            break output;
        }
        thread::sleep(Duration::from_millis(50));
    };

    assert!(
        output.status.success(),
        "send failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("send output should be JSON");
    assert_eq!(value["event"], "number-test");
    assert_eq!(value["payload"], 4.4);
}

#[test]
fn version_prints_package_version() {
    let output = lightws().arg("version").output().expect("version should run");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("lightws {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn version_extended_reports_build_target() {
    let output = lightws()
        .args(["version", "--extended"])
        .output()
        .expect("version should run");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name: lightws"));
    assert!(stdout.lines().any(|line| line.starts_with("build_target: ")));
    assert!(stdout.contains("no_payload=0xffffffff"));
}

#[cfg(unix)]
#[test]
fn listen_exits_on_interrupt_without_clients() {
    let port = free_port();
    let mut server = KillOnDrop(
        lightws()
            .args(["listen", &port.to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("listen should start"),
    );

    // Wait until the port is taken without connecting a client.
    let start = Instant::now();
    while TcpListener::bind(("127.0.0.1", port)).is_ok() {
        assert!(start.elapsed() < Duration::from_secs(5), "listen never bound");
        thread::sleep(Duration::from_millis(25));
    }
    // The Ctrl-C handler is installed right after bind.
    thread::sleep(Duration::from_millis(200));

    let status = Command::new("kill")
        .args(["-INT", &server.0.id().to_string()])
        .status()
        .expect("kill should run");
    assert!(status.success());

    let start = Instant::now();
    let exit = loop {
        if let Some(exit) = server.0.try_wait().expect("child should be waitable") {
            break exit;
        }
        assert!(
            start.elapsed() < Duration::from_secs(5),
            "listen ignored Ctrl-C while waiting for a client"
        );
        thread::sleep(Duration::from_millis(25));
    };
    assert!(exit.success());
}
