use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use std::io::ErrorKind;
use std::net::TcpStream;
use std::thread;

use clap::{Args, Subcommand};
use lightws_frame::Payload;
use lightws_transport::{TransportError, WebSocketChannel, WebSocketListener};

use crate::exit::{io_error, transport_error, CliError, CliResult, DATA_INVALID, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod echo;
pub mod encode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one event into a frame.
    Encode(EncodeArgs),
    /// Decode one frame and print its event and payload.
    Decode(DecodeArgs),
    /// Connect to a WebSocket server and emit one event.
    Send(SendArgs),
    /// Accept WebSocket connections and print received events.
    Listen(ListenArgs),
    /// Accept WebSocket connections and re-emit every event to its sender.
    Echo(EchoArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args),
        Command::Decode(args) => decode::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Echo(args) => echo::run(args),
        Command::Version(args) => version::run(args),
    }
}

/// Payload source shared by `encode` and `send`. At most one may be given.
#[derive(Args, Debug, Default)]
pub struct PayloadArgs {
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Text payload, sent verbatim.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read a text payload from a file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    /// Resolve the payload; `None` means the frame carries no payload.
    pub fn resolve(&self) -> CliResult<Option<Payload>> {
        if let Some(json) = &self.json {
            let value = serde_json::from_str(json)
                .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
            return Ok(Some(Payload::Json(value)));
        }
        if let Some(data) = &self.data {
            return Ok(Some(Payload::Text(data.clone())));
        }
        if let Some(path) = &self.file {
            let bytes = fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
            let text = String::from_utf8(bytes).map_err(|err| {
                CliError::new(
                    DATA_INVALID,
                    format!("{} is not valid UTF-8: {err}", path.display()),
                )
            })?;
            return Ok(Some(Payload::Text(text)));
        }
        Ok(None)
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Event name.
    pub event: String,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Print the frame as lowercase hex instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// File holding one frame. Reads stdin when omitted.
    pub file: Option<PathBuf>,
    /// Input is hex text rather than raw bytes.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Server URL (ws:// only).
    #[arg(env = "LIGHTWS_URL")]
    pub url: String,
    /// Event name.
    pub event: String,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Wait for one event with this name and print it.
    #[arg(long, value_name = "EVENT")]
    pub wait: Option<String>,
    /// Maximum time to wait when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// TCP port to listen on.
    pub port: u16,
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1", env = "LIGHTWS_HOST")]
    pub host: String,
    /// Only print these events (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub events: Option<Vec<String>>,
    /// Exit after printing N events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// TCP port to listen on.
    pub port: u16,
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1", env = "LIGHTWS_HOST")]
    pub host: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// How long a server loop blocks on one read before checking for Ctrl-C.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Bind a non-blocking WebSocket listener for the server commands.
pub fn bind_listener(host: &str, port: u16) -> CliResult<WebSocketListener> {
    let listener = WebSocketListener::bind((host, port))
        .map_err(|err| transport_error("bind failed", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| transport_error("bind failed", err))?;
    Ok(listener)
}

/// Wait for the next client, checking the Ctrl-C flag every [`POLL_INTERVAL`].
///
/// Returns `None` once `running` is cleared. Clients that fail the WebSocket
/// handshake are logged and skipped.
pub fn accept_next(
    listener: &WebSocketListener,
    running: &AtomicBool,
) -> CliResult<Option<WebSocketChannel<TcpStream>>> {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok(channel) => {
                channel
                    .set_read_timeout(Some(POLL_INTERVAL))
                    .map_err(|err| transport_error("set read timeout failed", err))?;
                return Ok(Some(channel));
            }
            Err(TransportError::Io(err)) if err.kind() == ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
            }
            Err(TransportError::Handshake(reason)) => {
                tracing::warn!(%reason, "rejected connection");
            }
            Err(err) => return Err(transport_error("accept failed", err)),
        }
    }
    Ok(None)
}
