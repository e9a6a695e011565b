use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use lightws_frame::{Message, Payload};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    event: &'a str,
    payload_kind: &'a str,
    payload: Option<&'a Payload>,
    frame_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    peer: Option<&'a str>,
    timestamp: String,
}

/// Print one decoded message. `peer` is omitted for offline decoding.
pub fn print_message(message: &Message, frame_size: usize, peer: Option<&str>, format: OutputFormat) {
    let kind = payload_kind(message.payload.as_ref());
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                event: &message.event,
                payload_kind: kind,
                payload: message.payload.as_ref(),
                frame_size,
                peer,
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EVENT", "KIND", "SIZE", "PEER", "PAYLOAD"])
                .add_row(vec![
                    message.event.clone(),
                    kind.to_string(),
                    frame_size.to_string(),
                    peer.unwrap_or("-").to_string(),
                    payload_preview(message.payload.as_ref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "event={} kind={} size={} peer={} payload={}",
                message.event,
                kind,
                frame_size,
                peer.unwrap_or("-"),
                payload_preview(message.payload.as_ref())
            );
        }
        OutputFormat::Raw => {
            if let Some(payload) = &message.payload {
                match payload.wire_bytes() {
                    Ok(bytes) => print_raw(&bytes),
                    Err(err) => tracing::warn!(error = %err, "payload could not be written"),
                }
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn payload_kind(payload: Option<&Payload>) -> &'static str {
    payload.map_or("none", Payload::kind)
}

fn payload_preview(payload: Option<&Payload>) -> String {
    match payload {
        None => "<none>".to_string(),
        Some(Payload::Text(text)) => text.clone(),
        Some(Payload::Json(Value::String(text))) => format!("{text:?}"),
        Some(Payload::Json(value)) => value.to_string(),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
