use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mavtcp_frame::{Frame, Identity, Version};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    /// Tables for a terminal, JSON lines for pipes.
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput {
    channel: u8,
    version: u8,
    msgid: u32,
    sysid: u8,
    compid: u8,
    seq: u8,
    len: usize,
    signed: bool,
    payload: String,
    received_at_ms: u128,
}

/// Print one received frame. `channel` is the link it arrived on.
pub fn print_frame(frame: &Frame, source: Identity, channel: u8, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                channel,
                version: version_number(frame.version),
                msgid: frame.msgid,
                sysid: source.system_id,
                compid: source.component_id,
                seq: frame.seq,
                len: frame.payload.len(),
                signed: frame.is_signed(),
                payload: hex::encode(&frame.payload),
                received_at_ms: unix_millis(),
            };
            match serde_json::to_string(&out) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("error: frame not serializable: {err}"),
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CH", "VER", "MSGID", "FROM", "SEQ", "LEN", "PAYLOAD"])
                .add_row(vec![
                    channel.to_string(),
                    version_number(frame.version).to_string(),
                    frame.msgid.to_string(),
                    source.to_string(),
                    frame.seq.to_string(),
                    frame.payload.len().to_string(),
                    hex::encode(&frame.payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "ch={} v{} msgid={} from={} seq={} len={} payload={}",
                channel,
                version_number(frame.version),
                frame.msgid,
                source,
                frame.seq,
                frame.payload.len(),
                hex::encode(&frame.payload)
            );
        }
        OutputFormat::Raw => {
            // Re-encoded wire bytes, suitable for piping into another tool.
            if let Ok(bytes) = frame.to_bytes() {
                let mut stdout = std::io::stdout().lock();
                let _ = stdout.write_all(&bytes).and_then(|()| stdout.flush());
            }
        }
    }
}

pub fn version_number(version: Version) -> u8 {
    match version {
        Version::V1 => 1,
        Version::V2 => 2,
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis())
}
