use std::time::Duration;

use mavtcp_frame::{Frame, Version};
use mavtcp_link::{Role, TcpConnection};
use tracing::info;

use crate::cmd::{parse_url, SendArgs, Session};
use crate::exit::{link_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};

/// HEARTBEAT from a ground control station: MAV_TYPE_GCS, MAV_AUTOPILOT_INVALID,
/// MAVLink version 3.
const GCS_HEARTBEAT: [u8; 9] = [0, 0, 0, 0, 6, 8, 0, 0, 3];

pub fn run(args: SendArgs, session: Session) -> CliResult<i32> {
    let url = parse_url(&args.url)?;
    if url.role != Role::Client {
        return Err(CliError::usage(format!(
            "send needs a client url (tcp://), got {url}"
        )));
    }
    let timeout = parse_duration(&args.timeout)?;
    let payload = resolve_payload(&args)?;

    let mut config = session.link_config();
    if let Some(ids) = url.ids {
        config.identity = ids;
    }
    let conn = TcpConnection::connect(&url.host, url.port, config)
        .map_err(|err| link_error("connect failed", err))?;

    let version = if args.v2 { Version::V2 } else { Version::V1 };
    let frame = Frame::new(version, args.msgid, payload);
    for _ in 0..args.repeat {
        conn.send_frame(&frame)
            .map_err(|err| link_error("send failed", err))?;
    }

    let drained = conn.wait_drained(timeout);
    conn.close();
    if !drained {
        return Err(CliError::new(
            TIMEOUT,
            format!("frames not written within {timeout:?}"),
        ));
    }

    info!(%url, msgid = args.msgid, frames = args.repeat, "sent");
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if args.msgid == 0 {
        return Ok(GCS_HEARTBEAT.to_vec());
    }
    Ok(Vec::new())
}

fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let digits: String = trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(&digits).map_err(|err| CliError::usage(format!("--hex {input:?}: {err}")))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
