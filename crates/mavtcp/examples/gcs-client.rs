//! Ground station client: connects to a server, sends a few heartbeats as
//! system 255 and prints every frame it gets back.
//!
//! Run `heartbeat-server` first, then:
//!   cargo run --example gcs-client -- tcp://127.0.0.1:5760

use std::time::Duration;

use mavtcp::frame::{Frame, Identity, Version};
use mavtcp::link::{open, ConnectionUrl, LinkEvent, ServerConfig};

const GCS_HEARTBEAT: [u8; 9] = [0, 0, 0, 0, 6, 8, 0, 0, 3];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url: ConnectionUrl = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "tcp://127.0.0.1:5760".to_string())
        .parse()?;

    let mut config = ServerConfig::default();
    config.link.identity = Identity::new(255, 190);
    let link = open(&url, config)?;
    let events = link.events().subscribe();
    eprintln!("Connected to {url} on channel {}", link.channel());

    let heartbeat = Frame::new(Version::V2, 0, GCS_HEARTBEAT.to_vec());
    for _ in 0..5 {
        link.send_frame(&heartbeat)?;
        match events.recv_timeout(Duration::from_secs(1)) {
            Ok(LinkEvent::Frame { frame, source }) => {
                eprintln!("msgid {} seq {} from {source}", frame.msgid, frame.seq);
            }
            Ok(LinkEvent::Closed) => {
                eprintln!("Server closed the connection");
                return Ok(());
            }
            Err(_) => eprintln!("No frame within 1s"),
        }
    }

    link.close();
    Ok(())
}
