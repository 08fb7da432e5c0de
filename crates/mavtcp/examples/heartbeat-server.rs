//! Heartbeat server: accepts clients, prints what they send and broadcasts
//! a HEARTBEAT to all of them once a second.
//!
//! Run with:
//!   cargo run --example heartbeat-server
//!
//! In another terminal:
//!   cargo run --features cli -- --format pretty listen tcp://127.0.0.1:5760

use std::thread;
use std::time::Duration;

use mavtcp::frame::{Frame, Version};
use mavtcp::link::{ServerConfig, TcpServer};

/// MAV_TYPE_QUADROTOR, MAV_AUTOPILOT_GENERIC, MAV_STATE_ACTIVE.
const HEARTBEAT: [u8; 9] = [0, 0, 0, 0, 2, 0, 0, 4, 3];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server = TcpServer::bind("127.0.0.1", 5760, ServerConfig::default())?;
    eprintln!(
        "Listening on {} (channel {}, up to {} clients)",
        server.local_endpoint(),
        server.channel(),
        server.capacity()
    );

    server.events().on_frame(|frame, source| {
        eprintln!(
            "Received msgid {} ({} bytes) from {source}",
            frame.msgid,
            frame.payload.len()
        );
    });

    let heartbeat = Frame::new(Version::V1, 0, HEARTBEAT.to_vec());
    while server.is_open() {
        server.send_frame(&heartbeat)?;
        for client in server.clients() {
            eprintln!("  client channel {} at {}", client.channel, client.peer);
        }
        thread::sleep(Duration::from_secs(1));
    }

    Ok(())
}
