//! Reads frames from a server with tokio and the `MavCodec` decoder.
//!
//! Run `heartbeat-server` first, then:
//!   cargo run --example async-listen --features async

use futures_util::StreamExt;
use mavtcp::frame::MavCodec;
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:5760".to_string());
    let stream = TcpStream::connect(&addr).await?;
    eprintln!("Connected to {addr}");

    let mut frames = FramedRead::new(stream, MavCodec::new());
    let mut received = 0usize;
    while let Some(frame) = frames.next().await {
        let frame = frame?;
        received += 1;
        eprintln!(
            "{} msgid {} from {} seq {}",
            frame.version,
            frame.msgid,
            frame.identity(),
            frame.seq
        );
        if received == 10 {
            break;
        }
    }

    let stats = frames.decoder().stats();
    eprintln!(
        "{} frames, {} checksum errors, {} bytes skipped",
        stats.frames, stats.checksum_errors, stats.dropped_bytes
    );
    Ok(())
}
