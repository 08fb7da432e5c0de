#![allow(dead_code)]

use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mavtcp_frame::{crc, ChannelPool, Frame, FrameParser, Identity, Version};
use mavtcp_link::{LinkConfig, ServerConfig};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Poll `cond` until it holds or [`TIMEOUT`] elapses.
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Link config on a private channel pool so tests don't share slots.
pub fn link_config(identity: Identity) -> LinkConfig {
    LinkConfig::default()
        .with_identity(identity)
        .with_channel_pool(ChannelPool::new(16))
}

pub fn server_config(max_clients: usize) -> ServerConfig {
    ServerConfig::default()
        .with_link(link_config(Identity::new(1, 240)))
        .with_max_clients(max_clients)
}

/// HEARTBEAT (msgid 0) finalized for `identity`.
pub fn heartbeat(identity: Identity, seq: u8) -> Frame {
    let mut frame = Frame::new(Version::V1, 0, vec![0, 0, 0, 0, 2, 3, 81, 4, 3]);
    frame.finalize(identity, seq, crc::crc_extra);
    frame
}

/// Unfinalized HEARTBEAT payload, ready for `send_message`.
pub fn heartbeat_message(version: Version) -> Frame {
    Frame::new(version, 0, vec![0, 0, 0, 0, 2, 3, 81, 4, 3])
}

/// Read from a raw socket until `count` frames were parsed or the deadline.
pub fn read_frames(stream: &mut TcpStream, count: usize) -> Vec<Frame> {
    stream
        .set_read_timeout(Some(Duration::from_millis(100)))
        .unwrap();
    let deadline = Instant::now() + TIMEOUT;
    let mut parser = FrameParser::new();
    let mut frames = Vec::new();
    let mut buf = [0u8; 1024];
    while frames.len() < count && Instant::now() < deadline {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                parser.extend_from_slice(&buf[..n]);
                while let Some(frame) = parser.next_frame() {
                    frames.push(frame);
                }
            }
            Err(_) => continue,
        }
    }
    frames
}

/// True if the peer closes the socket (EOF or reset) before the deadline.
pub fn reads_eof(stream: &mut TcpStream) -> bool {
    stream
        .set_read_timeout(Some(Duration::from_millis(100)))
        .unwrap();
    let deadline = Instant::now() + TIMEOUT;
    let mut buf = [0u8; 64];
    while Instant::now() < deadline {
        match stream.read(&mut buf) {
            Ok(0) => return true,
            Ok(_) => continue,
            Err(err)
                if matches!(
                    err.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(_) => return true,
        }
    }
    false
}

pub fn counter() -> Arc<std::sync::atomic::AtomicUsize> {
    Arc::new(std::sync::atomic::AtomicUsize::new(0))
}
