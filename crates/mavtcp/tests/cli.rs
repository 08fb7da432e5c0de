#![cfg(feature = "cli")]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use mavtcp_frame::{crc, Frame, FrameParser, Identity, Version};
use mavtcp_link::{LinkConfig, LinkEvent, TcpConnection};

const TIMEOUT: Duration = Duration::from_secs(5);

fn mavtcp() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mavtcp"));
    cmd.arg("--log-level").arg("error");
    cmd
}

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("ephemeral bind should work");
    listener.local_addr().expect("local addr").port()
}

fn connect_with_retry(port: u16) -> TcpStream {
    let start = Instant::now();
    loop {
        match TcpStream::connect(("127.0.0.1", port)) {
            Ok(stream) => return stream,
            Err(err) => {
                if start.elapsed() >= TIMEOUT {
                    panic!("connect timeout: {err}");
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

fn heartbeat(identity: Identity, seq: u8) -> Frame {
    let mut frame = Frame::new(Version::V1, 0, vec![0, 0, 0, 0, 2, 3, 81, 4, 3]);
    frame.finalize(identity, seq, crc::crc_extra);
    frame
}

fn read_frames(stream: &mut TcpStream, count: usize) -> Vec<Frame> {
    stream
        .set_read_timeout(Some(Duration::from_millis(100)))
        .expect("read timeout");
    let deadline = Instant::now() + TIMEOUT;
    let mut parser = FrameParser::new();
    let mut frames = Vec::new();
    let mut buf = [0u8; 512];
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

fn stop(mut child: Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[test]
fn version_prints_package_version() {
    let output = mavtcp().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("mavtcp {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn send_writes_frames_as_configured_identity() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();

    let child = mavtcp()
        .arg("send")
        .arg(format!("tcp://127.0.0.1:{port}"))
        .args(["--repeat", "3", "--system-id", "7", "--component-id", "190"])
        .stdout(Stdio::null())
        .spawn()
        .expect("send should start");

    let (mut stream, _) = listener.accept().expect("accept");
    let frames = read_frames(&mut stream, 3);
    let output = child.wait_with_output().expect("send should finish");

    assert!(output.status.success());
    assert_eq!(frames.len(), 3);
    for (seq, frame) in frames.iter().enumerate() {
        assert_eq!(frame.identity(), Identity::new(7, 190));
        assert_eq!(usize::from(frame.seq), seq);
        assert_eq!(frame.msgid, 0);
    }
}

#[test]
fn send_identity_comes_from_environment() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();

    let child = mavtcp()
        .env("MAVTCP_SYSTEM_ID", "9")
        .arg("send")
        .arg(format!("tcp://127.0.0.1:{port}"))
        .args(["--v2", "--hex", "0102"])
        .arg("--msgid")
        .arg("300")
        .stdout(Stdio::null())
        .spawn()
        .expect("send should start");

    let (mut stream, _) = listener.accept().expect("accept");
    let frames = read_frames(&mut stream, 1);
    assert!(child.wait_with_output().expect("send should finish").status.success());

    assert_eq!(frames[0].version, Version::V2);
    assert_eq!(frames[0].msgid, 300);
    assert_eq!(frames[0].sysid, 9);
    assert_eq!(frames[0].payload.as_ref(), &[1, 2]);
}

#[test]
fn send_rejects_server_url() {
    let output = mavtcp()
        .args(["send", "tcp-l://127.0.0.1:5760"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn send_rejects_unknown_scheme() {
    let output = mavtcp()
        .args(["send", "udp://127.0.0.1:14550"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported url scheme"));
}

#[test]
fn send_to_closed_port_fails() {
    let port = free_port();
    let output = mavtcp()
        .arg("send")
        .arg(format!("tcp://127.0.0.1:{port}"))
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn v1_frame_with_large_msgid_is_invalid_data() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();

    let output = mavtcp()
        .arg("send")
        .arg(format!("tcp://127.0.0.1:{port}"))
        .args(["--msgid", "300"])
        .output()
        .expect("send should run");
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn listen_prints_frames_from_clients_as_json() {
    let port = free_port();
    let child = mavtcp()
        .args(["--format", "json", "listen"])
        .arg(format!("tcp-l://127.0.0.1:{port}"))
        .args(["--count", "1"])
        .stdout(Stdio::piped())
        .spawn()
        .expect("listen should start");

    let mut stream = connect_with_retry(port);
    stream
        .write_all(&heartbeat(Identity::new(1, 1), 5).to_bytes().expect("encode"))
        .expect("write");

    let output = child.wait_with_output().expect("listen should finish");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"msgid\":0"));
    assert!(stdout.contains("\"sysid\":1"));
    assert!(stdout.contains("\"seq\":5"));
}

#[test]
fn echo_server_returns_frames_with_its_identity() {
    let port = free_port();
    let child = mavtcp()
        .args(["--system-id", "3", "echo"])
        .arg(format!("tcp-l://127.0.0.1:{port}"))
        .stdout(Stdio::null())
        .spawn()
        .expect("echo should start");

    drop(connect_with_retry(port));
    let gcs = TcpConnection::connect(
        "127.0.0.1",
        port,
        LinkConfig::default().with_identity(Identity::new(255, 190)),
    )
    .expect("client should connect");
    let events = gcs.events().subscribe();

    // Registration happens on the server's accept thread.
    let deadline = Instant::now() + TIMEOUT;
    let mut echoed = None;
    while echoed.is_none() && Instant::now() < deadline {
        gcs.send_frame(&Frame::new(Version::V1, 0, vec![0, 0, 0, 0, 6, 8, 0, 0, 3]))
            .expect("send");
        if let Ok(LinkEvent::Frame { source, .. }) =
            events.recv_timeout(Duration::from_millis(200))
        {
            echoed = Some(source);
        }
    }

    stop(child);
    assert_eq!(echoed, Some(Identity::new(3, 240)));
}
