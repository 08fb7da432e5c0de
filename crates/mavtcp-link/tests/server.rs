mod common;

use std::io::Write;
use std::net::TcpStream;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use common::*;
use mavtcp_frame::{Identity, Version};
use mavtcp_link::{LinkEvent, TcpConnection, TcpServer};

fn bind(max_clients: usize) -> (TcpServer, u16) {
    let server = TcpServer::bind("127.0.0.1", 0, server_config(max_clients)).unwrap();
    let port = server.local_endpoint().port();
    (server, port)
}

fn client(port: u16, identity: Identity) -> TcpConnection {
    TcpConnection::connect("127.0.0.1", port, link_config(identity)).unwrap()
}

#[test]
fn client_frames_are_relayed_by_the_server() {
    let (server, port) = bind(4);
    let events = server.events().subscribe();

    let gcs = client(port, Identity::new(255, 190));
    assert!(wait_until(|| server.client_count() == 1));

    gcs.send_frame(&heartbeat_message(Version::V2)).unwrap();

    match events.recv_timeout(TIMEOUT).unwrap() {
        LinkEvent::Frame { frame, source } => {
            assert_eq!(source, Identity::new(255, 190));
            assert_eq!(frame.version, Version::V2);
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn server_sends_reach_every_client() {
    let (server, port) = bind(4);
    let a = client(port, Identity::new(255, 1));
    let b = client(port, Identity::new(255, 2));
    let a_events = a.events().subscribe();
    let b_events = b.events().subscribe();
    assert!(wait_until(|| server.client_count() == 2));

    server.send_frame(&heartbeat_message(Version::V1)).unwrap();

    for events in [a_events, b_events] {
        match events.recv_timeout(TIMEOUT).unwrap() {
            LinkEvent::Frame { source, .. } => assert_eq!(source, Identity::new(1, 240)),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}

#[test]
fn clients_get_sequential_channels_in_accept_order() {
    let (server, port) = bind(4);
    assert_eq!(server.channel(), 0);

    let mut raw = Vec::new();
    for joined in 1..=3 {
        raw.push(TcpStream::connect(("127.0.0.1", port)).unwrap());
        assert!(wait_until(|| server.client_count() == joined));
    }

    let clients = server.clients();
    let channels: Vec<u8> = clients.iter().map(|info| info.channel).collect();
    assert_eq!(channels, vec![1, 2, 3]);
    for (info, stream) in clients.iter().zip(&raw) {
        assert_eq!(info.peer.addr(), stream.local_addr().unwrap());
    }
}

#[test]
fn connections_over_capacity_are_dropped() {
    let (server, port) = bind(2);
    let frames = counter();
    let seen = Arc::clone(&frames);
    server.events().on_frame(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let _first = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let _second = TcpStream::connect(("127.0.0.1", port)).unwrap();
    assert!(wait_until(|| server.client_count() == 2));

    let mut extra = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let _ = extra.write_all(&heartbeat(Identity::new(9, 9), 0).to_bytes().unwrap());

    assert!(reads_eof(&mut extra));
    assert_eq!(server.client_count(), 2);
    assert_eq!(frames.load(Ordering::SeqCst), 0);
}

#[test]
fn disconnected_clients_are_removed_and_slots_reused() {
    let (server, port) = bind(1);

    let first = TcpStream::connect(("127.0.0.1", port)).unwrap();
    assert!(wait_until(|| server.client_count() == 1));
    drop(first);
    assert!(wait_until(|| server.client_count() == 0));

    let gcs = client(port, Identity::new(255, 190));
    let events = gcs.events().subscribe();
    assert!(wait_until(|| server.client_count() == 1));

    server.send_frame(&heartbeat_message(Version::V1)).unwrap();
    assert!(matches!(
        events.recv_timeout(TIMEOUT).unwrap(),
        LinkEvent::Frame { .. }
    ));
}

#[test]
fn stalled_client_does_not_block_others() {
    let (server, port) = bind(4);
    // Connected but never reads.
    let _stalled = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let reader = client(port, Identity::new(255, 1));
    let received = counter();
    let seen = Arc::clone(&received);
    reader.events().on_frame(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    assert!(wait_until(|| server.client_count() == 2));

    for _ in 0..200 {
        server.send_frame(&heartbeat_message(Version::V1)).unwrap();
    }

    assert!(wait_until(|| received.load(Ordering::SeqCst) == 200));
}

#[test]
fn broken_client_does_not_stop_broadcast() {
    let (server, port) = bind(4);
    let broken = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let healthy = client(port, Identity::new(255, 1));
    let received = counter();
    let seen = Arc::clone(&received);
    healthy.events().on_frame(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    assert!(wait_until(|| server.client_count() == 2));

    drop(broken);
    for _ in 0..20 {
        server.send_frame(&heartbeat_message(Version::V1)).unwrap();
        thread::sleep(Duration::from_millis(2));
    }

    assert!(wait_until(|| received.load(Ordering::SeqCst) == 20));
    assert!(wait_until(|| server.client_count() == 1));
}

#[test]
fn handler_may_reply_through_the_server() {
    let (server, port) = bind(4);
    let server = Arc::new(server);
    let weak = Arc::downgrade(&server);
    server.events().on_frame(move |frame, _| {
        if let Some(server) = weak.upgrade() {
            server.send_frame(frame).unwrap();
        }
    });

    let gcs = client(port, Identity::new(255, 190));
    let events = gcs.events().subscribe();
    assert!(wait_until(|| server.client_count() == 1));

    gcs.send_frame(&heartbeat_message(Version::V1)).unwrap();

    match events.recv_timeout(TIMEOUT).unwrap() {
        LinkEvent::Frame { source, .. } => assert_eq!(source, Identity::new(1, 240)),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn close_disconnects_clients_and_notifies_once() {
    let (server, port) = bind(4);
    let closed = counter();
    let seen = Arc::clone(&closed);
    server.events().on_closed(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let gcs = client(port, Identity::new(255, 190));
    assert!(wait_until(|| server.client_count() == 1));

    server.close();
    server.close();

    assert!(!server.is_open());
    assert_eq!(server.client_count(), 0);
    assert_eq!(closed.load(Ordering::SeqCst), 1);
    assert!(wait_until(|| !gcs.is_open()));
}

#[test]
fn former_clients_are_silent_after_close() {
    let (server, port) = bind(4);
    let frames = counter();
    let seen = Arc::clone(&frames);
    server.events().on_frame(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    let events = server.events().subscribe();

    let mut raw = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let gcs = client(port, Identity::new(255, 190));
    assert!(wait_until(|| server.client_count() == 2));

    server.close();
    assert_eq!(events.recv_timeout(TIMEOUT).unwrap(), LinkEvent::Closed);

    // Late traffic and disconnects from former members reach nothing.
    let _ = raw.write_all(&heartbeat(Identity::new(1, 1), 0).to_bytes().unwrap());
    drop(raw);
    drop(gcs);
    thread::sleep(Duration::from_millis(100));

    assert_eq!(frames.load(Ordering::SeqCst), 0);
    assert_eq!(server.client_count(), 0);
    assert!(events.try_recv().is_err());
}

#[test]
fn port_can_be_rebound_after_close() {
    let (server, port) = bind(4);
    drop(server);
    let again = TcpServer::bind("127.0.0.1", port, server_config(4)).unwrap();
    assert_eq!(again.local_endpoint().port(), port);
}

#[test]
fn frames_arrive_after_concurrent_broadcasts() {
    let (server, port) = bind(4);
    let server = Arc::new(server);
    let gcs = client(port, Identity::new(255, 190));
    let seqs = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seqs);
    gcs.events().on_frame(move |frame, _| {
        sink.lock().unwrap().push(frame.seq);
    });
    assert!(wait_until(|| server.client_count() == 1));

    let senders: Vec<_> = (0..4)
        .map(|_| {
            let server = Arc::clone(&server);
            thread::spawn(move || {
                for _ in 0..25 {
                    server.send_frame(&heartbeat_message(Version::V1)).unwrap();
                    thread::sleep(Duration::from_micros(100));
                }
            })
        })
        .collect();
    for sender in senders {
        sender.join().unwrap();
    }

    assert!(wait_until(|| seqs.lock().unwrap().len() == 100));
    // One sequence counter per client: every frame got the next number.
    let seqs = seqs.lock().unwrap();
    assert_eq!(*seqs, (0..100).collect::<Vec<u8>>());
}
