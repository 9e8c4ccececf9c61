/*!
 * Server Socket Tests
 * Listening, accepting and closing RpmsgServerSocket
 */

use crate::common::{loopback, pattern};
use pretty_assertions::assert_eq;
use rpmsg_socket::{RpmsgServerSocket, RpmsgSocket, RpmsgSocketAddress, SocketError, SocketType};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_server_address() {
    let (_dir, transport) = loopback();
    let server = RpmsgServerSocket::with_transport(transport, "named").unwrap();
    assert_eq!(
        server.local_address().unwrap(),
        &RpmsgSocketAddress::local("named")
    );
    assert!(server.raw_fd().is_some());
}

#[test]
fn test_name_in_use_fails_without_leaking() {
    let (_dir, transport) = loopback();
    let _first = RpmsgServerSocket::with_transport(Arc::clone(&transport), "taken").unwrap();

    let err = RpmsgServerSocket::with_transport(Arc::clone(&transport), "taken").unwrap_err();
    assert_eq!(err.errno(), Some(libc::EADDRINUSE));
}

#[test]
fn test_invalid_name_rejected() {
    let (_dir, transport) = loopback();
    let err = RpmsgServerSocket::with_transport(transport, "a/b").unwrap_err();
    assert!(err.is_io());
}

#[test]
fn test_accepted_sockets_close_independently() {
    let (_dir, transport) = loopback();
    let server = RpmsgServerSocket::with_transport(Arc::clone(&transport), "multi").unwrap();

    let clients: Vec<RpmsgSocket> = (0..3)
        .map(|_| {
            let client = RpmsgSocket::with_transport(Arc::clone(&transport), SocketType::Stream);
            client.connect(&RpmsgSocketAddress::local("multi")).unwrap();
            client
        })
        .collect();
    let accepted: Vec<RpmsgSocket> = (0..3).map(|_| server.accept().unwrap()).collect();

    let fds: Vec<_> = accepted.iter().map(|s| s.raw_fd().unwrap()).collect();
    assert!(fds.windows(2).all(|w| w[0] != w[1]));

    accepted[0].close().unwrap();
    assert_eq!(accepted[0].raw_fd(), None);

    for (i, peer) in accepted.iter().enumerate().skip(1) {
        assert!(peer.is_connected());
        peer.output_stream().unwrap().write_byte(i as u8).unwrap();
    }

    // Order of accept follows order of connect on the loopback transport
    for (i, client) in clients.iter().enumerate().skip(1) {
        let byte = client.input_stream().unwrap().read_byte().unwrap();
        assert_eq!(byte, Some(i as u8));
    }
    assert_eq!(clients[0].input_stream().unwrap().read_byte().unwrap(), None);

    // The listener keeps accepting after a peer went away
    let late = RpmsgSocket::with_transport(Arc::clone(&transport), SocketType::Stream);
    late.connect(&RpmsgSocketAddress::local("multi")).unwrap();
    let peer = server.accept().unwrap();
    peer.output_stream().unwrap().write_all(&pattern()).unwrap();
    let mut buf = [0u8; 16];
    late.input_stream().unwrap().read_exact(&mut buf).unwrap();
    assert_eq!(buf.to_vec(), pattern());
}

#[test]
fn test_accept_after_close() {
    let (_dir, transport) = loopback();
    let server = RpmsgServerSocket::with_transport(transport, "closed").unwrap();

    server.close().unwrap();
    assert_eq!(server.raw_fd(), None);
    assert!(matches!(server.accept(), Err(SocketError::NotCreated)));
    server.close().unwrap();
}

#[test]
fn test_closing_server_keeps_accepted_sockets() {
    let (_dir, transport) = loopback();
    let server = RpmsgServerSocket::with_transport(Arc::clone(&transport), "keep").unwrap();
    let client = RpmsgSocket::with_transport(Arc::clone(&transport), SocketType::Stream);
    client.connect(&RpmsgSocketAddress::local("keep")).unwrap();
    let peer = server.accept().unwrap();

    server.close().unwrap();

    client.output_stream().unwrap().write_byte(42).unwrap();
    assert_eq!(peer.input_stream().unwrap().read_byte().unwrap(), Some(42));
}

#[test]
fn test_rebind_after_close() {
    let (_dir, transport) = loopback();

    let server = RpmsgServerSocket::with_transport(Arc::clone(&transport), "again").unwrap();
    server.close().unwrap();
    drop(server);

    let server = RpmsgServerSocket::with_transport(Arc::clone(&transport), "again").unwrap();
    let client = RpmsgSocket::with_transport(Arc::clone(&transport), SocketType::Stream);
    client.connect(&RpmsgSocketAddress::local("again")).unwrap();
    let peer = server.accept().unwrap();
    peer.output_stream().unwrap().write_byte(3).unwrap();
    assert_eq!(client.input_stream().unwrap().read_byte().unwrap(), Some(3));
}

#[test]
fn test_rebind_after_drop() {
    let (_dir, transport) = loopback();

    drop(RpmsgServerSocket::with_transport(Arc::clone(&transport), "dropped").unwrap());
    RpmsgServerSocket::with_transport(Arc::clone(&transport), "dropped").unwrap();
}

#[test]
fn test_closed_name_refuses_connections() {
    let (_dir, transport) = loopback();
    let server = RpmsgServerSocket::with_transport(Arc::clone(&transport), "gone").unwrap();
    server.close().unwrap();

    let client = RpmsgSocket::with_transport(Arc::clone(&transport), SocketType::Stream);
    let err = client.connect(&RpmsgSocketAddress::local("gone")).unwrap_err();
    assert_eq!(err.errno(), Some(libc::ENOENT));
}

#[test]
fn test_close_wakes_blocked_accept() {
    let (_dir, transport) = loopback();
    let server = Arc::new(RpmsgServerSocket::with_transport(transport, "wake").unwrap());

    let (tx, rx) = mpsc::channel();
    let acceptor = {
        let server = Arc::clone(&server);
        thread::spawn(move || {
            let _ = tx.send(server.accept());
        })
    };

    thread::sleep(Duration::from_millis(100));
    server.close().unwrap();

    let result = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("accept still blocked after close");
    match result {
        Err(SocketError::Io { .. }) | Err(SocketError::NotCreated) => {}
        other => panic!("unexpected accept result: {:?}", other),
    }
    acceptor.join().unwrap();
}
