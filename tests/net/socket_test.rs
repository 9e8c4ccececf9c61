/*!
 * Client Socket Tests
 * State transitions and data transfer of RpmsgSocket
 */

use crate::common::{accept_in_background, connected_pair, loopback, pattern, LOCAL_CPU};
use pretty_assertions::assert_eq;
use rpmsg_socket::{RpmsgServerSocket, RpmsgSocket, RpmsgSocketAddress, SocketError, SocketType};
use std::io::{Read, Write};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_hello_round_trip() {
    let (_dir, transport) = loopback();
    let server = Arc::new(RpmsgServerSocket::with_transport(Arc::clone(&transport), "hello").unwrap());
    let acceptor = accept_in_background(Arc::clone(&server));

    let client = RpmsgSocket::with_transport(Arc::clone(&transport), SocketType::Stream);
    client.connect(&RpmsgSocketAddress::local("hello")).unwrap();
    let peer = acceptor.join().unwrap();

    peer.output_stream().unwrap().write_all(&pattern()).unwrap();

    let mut received = [0u8; 16];
    client.input_stream().unwrap().read_exact(&mut received).unwrap();
    assert_eq!(received.to_vec(), pattern());

    client.output_stream().unwrap().write_all(&received).unwrap();
    let mut echoed = [0u8; 16];
    peer.input_stream().unwrap().read_exact(&mut echoed).unwrap();
    assert_eq!(echoed.to_vec(), pattern());

    client.close().unwrap();
    peer.close().unwrap();
    server.close().unwrap();
}

#[test]
fn test_connect_by_explicit_local_cpu() {
    let (_dir, transport) = loopback();
    let server = RpmsgServerSocket::with_transport(Arc::clone(&transport), "svc").unwrap();

    let client = RpmsgSocket::with_transport(Arc::clone(&transport), SocketType::Stream);
    client.connect(&RpmsgSocketAddress::new(LOCAL_CPU, "svc")).unwrap();
    let peer = server.accept().unwrap();

    peer.output_stream().unwrap().write_byte(0x5A).unwrap();
    assert_eq!(client.input_stream().unwrap().read_byte().unwrap(), Some(0x5A));
}

#[test]
fn test_connect_to_missing_peer_is_io_failure() {
    let (_dir, transport) = loopback();
    let client = RpmsgSocket::with_transport(transport, SocketType::Stream);

    let err = client.connect(&RpmsgSocketAddress::local("nobody")).unwrap_err();
    assert!(err.is_io());
    assert!(err.errno().is_some());
    assert!(!client.is_connected());
    // Creation already happened; the descriptor survives the failed connect
    assert!(client.raw_fd().is_some());
}

#[test]
fn test_connect_twice() {
    let (_dir, transport) = loopback();
    let (_server, _peer, client) = connected_pair(&transport, "twice");

    let err = client.connect(&RpmsgSocketAddress::local("twice")).unwrap_err();
    assert!(matches!(err, SocketError::AlreadyConnected));
    assert!(client.is_connected());
}

#[test]
fn test_bind_twice() {
    let (_dir, transport) = loopback();
    let socket = RpmsgSocket::with_transport(transport, SocketType::Stream);

    socket.bind(&RpmsgSocketAddress::local("first")).unwrap();
    assert!(socket.is_bound());
    assert_eq!(socket.local_address(), Some(RpmsgSocketAddress::local("first")));

    let err = socket.bind(&RpmsgSocketAddress::local("second")).unwrap_err();
    assert!(matches!(err, SocketError::AlreadyBound));
    assert_eq!(socket.local_address(), Some(RpmsgSocketAddress::local("first")));
}

#[test]
fn test_connected_socket_is_bound() {
    let (_dir, transport) = loopback();
    let (_server, peer, client) = connected_pair(&transport, "bound");

    assert!(client.is_bound());
    assert!(peer.is_bound());
    assert!(peer.is_connected());
    assert!(matches!(
        client.bind(&RpmsgSocketAddress::local("other")),
        Err(SocketError::AlreadyBound)
    ));
}

#[test]
fn test_stream_accessor_creates_descriptor() {
    let (_dir, transport) = loopback();
    let socket = RpmsgSocket::with_transport(transport, SocketType::Stream);

    assert_eq!(socket.raw_fd(), None);
    let input = socket.input_stream().unwrap();
    assert!(socket.raw_fd().is_some());
    let again = socket.input_stream().unwrap();
    assert!(Arc::ptr_eq(&input, &again));
}

#[test]
fn test_close_never_created_socket() {
    let (_dir, transport) = loopback();
    let socket = RpmsgSocket::with_transport(transport, SocketType::Stream);

    socket.close().unwrap();
    assert_eq!(socket.raw_fd(), None);
    assert!(matches!(socket.output_stream(), Err(SocketError::NotCreated)));
    socket.close().unwrap();
}

#[test]
fn test_closing_stream_closes_socket() {
    let (_dir, transport) = loopback();
    let (_server, peer, client) = connected_pair(&transport, "streamclose");

    let output = client.output_stream().unwrap();
    output.close().unwrap();
    assert_eq!(client.raw_fd(), None);
    assert!(matches!(output.write(&[1]), Err(SocketError::NotCreated)));

    let mut buf = [0u8; 4];
    assert_eq!(peer.input_stream().unwrap().read(&mut buf).unwrap(), 0);
}

#[test]
fn test_shutdown_output_signals_end_of_stream() {
    let (_dir, transport) = loopback();
    let (_server, peer, client) = connected_pair(&transport, "halfclose");

    client.output_stream().unwrap().write_all(b"bye").unwrap();
    client.shutdown_output().unwrap();

    let mut received = Vec::new();
    let input = peer.input_stream().unwrap();
    (&*input).read_to_end(&mut received).unwrap();
    assert_eq!(received, b"bye".to_vec());

    // The other direction stays open
    peer.output_stream().unwrap().write_all(b"ok").unwrap();
    let mut reply = [0u8; 2];
    client.input_stream().unwrap().read_exact(&mut reply).unwrap();
    assert_eq!(&reply, b"ok");
}

#[test]
fn test_available_reports_queued_bytes() {
    let (_dir, transport) = loopback();
    let (_server, peer, client) = connected_pair(&transport, "avail");

    assert_eq!(peer.input_stream().unwrap().available().unwrap(), 0);
    client.output_stream().unwrap().write_all(&[9; 5]).unwrap();
    assert_eq!(peer.input_stream().unwrap().available().unwrap(), 5);
}

#[test]
fn test_std_io_traits() {
    let (_dir, transport) = loopback();
    let (_server, peer, client) = connected_pair(&transport, "stdio");

    let output = client.output_stream().unwrap();
    writeln!(&*output, "ping").unwrap();
    (&*output).flush().unwrap();

    let input = peer.input_stream().unwrap();
    let mut line = [0u8; 5];
    (&*input).read_exact(&mut line).unwrap();
    assert_eq!(&line, b"ping\n");
}

#[test]
fn test_concurrent_read_and_write() {
    let (_dir, transport) = loopback();
    let (_server, peer, client) = connected_pair(&transport, "duplex");
    let client = Arc::new(client);

    // Reader blocks on the client while the same client keeps writing
    let reader = {
        let client = Arc::clone(&client);
        thread::spawn(move || {
            let mut buf = [0u8; 4];
            client.input_stream().unwrap().read_exact(&mut buf).unwrap();
            buf
        })
    };

    client.output_stream().unwrap().write_all(b"ping").unwrap();
    let mut request = [0u8; 4];
    peer.input_stream().unwrap().read_exact(&mut request).unwrap();
    assert_eq!(&request, b"ping");

    peer.output_stream().unwrap().write_all(b"pong").unwrap();
    assert_eq!(&reader.join().unwrap(), b"pong");
}

#[test]
fn test_concurrent_connect_one_winner() {
    let (_dir, transport) = loopback();
    let server = Arc::new(RpmsgServerSocket::with_transport(Arc::clone(&transport), "race").unwrap());
    let client = Arc::new(RpmsgSocket::with_transport(Arc::clone(&transport), SocketType::Stream));

    let attempts: Vec<_> = (0..4)
        .map(|_| {
            let client = Arc::clone(&client);
            thread::spawn(move || client.connect(&RpmsgSocketAddress::local("race")))
        })
        .collect();
    let results: Vec<_> = attempts.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, SocketError::AlreadyConnected)));
    server.accept().unwrap();
}

#[test]
fn test_close_wakes_blocked_read() {
    let (_dir, transport) = loopback();
    let (_server, _peer, client) = connected_pair(&transport, "wakeread");
    let input = client.input_stream().unwrap();

    let (tx, rx) = mpsc::channel();
    let reader = thread::spawn(move || {
        let _ = tx.send(input.read_byte());
    });

    thread::sleep(Duration::from_millis(100));
    client.close().unwrap();

    let result = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("read still blocked after close");
    match result {
        Ok(None) | Err(SocketError::Io { .. }) | Err(SocketError::NotCreated) => {}
        other => panic!("unexpected read result: {:?}", other),
    }
    reader.join().unwrap();
}
