/*!
 * Rpmsg Echo - Main Entry Point
 *
 * Round-trip check between two processors:
 * - `rpmsg-echo server [name]` accepts one peer, sends bytes 0..15 and
 *   expects them echoed back
 * - `rpmsg-echo client [cpu] [name]` connects, verifies the 16 bytes and
 *   echoes them
 *
 * The transport is selected through the RPMSG_* environment variables.
 */

use miette::{bail, Result, WrapErr};
use rpmsg_socket::{init_tracing, RpmsgServerSocket, RpmsgSocket, RpmsgSocketAddress};
use tracing::info;

const DEFAULT_NAME: &str = "hello";
const DEFAULT_PEER_CPU: &str = "ap";
const PATTERN_LEN: u8 = 16;

fn pattern() -> Vec<u8> {
    (0..PATTERN_LEN).collect()
}

fn run_server(name: &str) -> Result<()> {
    let server = RpmsgServerSocket::bind(name)?;
    info!(name, "Waiting for a peer");

    let peer = server.accept()?;
    info!(peer = %peer, "Peer connected");

    let expected = pattern();
    peer.output_stream()?.write_all(&expected)?;

    let mut echoed = vec![0u8; expected.len()];
    peer.input_stream()?.read_exact(&mut echoed)?;
    if echoed != expected {
        bail!("echo mismatch: sent {:?}, received {:?}", expected, echoed);
    }

    peer.close()?;
    server.close()?;
    info!("Round trip verified");
    Ok(())
}

fn run_client(cpu: &str, name: &str) -> Result<()> {
    let socket = RpmsgSocket::new();
    let address = RpmsgSocketAddress::new(cpu, name);
    socket
        .connect(&address)
        .wrap_err_with(|| format!("connecting to {}", address))?;
    info!(address = %address, "Connected");

    let expected = pattern();
    let mut received = vec![0u8; expected.len()];
    socket.input_stream()?.read_exact(&mut received)?;
    if received != expected {
        bail!("payload mismatch: expected {:?}, received {:?}", expected, received);
    }

    socket.output_stream()?.write_all(&received)?;
    socket.close()?;
    info!("Round trip verified");
    Ok(())
}

fn usage() -> Result<()> {
    eprintln!("Usage: rpmsg-echo server [name]");
    eprintln!("       rpmsg-echo client [cpu] [name]");
    bail!("missing or unknown mode")
}

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let arg = |i: usize, default: &'static str| -> String {
        args.get(i).cloned().unwrap_or_else(|| default.to_string())
    };

    match args.first().map(String::as_str) {
        Some("server") => run_server(&arg(1, DEFAULT_NAME)),
        Some("client") => run_client(&arg(1, DEFAULT_PEER_CPU), &arg(2, DEFAULT_NAME)),
        _ => usage(),
    }
}
