/*!
 * Transport Configuration Tests
 * Environment-driven backend selection
 */

use pretty_assertions::assert_eq;
use rpmsg_socket::core::config::{
    ADDRESS_FAMILY_ENV, LOCAL_CPU_ENV, SOCKET_DIR_ENV, TRANSPORT_ENV,
};
use rpmsg_socket::core::limits::DEFAULT_AF_RPMSG;
use rpmsg_socket::{
    RpmsgServerSocket, RpmsgSocket, RpmsgSocketAddress, SocketType, TransportConfig,
    TransportKind,
};
use serial_test::serial;
use std::path::PathBuf;

struct EnvGuard;

impl EnvGuard {
    fn set(vars: &[(&str, &str)]) -> Self {
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        EnvGuard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in [TRANSPORT_ENV, ADDRESS_FAMILY_ENV, SOCKET_DIR_ENV, LOCAL_CPU_ENV] {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn test_from_env_unix() {
    let _env = EnvGuard::set(&[
        (TRANSPORT_ENV, "unix"),
        (SOCKET_DIR_ENV, "/run/rpmsg-test"),
        (LOCAL_CPU_ENV, "dsp"),
    ]);

    let config = TransportConfig::from_env();
    assert_eq!(config.kind, TransportKind::Unix);
    assert_eq!(config.socket_dir, PathBuf::from("/run/rpmsg-test"));
    assert_eq!(config.local_cpu, "dsp");
    assert_eq!(config.build().name(), "unix");
}

#[test]
#[serial]
fn test_from_env_rpmsg_family() {
    let _env = EnvGuard::set(&[(TRANSPORT_ENV, "rpmsg"), (ADDRESS_FAMILY_ENV, "44")]);

    let config = TransportConfig::from_env();
    assert_eq!(config.kind, TransportKind::Rpmsg);
    assert_eq!(config.address_family, 44);
    assert_eq!(config.build().name(), "rpmsg");
}

#[test]
#[serial]
fn test_invalid_env_values_fall_back() {
    let _env = EnvGuard::set(&[(TRANSPORT_ENV, "carrier-pigeon"), (ADDRESS_FAMILY_ENV, "-3")]);

    let config = TransportConfig::from_env();
    assert_eq!(config.kind, TransportKind::Rpmsg);
    assert_eq!(config.address_family, DEFAULT_AF_RPMSG);
}

#[test]
#[serial]
fn test_config_built_transport_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let transport = TransportConfig::unix(dir.path()).build();

    let server = RpmsgServerSocket::with_transport(transport.clone(), "configured").unwrap();
    let client = RpmsgSocket::with_transport(transport, SocketType::Stream);
    client
        .connect(&RpmsgSocketAddress::local("configured"))
        .unwrap();
    let peer = server.accept().unwrap();
    peer.output_stream().unwrap().write_byte(1).unwrap();
    assert_eq!(client.input_stream().unwrap().read_byte().unwrap(), Some(1));
}
