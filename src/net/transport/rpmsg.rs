/*!
 * Rpmsg Transport
 * Sockets of the remote-processor messaging family (`AF_RPMSG`)
 */

use super::sys::{self, RawSockaddr};
use super::Transport;
use crate::core::limits::{DEFAULT_AF_RPMSG, RPMSG_SOCKET_CPU_SIZE, RPMSG_SOCKET_NAME_SIZE};
use crate::core::types::RawDescriptor;
use crate::net::address::RpmsgSocketAddress;
use std::io;
use tracing::trace;

/// Native `struct sockaddr_rpmsg`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
struct SockaddrRpmsg {
    rp_family: libc::sa_family_t,
    rp_cpu: [libc::c_char; RPMSG_SOCKET_CPU_SIZE],
    rp_name: [libc::c_char; RPMSG_SOCKET_NAME_SIZE],
}

unsafe impl RawSockaddr for SockaddrRpmsg {}

impl SockaddrRpmsg {
    fn encode(family: i32, address: &RpmsgSocketAddress) -> Self {
        let mut raw = Self {
            rp_family: family as libc::sa_family_t,
            rp_cpu: [0; RPMSG_SOCKET_CPU_SIZE],
            rp_name: [0; RPMSG_SOCKET_NAME_SIZE],
        };
        encode_field(address.cpu_name(), &mut raw.rp_cpu);
        encode_field(address.socket_name(), &mut raw.rp_name);
        raw
    }
}

/// Copy `src` into a fixed-size NUL-terminated field
///
/// Truncates to `dst.len() - 1` bytes and always terminates, like
/// `strlcpy`. Returns the number of bytes copied.
pub fn encode_field(src: &str, dst: &mut [libc::c_char]) -> usize {
    if dst.is_empty() {
        return 0;
    }
    let bytes = src.as_bytes();
    let n = bytes.len().min(dst.len() - 1);
    for (slot, byte) in dst.iter_mut().zip(&bytes[..n]) {
        *slot = *byte as libc::c_char;
    }
    for slot in &mut dst[n..] {
        *slot = 0;
    }
    n
}

/// Backend for the rpmsg address family
#[derive(Debug, Clone)]
pub struct RpmsgTransport {
    family: i32,
}

impl RpmsgTransport {
    pub fn new() -> Self {
        Self::with_family(DEFAULT_AF_RPMSG)
    }

    /// Use a vendor-specific family number
    pub fn with_family(family: i32) -> Self {
        Self { family }
    }

    #[inline]
    pub fn family(&self) -> i32 {
        self.family
    }
}

impl Default for RpmsgTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for RpmsgTransport {
    fn name(&self) -> &'static str {
        "rpmsg"
    }

    fn create(&self, sock_type: i32, protocol: i32) -> io::Result<RawDescriptor> {
        let fd = sys::socket(self.family, sock_type, protocol)?;
        trace!(fd, family = self.family, sock_type, "rpmsg socket allocated");
        Ok(fd)
    }

    fn bind(&self, fd: RawDescriptor, address: &RpmsgSocketAddress) -> io::Result<()> {
        sys::bind(fd, &SockaddrRpmsg::encode(self.family, address))
    }

    fn connect(&self, fd: RawDescriptor, address: &RpmsgSocketAddress) -> io::Result<()> {
        sys::connect(fd, &SockaddrRpmsg::encode(self.family, address))
    }
}
