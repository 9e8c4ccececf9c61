/*!
 * Native Transport
 * Boundary between the socket state machine and the syscalls of an address family
 *
 * The socket layer never issues syscalls itself: every native step goes
 * through a [`Transport`]. Backends only differ in how they encode an
 * `(cpu, name)` address, so the family-independent primitives have shared
 * default implementations in `sys`.
 */

mod rpmsg;
mod sys;
mod unix;

pub use rpmsg::{encode_field, RpmsgTransport};
pub use unix::UnixTransport;

use crate::core::config::TransportConfig;
use crate::core::types::RawDescriptor;
use crate::net::address::RpmsgSocketAddress;
use std::io;
use std::net::Shutdown;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Buffer-size socket options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferOption {
    Send,
    Receive,
}

/// Timeout socket options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutOption {
    Send,
    Receive,
}

/// Native primitives of a socket address family
///
/// Every method reports failures as `std::io::Error` carrying the OS
/// error code. Implementations must be shareable across threads.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Allocate a native socket of the given OS type (`SOCK_STREAM`, ...)
    fn create(&self, sock_type: i32, protocol: i32) -> io::Result<RawDescriptor>;

    /// Register `address` for the descriptor
    fn bind(&self, fd: RawDescriptor, address: &RpmsgSocketAddress) -> io::Result<()>;

    /// Connect the descriptor to `address`, blocking until done
    fn connect(&self, fd: RawDescriptor, address: &RpmsgSocketAddress) -> io::Result<()>;

    fn listen(&self, fd: RawDescriptor, backlog: i32) -> io::Result<()> {
        sys::listen(fd, backlog)
    }

    /// Block until a peer connects; returns the new connection's descriptor
    fn accept(&self, fd: RawDescriptor) -> io::Result<RawDescriptor> {
        sys::accept(fd)
    }

    fn close(&self, fd: RawDescriptor) -> io::Result<()> {
        sys::close(fd)
    }

    fn shutdown(&self, fd: RawDescriptor, how: Shutdown) -> io::Result<()> {
        sys::shutdown(fd, how)
    }

    fn get_buffer_option(&self, fd: RawDescriptor, option: BufferOption) -> io::Result<i32> {
        sys::get_buffer_option(fd, option)
    }

    fn set_buffer_option(
        &self,
        fd: RawDescriptor,
        option: BufferOption,
        value: i32,
    ) -> io::Result<()> {
        sys::set_buffer_option(fd, option, value)
    }

    /// Current timeout; `Duration::ZERO` means "block forever"
    fn get_timeout_option(&self, fd: RawDescriptor, option: TimeoutOption) -> io::Result<Duration> {
        sys::get_timeout_option(fd, option)
    }

    fn set_timeout_option(
        &self,
        fd: RawDescriptor,
        option: TimeoutOption,
        value: Duration,
    ) -> io::Result<()> {
        sys::set_timeout_option(fd, option, value)
    }

    fn read(&self, fd: RawDescriptor, buf: &mut [u8]) -> io::Result<usize> {
        sys::read(fd, buf)
    }

    fn write(&self, fd: RawDescriptor, buf: &[u8]) -> io::Result<usize> {
        sys::write(fd, buf)
    }

    /// Bytes queued for reading, without blocking
    fn bytes_available(&self, fd: RawDescriptor) -> io::Result<usize> {
        sys::bytes_available(fd)
    }
}

static DEFAULT_TRANSPORT: OnceLock<Arc<dyn Transport>> = OnceLock::new();

/// Process-wide transport built once from the environment
pub fn default_transport() -> Arc<dyn Transport> {
    DEFAULT_TRANSPORT
        .get_or_init(|| {
            let config = TransportConfig::from_env();
            tracing::info!(
                transport = %config.kind,
                family = config.address_family,
                "Default socket transport selected"
            );
            config.build()
        })
        .clone()
}
