/*!
 * Rpmsg Socket
 * Connection-oriented client/peer socket
 *
 * ## State machine
 * `fresh -> created -> {bound, connected} -> closed`, where connected
 * implies bound. Creation happens lazily on the first operation that
 * needs a descriptor. Sockets produced by `accept` or wrapping a
 * caller-supplied descriptor start out connected.
 *
 * ## Locking
 * `state` guards the once-only bind/connect transitions and is always
 * taken before `create_lock`.
 */

use super::address::RpmsgSocketAddress;
use super::descriptor::{
    EndpointDescriptor, SocketInputStream, SocketOption, SocketOutputStream, SocketType,
};
use super::transport::{default_transport, Transport};
use crate::core::errors::{SocketError, SocketResult};
use crate::core::types::{Millis, RawDescriptor};
use parking_lot::Mutex;
use std::fmt;
use std::net::Shutdown;
use std::os::fd::{AsFd, AsRawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct SocketState {
    bound: bool,
    connected: bool,
    local: Option<RpmsgSocketAddress>,
    remote: Option<RpmsgSocketAddress>,
}

/// Stream or datagram socket addressed by `(cpu, name)`
pub struct RpmsgSocket {
    endpoint: EndpointDescriptor,
    kind: SocketType,
    created: AtomicBool,
    create_lock: Mutex<()>,
    state: Mutex<SocketState>,
}

impl RpmsgSocket {
    /// Stream socket on the process-wide default transport
    pub fn new() -> Self {
        Self::with_type(SocketType::Stream)
    }

    /// Socket of the given kind on the default transport
    pub fn with_type(kind: SocketType) -> Self {
        Self::with_transport(default_transport(), kind)
    }

    /// Socket of the given kind on an explicit transport
    pub fn with_transport(transport: Arc<dyn Transport>, kind: SocketType) -> Self {
        Self::from_endpoint(EndpointDescriptor::new(transport), kind, false)
    }

    /// Wrap a connected descriptor owned by the caller
    ///
    /// The socket never closes `fd`; the caller must keep it open for as
    /// long as the socket is used.
    pub fn adopt(transport: Arc<dyn Transport>, fd: &impl AsFd) -> Self {
        let raw = fd.as_fd().as_raw_fd();
        debug!(fd = raw, "Adopting connected descriptor");
        Self::from_endpoint(
            EndpointDescriptor::adopt(transport, raw),
            SocketType::Unspecified,
            true,
        )
    }

    /// Socket for a connection produced by a listening socket
    pub(crate) fn from_accepted(endpoint: EndpointDescriptor) -> Self {
        Self::from_endpoint(endpoint, SocketType::Unspecified, true)
    }

    fn from_endpoint(endpoint: EndpointDescriptor, kind: SocketType, connected: bool) -> Self {
        Self {
            endpoint,
            kind,
            created: AtomicBool::new(connected),
            create_lock: Mutex::new(()),
            state: Mutex::new(SocketState {
                bound: connected,
                connected,
                ..SocketState::default()
            }),
        }
    }

    fn create_if_needed(&self) -> SocketResult<()> {
        if self.created.load(Ordering::Acquire) {
            return Ok(());
        }
        let _create = self.create_lock.lock();
        if self.created.load(Ordering::Acquire) {
            return Ok(());
        }
        // A failed create leaves the flag clear so the next call retries
        self.endpoint.create(self.kind)?;
        self.created.store(true, Ordering::Release);
        Ok(())
    }

    /// Connect to `address`; only one connect may ever succeed
    pub fn connect(&self, address: &RpmsgSocketAddress) -> SocketResult<()> {
        let mut state = self.state.lock();
        if state.connected {
            return Err(SocketError::AlreadyConnected);
        }

        self.create_if_needed()?;
        self.endpoint.connect(address, 0)?;

        state.connected = true;
        state.bound = true;
        state.remote = Some(address.clone());
        Ok(())
    }

    /// Connect with a timeout; not available on this transport
    pub fn connect_timeout(
        &self,
        _address: &RpmsgSocketAddress,
        _timeout_ms: Millis,
    ) -> SocketResult<()> {
        Err(SocketError::Unsupported("connect_timeout"))
    }

    /// Bind to `address`; only one bind may ever succeed
    pub fn bind(&self, address: &RpmsgSocketAddress) -> SocketResult<()> {
        self.create_if_needed()?;

        let mut state = self.state.lock();
        if state.bound {
            return Err(SocketError::AlreadyBound);
        }
        self.endpoint.bind(address)?;
        state.bound = true;
        state.local = Some(address.clone());
        Ok(())
    }

    /// Input stream, creating the descriptor if needed
    pub fn input_stream(&self) -> SocketResult<Arc<SocketInputStream>> {
        self.create_if_needed()?;
        self.endpoint.input_stream()
    }

    /// Output stream, creating the descriptor if needed
    pub fn output_stream(&self) -> SocketResult<Arc<SocketOutputStream>> {
        self.create_if_needed()?;
        self.endpoint.output_stream()
    }

    /// Close the socket
    ///
    /// Never closes an adopted descriptor. Closing a socket that was never
    /// created allocates nothing and only marks it closed; closing twice is
    /// a no-op.
    pub fn close(&self) -> SocketResult<()> {
        if !self.created.load(Ordering::Acquire) {
            let _create = self.create_lock.lock();
            if !self.created.load(Ordering::Acquire) {
                self.created.store(true, Ordering::Release);
                debug!("Closed socket that was never created");
                return Ok(());
            }
        }
        self.endpoint.release()
    }

    pub fn shutdown_input(&self) -> SocketResult<()> {
        self.create_if_needed()?;
        self.endpoint.shutdown(Shutdown::Read)
    }

    pub fn shutdown_output(&self) -> SocketResult<()> {
        self.create_if_needed()?;
        self.endpoint.shutdown(Shutdown::Write)
    }

    pub fn receive_buffer_size(&self) -> SocketResult<i32> {
        self.endpoint.get_option(SocketOption::ReceiveBufferSize)
    }

    pub fn set_receive_buffer_size(&self, size: i32) -> SocketResult<()> {
        self.endpoint
            .set_option(SocketOption::ReceiveBufferSize, size)
    }

    pub fn send_buffer_size(&self) -> SocketResult<i32> {
        self.endpoint.get_option(SocketOption::SendBufferSize)
    }

    pub fn set_send_buffer_size(&self, size: i32) -> SocketResult<()> {
        self.endpoint.set_option(SocketOption::SendBufferSize, size)
    }

    /// Read/write timeout in milliseconds, `0` meaning none
    pub fn so_timeout(&self) -> SocketResult<Millis> {
        self.endpoint.get_option(SocketOption::Timeout)
    }

    /// Apply `timeout_ms` to both reads and writes
    pub fn set_so_timeout(&self, timeout_ms: Millis) -> SocketResult<()> {
        self.endpoint.set_option(SocketOption::Timeout, timeout_ms)
    }

    /// Option access by conventional id (`SO_RCVBUF`, `SO_SNDBUF`, `SO_TIMEOUT`)
    pub fn option(&self, id: i32) -> SocketResult<i32> {
        self.endpoint.get_option(SocketOption::try_from(id)?)
    }

    pub fn set_option(&self, id: i32, value: i32) -> SocketResult<()> {
        self.endpoint.set_option(SocketOption::try_from(id)?, value)
    }

    pub fn is_bound(&self) -> bool {
        self.state.lock().bound
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Address passed to a successful [`bind`](Self::bind)
    pub fn local_address(&self) -> Option<RpmsgSocketAddress> {
        self.state.lock().local.clone()
    }

    /// Address passed to a successful [`connect`](Self::connect)
    pub fn remote_address(&self) -> Option<RpmsgSocketAddress> {
        self.state.lock().remote.clone()
    }

    /// Address lookup from the descriptor; not available on this transport
    pub fn socket_address(&self) -> SocketResult<RpmsgSocketAddress> {
        Err(SocketError::Unsupported("socket_address"))
    }

    pub fn is_closed(&self) -> SocketResult<bool> {
        Err(SocketError::Unsupported("is_closed"))
    }

    pub fn is_input_shutdown(&self) -> SocketResult<bool> {
        Err(SocketError::Unsupported("is_input_shutdown"))
    }

    pub fn is_output_shutdown(&self) -> SocketResult<bool> {
        Err(SocketError::Unsupported("is_output_shutdown"))
    }

    pub fn kind(&self) -> SocketType {
        self.kind
    }

    /// Current native descriptor
    pub fn raw_fd(&self) -> Option<RawDescriptor> {
        self.endpoint.raw_fd()
    }

    /// Whether closing this socket releases the native descriptor
    pub fn owns_descriptor(&self) -> bool {
        self.endpoint.owns_handle()
    }
}

impl Default for RpmsgSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RpmsgSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RpmsgSocket")
            .field("kind", &self.kind)
            .field("endpoint", &self.endpoint)
            .field("bound", &state.bound)
            .field("connected", &state.connected)
            .finish()
    }
}

impl fmt::Display for RpmsgSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RpmsgSocket impl:{}", self.endpoint)
    }
}
