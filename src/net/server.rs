/*!
 * Rpmsg Server Socket
 * Listening socket that hands out connected [`RpmsgSocket`]s
 */

use super::address::RpmsgSocketAddress;
use super::descriptor::{CreationGuard, EndpointDescriptor, SocketType};
use super::socket::RpmsgSocket;
use super::transport::{default_transport, Transport};
use crate::core::errors::{SocketError, SocketResult};
use crate::core::limits::LISTEN_BACKLOG;
use crate::core::types::RawDescriptor;
use crate::monitoring::span_operation;
use std::fmt;
use std::os::fd::{AsFd, AsRawFd};
use std::sync::Arc;
use tracing::info;

/// Socket listening on a local rpmsg name
///
/// Always in the listening state once constructed.
pub struct RpmsgServerSocket {
    endpoint: EndpointDescriptor,
    address: Option<RpmsgSocketAddress>,
}

impl RpmsgServerSocket {
    /// Listen on `name` in the local namespace using the default transport
    pub fn bind(name: impl Into<String>) -> SocketResult<Self> {
        Self::with_transport(default_transport(), name)
    }

    /// Listen on `name` in the local namespace of `transport`
    ///
    /// Nothing leaks if any step fails: the half-built descriptor is closed
    /// before the error is returned.
    pub fn with_transport(
        transport: Arc<dyn Transport>,
        name: impl Into<String>,
    ) -> SocketResult<Self> {
        let address = RpmsgSocketAddress::local(name);
        let span = span_operation("server_bind");
        let _entered = span.enter();
        span.record_address(address.cpu_name(), address.socket_name());

        let endpoint = EndpointDescriptor::new(transport);
        span.finish(endpoint.create(SocketType::Stream))?;

        let guard = CreationGuard::new(&endpoint, "server");
        span.finish(endpoint.bind(&address))?;
        span.finish(endpoint.listen(LISTEN_BACKLOG))?;
        guard.commit();

        if let Some(fd) = endpoint.raw_fd() {
            span.record_fd(fd);
        }
        info!(address = %address, "Server socket listening");
        Ok(Self {
            endpoint,
            address: Some(address),
        })
    }

    /// Listen on a caller-owned descriptor that is already bound
    ///
    /// The descriptor is never closed by this socket.
    pub fn adopt(transport: Arc<dyn Transport>, fd: &impl AsFd) -> SocketResult<Self> {
        let endpoint = EndpointDescriptor::adopt(transport, fd.as_fd().as_raw_fd());
        endpoint.listen(LISTEN_BACKLOG)?;
        Ok(Self {
            endpoint,
            address: None,
        })
    }

    /// Bound address
    ///
    /// Not available for sockets built with [`adopt`](Self::adopt).
    pub fn local_address(&self) -> SocketResult<&RpmsgSocketAddress> {
        self.address
            .as_ref()
            .ok_or(SocketError::Unsupported("address of adopted server descriptor"))
    }

    /// Block until a peer connects
    ///
    /// Closing the server from another thread makes a pending accept fail
    /// where the transport supports it.
    pub fn accept(&self) -> SocketResult<RpmsgSocket> {
        let accepted = EndpointDescriptor::new(self.endpoint.transport());
        self.endpoint.accept(&accepted)?;
        Ok(RpmsgSocket::from_accepted(accepted))
    }

    /// Stop listening; a no-op for adopted descriptors
    pub fn close(&self) -> SocketResult<()> {
        self.endpoint.release()
    }

    pub fn raw_fd(&self) -> Option<RawDescriptor> {
        self.endpoint.raw_fd()
    }
}

impl fmt::Debug for RpmsgServerSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpmsgServerSocket")
            .field("endpoint", &self.endpoint)
            .field("address", &self.address)
            .finish()
    }
}
