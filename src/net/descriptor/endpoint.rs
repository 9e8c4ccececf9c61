/*!
 * Endpoint Descriptor
 * Owns exactly one native descriptor and every direct call into the transport
 *
 * ## Locking
 * - `handle`: RwLock over the descriptor slot. Lifecycle transitions
 *   (create, accept into, close) take it for writing; everything else
 *   snapshots the descriptor under a read lock and releases it before
 *   blocking, so a close from another thread is never stuck behind a
 *   blocked accept or read.
 * - `read_lock` / `write_lock`: serialize same-direction I/O while letting
 *   one reader and one writer proceed concurrently.
 * - `option_lock`: makes the two-step timeout update indivisible.
 */

use super::kind::SocketType;
use super::options::SocketOption;
use super::stream::{SocketInputStream, SocketOutputStream};
use crate::core::errors::{SocketError, SocketResult};
use crate::core::types::{Millis, RawDescriptor};
use crate::monitoring::span_operation;
use crate::net::address::RpmsgSocketAddress;
use crate::net::transport::{BufferOption, TimeoutOption, Transport};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::net::Shutdown;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, trace, warn};

#[derive(Debug, Default, Clone, Copy)]
struct Handle {
    fd: Option<RawDescriptor>,
    /// Produced by our own create/accept; adopted descriptors are never closed
    owned: bool,
}

/// State shared between an endpoint and the streams it hands out
pub(crate) struct EndpointInner {
    transport: Arc<dyn Transport>,
    handle: RwLock<Handle>,
    pub(super) read_lock: Mutex<()>,
    pub(super) write_lock: Mutex<()>,
    option_lock: Mutex<()>,
}

impl EndpointInner {
    fn new(transport: Arc<dyn Transport>, handle: Handle) -> Self {
        Self {
            transport,
            handle: RwLock::new(handle),
            read_lock: Mutex::new(()),
            write_lock: Mutex::new(()),
            option_lock: Mutex::new(()),
        }
    }

    #[inline]
    pub(super) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Current descriptor, or `NotCreated`
    #[inline]
    pub(super) fn fd(&self) -> SocketResult<RawDescriptor> {
        self.handle.read().fd.ok_or(SocketError::NotCreated)
    }

    fn owns_handle(&self) -> bool {
        self.handle.read().owned
    }

    fn close(&self) -> SocketResult<()> {
        let span = span_operation("close");
        let _guard = span.enter();

        let (fd, owned) = {
            let mut handle = self.handle.write();
            let fd = handle.fd.take().ok_or(SocketError::NotCreated)?;
            let owned = std::mem::replace(&mut handle.owned, false);
            (fd, owned)
        };
        span.record_fd(fd);

        if !owned {
            debug!(fd, "Detached adopted descriptor without closing it");
            span.record_result(true);
            return Ok(());
        }

        // Wakes threads blocked in accept/read on this descriptor where the
        // family supports it
        if let Err(e) = self.transport.shutdown(fd, Shutdown::Both) {
            trace!(fd, error = %e, "shutdown before close failed");
        }

        let result = self
            .transport
            .close(fd)
            .map_err(|e| SocketError::io("close", e));
        if result.is_ok() {
            debug!(fd, transport = self.transport.name(), "Closed descriptor");
        }
        span.finish(result)
    }

    /// Close as seen by socket users: no-op for adopted or already closed
    /// descriptors
    pub(super) fn release(&self) -> SocketResult<()> {
        if !self.owns_handle() {
            return Ok(());
        }
        match self.close() {
            Err(SocketError::NotCreated) => Ok(()),
            other => other,
        }
    }
}

impl Drop for EndpointInner {
    fn drop(&mut self) {
        let handle = *self.handle.get_mut();
        if let (Some(fd), true) = (handle.fd, handle.owned) {
            if let Err(e) = self.transport.close(fd) {
                warn!(fd, error = %e, "Failed to close descriptor on drop");
            } else {
                trace!(fd, "Closed descriptor on drop");
            }
        }
    }
}

/// Wrapper around one native descriptor of a transport
///
/// Produces at most one input and one output stream; both share the
/// descriptor with the endpoint and keep it alive.
pub struct EndpointDescriptor {
    inner: Arc<EndpointInner>,
    input: OnceLock<Arc<SocketInputStream>>,
    output: OnceLock<Arc<SocketOutputStream>>,
}

impl EndpointDescriptor {
    /// Endpoint without a descriptor; call [`create`](Self::create) next
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::from_handle(transport, Handle::default())
    }

    /// Wrap a caller-owned descriptor; closing this endpoint never closes it
    pub fn adopt(transport: Arc<dyn Transport>, fd: RawDescriptor) -> Self {
        Self::from_handle(
            transport,
            Handle {
                fd: Some(fd),
                owned: false,
            },
        )
    }

    fn from_handle(transport: Arc<dyn Transport>, handle: Handle) -> Self {
        Self {
            inner: Arc::new(EndpointInner::new(transport, handle)),
            input: OnceLock::new(),
            output: OnceLock::new(),
        }
    }

    /// Transport this endpoint talks to
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.inner.transport)
    }

    /// Current descriptor, `None` if never created or closed
    pub fn raw_fd(&self) -> Option<RawDescriptor> {
        self.inner.handle.read().fd
    }

    /// Whether closing this endpoint releases the native descriptor
    pub fn owns_handle(&self) -> bool {
        self.inner.owns_handle()
    }

    /// Allocate the native socket
    pub fn create(&self, kind: SocketType) -> SocketResult<()> {
        let span = span_operation("create");
        let _guard = span.enter();

        let mut handle = self.inner.handle.write();
        if handle.fd.is_some() {
            return span.finish(Err(SocketError::AlreadyExists));
        }
        let native = span.finish(kind.native_type())?;

        let fd = span.finish(
            self.inner
                .transport
                .create(native, 0)
                .map_err(|e| SocketError::io("create", e)),
        )?;
        *handle = Handle {
            fd: Some(fd),
            owned: true,
        };
        span.record_fd(fd);
        debug!(fd, ?kind, transport = self.inner.transport.name(), "Created socket");
        Ok(())
    }

    pub fn bind(&self, address: &RpmsgSocketAddress) -> SocketResult<()> {
        let span = span_operation("bind");
        let _guard = span.enter();
        span.record_address(address.cpu_name(), address.socket_name());

        let fd = span.finish(self.inner.fd())?;
        span.record_fd(fd);
        span.finish(
            self.inner
                .transport
                .bind(fd, address)
                .map_err(|e| SocketError::io("bind", e)),
        )
    }

    pub fn listen(&self, backlog: i32) -> SocketResult<()> {
        let span = span_operation("listen");
        let _guard = span.enter();

        let fd = span.finish(self.inner.fd())?;
        span.record_fd(fd);
        span.finish(
            self.inner
                .transport
                .listen(fd, backlog)
                .map_err(|e| SocketError::io("listen", e)),
        )
    }

    /// Block until a peer connects and hand its descriptor to `accepted`
    pub fn accept(&self, accepted: &EndpointDescriptor) -> SocketResult<()> {
        let span = span_operation("accept");
        let _guard = span.enter();

        let fd = span.finish(self.inner.fd())?;
        span.record_fd(fd);
        if accepted.raw_fd().is_some() {
            return span.finish(Err(SocketError::AlreadyExists));
        }

        let peer = span.finish(
            self.inner
                .transport
                .accept(fd)
                .map_err(|e| SocketError::io("accept", e)),
        )?;

        let mut handle = accepted.inner.handle.write();
        if handle.fd.is_some() {
            drop(handle);
            if let Err(e) = self.inner.transport.close(peer) {
                warn!(fd = peer, error = %e, "Failed to discard accepted descriptor");
            }
            return span.finish(Err(SocketError::AlreadyExists));
        }
        *handle = Handle {
            fd: Some(peer),
            owned: true,
        };
        debug!(listener = fd, peer, "Accepted connection");
        span.record_result(true);
        Ok(())
    }

    /// Connect to `address`
    ///
    /// `timeout_ms` is accepted for API parity only; the transport decides
    /// how long a connect may block.
    pub fn connect(&self, address: &RpmsgSocketAddress, timeout_ms: Millis) -> SocketResult<()> {
        let span = span_operation("connect");
        let _guard = span.enter();
        span.record_address(address.cpu_name(), address.socket_name());

        let fd = span.finish(self.inner.fd())?;
        span.record_fd(fd);
        if timeout_ms != 0 {
            trace!(fd, timeout_ms, "connect timeout not enforced");
        }
        span.finish(
            self.inner
                .transport
                .connect(fd, address)
                .map_err(|e| SocketError::io("connect", e)),
        )
    }

    /// Close the descriptor; adopted descriptors are detached, not closed
    ///
    /// Fails with `NotCreated` when there is nothing to close.
    pub fn close(&self) -> SocketResult<()> {
        self.inner.close()
    }

    /// Close unless adopted; closing twice is a successful no-op
    pub fn release(&self) -> SocketResult<()> {
        self.inner.release()
    }

    /// Half-close one direction
    pub fn shutdown(&self, how: Shutdown) -> SocketResult<()> {
        let fd = self.inner.fd()?;
        self.inner
            .transport
            .shutdown(fd, how)
            .map_err(|e| SocketError::io("shutdown", e))
    }

    pub fn get_option(&self, option: SocketOption) -> SocketResult<i32> {
        let fd = self.inner.fd()?;
        let transport = self.inner.transport();
        match option {
            SocketOption::Timeout => {
                let timeout = transport
                    .get_timeout_option(fd, TimeoutOption::Send)
                    .map_err(|e| SocketError::io("getsockopt", e))?;
                Ok(i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX))
            }
            SocketOption::ReceiveBufferSize => transport
                .get_buffer_option(fd, BufferOption::Receive)
                .map_err(|e| SocketError::io("getsockopt", e)),
            SocketOption::SendBufferSize => transport
                .get_buffer_option(fd, BufferOption::Send)
                .map_err(|e| SocketError::io("getsockopt", e)),
        }
    }

    pub fn set_option(&self, option: SocketOption, value: i32) -> SocketResult<()> {
        let span = span_operation("set_option");
        let _guard = span.enter();

        if value < 0 {
            return span.finish(Err(SocketError::invalid_argument(format!(
                "negative value {} for {:?}",
                value, option
            ))));
        }
        let fd = span.finish(self.inner.fd())?;
        span.record_fd(fd);

        let transport = self.inner.transport();
        let result = match option {
            SocketOption::Timeout => {
                self.set_timeout(fd, Duration::from_millis(value as u64))
            }
            SocketOption::ReceiveBufferSize => transport
                .set_buffer_option(fd, BufferOption::Receive, value)
                .map_err(|e| SocketError::io("setsockopt", e)),
            SocketOption::SendBufferSize => transport
                .set_buffer_option(fd, BufferOption::Send, value)
                .map_err(|e| SocketError::io("setsockopt", e)),
        };
        span.finish(result)
    }

    /// Apply `timeout` to both directions or to neither
    fn set_timeout(&self, fd: RawDescriptor, timeout: Duration) -> SocketResult<()> {
        let _options = self.inner.option_lock.lock();
        let transport = self.inner.transport();

        let previous = transport
            .get_timeout_option(fd, TimeoutOption::Receive)
            .map_err(|e| SocketError::io("getsockopt", e))?;
        transport
            .set_timeout_option(fd, TimeoutOption::Receive, timeout)
            .map_err(|e| SocketError::io("setsockopt", e))?;

        if let Err(e) = transport.set_timeout_option(fd, TimeoutOption::Send, timeout) {
            if let Err(restore) =
                transport.set_timeout_option(fd, TimeoutOption::Receive, previous)
            {
                warn!(fd, error = %restore, "Failed to restore receive timeout");
            }
            return Err(SocketError::io("setsockopt", e));
        }
        Ok(())
    }

    /// The endpoint's input stream, created on first use
    pub fn input_stream(&self) -> SocketResult<Arc<SocketInputStream>> {
        self.inner.fd()?;
        Ok(Arc::clone(self.input.get_or_init(|| {
            Arc::new(SocketInputStream::new(Arc::clone(&self.inner)))
        })))
    }

    /// The endpoint's output stream, created on first use
    pub fn output_stream(&self) -> SocketResult<Arc<SocketOutputStream>> {
        self.inner.fd()?;
        Ok(Arc::clone(self.output.get_or_init(|| {
            Arc::new(SocketOutputStream::new(Arc::clone(&self.inner)))
        })))
    }

    /// Bytes readable without blocking
    pub fn available(&self) -> SocketResult<usize> {
        self.input_stream()?.available()
    }
}

impl fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handle = *self.inner.handle.read();
        f.debug_struct("EndpointDescriptor")
            .field("transport", &self.inner.transport.name())
            .field("fd", &handle.fd)
            .field("owned", &handle.owned)
            .finish()
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw_fd() {
            Some(fd) => write!(f, "{} fd:{}", self.inner.transport.name(), fd),
            None => write!(f, "{} fd:none", self.inner.transport.name()),
        }
    }
}
