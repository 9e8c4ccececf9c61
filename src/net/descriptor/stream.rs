/*!
 * Socket Streams
 * Byte streams over a connected endpoint
 *
 * Each stream shares the endpoint's descriptor. Reads are serialized
 * against reads and writes against writes; a reader and a writer never
 * block each other.
 */

use super::endpoint::EndpointInner;
use crate::core::errors::{SocketError, SocketResult};
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::trace;

/// Read side of an endpoint
pub struct SocketInputStream {
    inner: Arc<EndpointInner>,
}

impl SocketInputStream {
    pub(super) fn new(inner: Arc<EndpointInner>) -> Self {
        Self { inner }
    }

    /// Bytes readable without blocking
    pub fn available(&self) -> SocketResult<usize> {
        let fd = self.inner.fd()?;
        self.inner
            .transport()
            .bytes_available(fd)
            .map_err(|e| SocketError::io("available", e))
    }

    /// Read up to `buf.len()` bytes; `Ok(0)` is end of stream
    pub fn read(&self, buf: &mut [u8]) -> SocketResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let _reader = self.inner.read_lock.lock();
        self.read_unlocked(buf)
    }

    /// Read a single byte; `None` at end of stream
    pub fn read_byte(&self) -> SocketResult<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Fill `buf` completely, without interleaving other readers
    pub fn read_exact(&self, buf: &mut [u8]) -> SocketResult<()> {
        let _reader = self.inner.read_lock.lock();
        let mut filled = 0;
        while filled < buf.len() {
            match self.read_unlocked(&mut buf[filled..]) {
                Ok(0) => {
                    return Err(SocketError::io(
                        "read",
                        io::Error::new(io::ErrorKind::UnexpectedEof, "peer closed the stream"),
                    ))
                }
                Ok(n) => filled += n,
                Err(SocketError::Io { source, .. })
                    if source.kind() == io::ErrorKind::Interrupted =>
                {
                    continue
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn read_unlocked(&self, buf: &mut [u8]) -> SocketResult<usize> {
        let fd = self.inner.fd()?;
        let n = self
            .inner
            .transport()
            .read(fd, buf)
            .map_err(|e| SocketError::io("read", e))?;
        trace!(fd, bytes = n, "read");
        Ok(n)
    }

    /// Close the underlying endpoint (both directions)
    pub fn close(&self) -> SocketResult<()> {
        self.inner.release()
    }
}

impl fmt::Debug for SocketInputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketInputStream")
            .field("fd", &self.inner.fd().ok())
            .finish()
    }
}

impl io::Read for &SocketInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SocketInputStream::read(*self, buf).map_err(io::Error::from)
    }
}

impl io::Read for SocketInputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        SocketInputStream::read(self, buf).map_err(io::Error::from)
    }
}

/// Write side of an endpoint
pub struct SocketOutputStream {
    inner: Arc<EndpointInner>,
}

impl SocketOutputStream {
    pub(super) fn new(inner: Arc<EndpointInner>) -> Self {
        Self { inner }
    }

    /// Write some of `buf`, returning how much was accepted
    pub fn write(&self, buf: &[u8]) -> SocketResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let _writer = self.inner.write_lock.lock();
        self.write_unlocked(buf)
    }

    pub fn write_byte(&self, byte: u8) -> SocketResult<()> {
        self.write_all(&[byte])
    }

    /// Write all of `buf`, without interleaving other writers
    pub fn write_all(&self, buf: &[u8]) -> SocketResult<()> {
        let _writer = self.inner.write_lock.lock();
        let mut written = 0;
        while written < buf.len() {
            match self.write_unlocked(&buf[written..]) {
                Ok(0) => {
                    return Err(SocketError::io(
                        "write",
                        io::Error::from(io::ErrorKind::WriteZero),
                    ))
                }
                Ok(n) => written += n,
                Err(SocketError::Io { source, .. })
                    if source.kind() == io::ErrorKind::Interrupted =>
                {
                    continue
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn write_unlocked(&self, buf: &[u8]) -> SocketResult<usize> {
        let fd = self.inner.fd()?;
        let n = self
            .inner
            .transport()
            .write(fd, buf)
            .map_err(|e| SocketError::io("write", e))?;
        trace!(fd, bytes = n, "write");
        Ok(n)
    }

    /// Writes go straight to the descriptor; nothing is buffered
    pub fn flush(&self) -> SocketResult<()> {
        Ok(())
    }

    /// Close the underlying endpoint (both directions)
    pub fn close(&self) -> SocketResult<()> {
        self.inner.release()
    }
}

impl fmt::Debug for SocketOutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketOutputStream")
            .field("fd", &self.inner.fd().ok())
            .finish()
    }
}

impl io::Write for &SocketOutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        SocketOutputStream::write(*self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for SocketOutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        SocketOutputStream::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
