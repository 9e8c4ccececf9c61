/*!
 * Unix Loopback Transport
 * Stands in for remote processors with filesystem `AF_UNIX` sockets
 *
 * Every `(cpu, name)` maps onto `<dir>/<cpu>:<name>`; the empty cpu is the
 * configured local cpu, so a server bound to the local namespace is
 * reachable both as `("", name)` and as `(local_cpu, name)`.
 *
 * A name is released when the descriptor bound to it is closed, like an
 * rpmsg endpoint. Socket files left behind by a crashed process are
 * reclaimed on bind once nothing accepts connections on them.
 */

use super::sys;
use super::Transport;
use crate::core::limits::UNIX_SUN_PATH_MAX;
use crate::core::types::RawDescriptor;
use crate::net::address::RpmsgSocketAddress;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

/// Loopback backend rooted at a socket directory
#[derive(Debug)]
pub struct UnixTransport {
    dir: PathBuf,
    local_cpu: String,
    /// Socket file owned by each bound descriptor
    bound: Mutex<HashMap<RawDescriptor, PathBuf>>,
}

impl UnixTransport {
    pub fn new(dir: impl Into<PathBuf>, local_cpu: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            local_cpu: local_cpu.into(),
            bound: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn local_cpu(&self) -> &str {
        &self.local_cpu
    }

    /// Filesystem path standing for `address`
    pub fn path_for(&self, address: &RpmsgSocketAddress) -> io::Result<PathBuf> {
        let name = address.socket_name();
        if name.is_empty() || name.contains('/') || name.contains('\0') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid socket name '{}'", name),
            ));
        }
        let cpu = if address.is_local() {
            self.local_cpu.as_str()
        } else {
            address.cpu_name()
        };
        if cpu.contains('/') || cpu.contains('\0') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid cpu name '{}'", cpu),
            ));
        }
        Ok(self.dir.join(format!("{}:{}", cpu, name)))
    }

    /// Socket file currently held by `fd`, if it was bound here
    pub fn bound_path(&self, fd: RawDescriptor) -> Option<PathBuf> {
        self.bound.lock().get(&fd).cloned()
    }

    /// Remove `path` if it is a socket file nobody listens on anymore
    fn reclaim_stale(path: &Path) -> bool {
        match UnixStream::connect(path) {
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                match std::fs::remove_file(path) {
                    Ok(()) => {
                        debug!(path = %path.display(), "Removed stale socket file");
                        true
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Failed to remove stale socket file");
                        false
                    }
                }
            }
            _ => false,
        }
    }

    fn sockaddr(&self, address: &RpmsgSocketAddress) -> io::Result<libc::sockaddr_un> {
        let path = self.path_for(address)?;
        let bytes = path.as_os_str().as_bytes();
        if bytes.len() > UNIX_SUN_PATH_MAX {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("socket path too long: {}", path.display()),
            ));
        }

        let mut raw: libc::sockaddr_un = unsafe { std::mem::zeroed() };
        raw.sun_family = libc::AF_UNIX as libc::sa_family_t;
        for (slot, byte) in raw.sun_path.iter_mut().zip(bytes) {
            *slot = *byte as libc::c_char;
        }
        Ok(raw)
    }
}

impl Transport for UnixTransport {
    fn name(&self) -> &'static str {
        "unix"
    }

    fn create(&self, sock_type: i32, protocol: i32) -> io::Result<RawDescriptor> {
        let fd = sys::socket(libc::AF_UNIX, sock_type, protocol)?;
        trace!(fd, sock_type, "loopback socket allocated");
        Ok(fd)
    }

    fn bind(&self, fd: RawDescriptor, address: &RpmsgSocketAddress) -> io::Result<()> {
        let path = self.path_for(address)?;
        let raw = self.sockaddr(address)?;
        std::fs::create_dir_all(&self.dir)?;

        match sys::bind(fd, &raw) {
            Err(e) if e.raw_os_error() == Some(libc::EADDRINUSE) && Self::reclaim_stale(&path) => {
                sys::bind(fd, &raw)?
            }
            other => other?,
        }
        self.bound.lock().insert(fd, path);
        Ok(())
    }

    fn connect(&self, fd: RawDescriptor, address: &RpmsgSocketAddress) -> io::Result<()> {
        let raw = self.sockaddr(address)?;
        sys::connect(fd, &raw)
    }

    fn close(&self, fd: RawDescriptor) -> io::Result<()> {
        // Unlink first: once closed, the descriptor number may be reused
        if let Some(path) = self.bound.lock().remove(&fd) {
            match std::fs::remove_file(&path) {
                Ok(()) => trace!(fd, path = %path.display(), "socket file removed"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(fd, path = %path.display(), error = %e, "Failed to remove socket file"),
            }
        }
        sys::close(fd)
    }
}
