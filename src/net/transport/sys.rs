/*!
 * Socket Syscalls
 * Family-independent native calls shared by every transport backend
 */

use super::{BufferOption, TimeoutOption};
use crate::core::types::RawDescriptor;
use nix::errno::Errno;
use nix::sys::socket::{self as nsock, sockopt, AddressFamily, Backlog, SockFlag, SockType};
use nix::sys::time::TimeVal;
use std::io;
use std::mem;
use std::net::Shutdown;
use std::os::fd::{BorrowedFd, IntoRawFd};
use std::time::Duration;

nix::ioctl_read_bad!(fionread, libc::FIONREAD, libc::c_int);

/// Socket address structure that can be passed to bind/connect as-is
///
/// # Safety
/// Implementors must be `#[repr(C)]` structures starting with a
/// `sa_family_t` field, as the kernel expects.
pub(super) unsafe trait RawSockaddr: Sized {
    fn socklen(&self) -> libc::socklen_t {
        mem::size_of::<Self>() as libc::socklen_t
    }
}

unsafe impl RawSockaddr for libc::sockaddr_un {}

#[inline]
fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

#[inline]
fn borrow(fd: RawDescriptor) -> BorrowedFd<'static> {
    // Descriptors reaching this layer are held open by the endpoint for the
    // duration of the call.
    unsafe { BorrowedFd::borrow_raw(fd) }
}

pub(super) fn socket(family: i32, sock_type: i32, protocol: i32) -> io::Result<RawDescriptor> {
    let ty = SockType::try_from(sock_type).map_err(io::Error::from)?;
    match AddressFamily::from_i32(family) {
        Some(domain) if protocol == 0 => {
            nsock::socket(domain, ty, SockFlag::SOCK_CLOEXEC, None)
                .map(IntoRawFd::into_raw_fd)
                .map_err(io::Error::from)
        }
        // Families nix has no variant for, AF_RPMSG among them
        _ => cvt(unsafe { libc::socket(family, sock_type | libc::SOCK_CLOEXEC, protocol) }),
    }
}

pub(super) fn bind<A: RawSockaddr>(fd: RawDescriptor, addr: &A) -> io::Result<()> {
    let ret = unsafe {
        libc::bind(
            fd,
            addr as *const A as *const libc::sockaddr,
            addr.socklen(),
        )
    };
    cvt(ret).map(drop)
}

pub(super) fn connect<A: RawSockaddr>(fd: RawDescriptor, addr: &A) -> io::Result<()> {
    let ret = unsafe {
        libc::connect(
            fd,
            addr as *const A as *const libc::sockaddr,
            addr.socklen(),
        )
    };
    cvt(ret).map(drop)
}

pub(super) fn listen(fd: RawDescriptor, backlog: i32) -> io::Result<()> {
    let backlog = Backlog::new(backlog).map_err(io::Error::from)?;
    nsock::listen(&borrow(fd), backlog).map_err(io::Error::from)
}

pub(super) fn accept(fd: RawDescriptor) -> io::Result<RawDescriptor> {
    loop {
        match nsock::accept4(fd, nsock::SockFlag::SOCK_CLOEXEC) {
            Err(Errno::EINTR) => continue,
            other => return other.map_err(io::Error::from),
        }
    }
}

pub(super) fn close(fd: RawDescriptor) -> io::Result<()> {
    nix::unistd::close(fd).map_err(io::Error::from)
}

pub(super) fn shutdown(fd: RawDescriptor, how: Shutdown) -> io::Result<()> {
    let how = match how {
        Shutdown::Read => nsock::Shutdown::Read,
        Shutdown::Write => nsock::Shutdown::Write,
        Shutdown::Both => nsock::Shutdown::Both,
    };
    nsock::shutdown(fd, how).map_err(io::Error::from)
}

pub(super) fn get_buffer_option(fd: RawDescriptor, option: BufferOption) -> io::Result<i32> {
    let fd = borrow(fd);
    let size = match option {
        BufferOption::Send => nsock::getsockopt(&fd, sockopt::SndBuf),
        BufferOption::Receive => nsock::getsockopt(&fd, sockopt::RcvBuf),
    }
    .map_err(io::Error::from)?;
    Ok(i32::try_from(size).unwrap_or(i32::MAX))
}

pub(super) fn set_buffer_option(
    fd: RawDescriptor,
    option: BufferOption,
    value: i32,
) -> io::Result<()> {
    let size = usize::try_from(value)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "negative buffer size"))?;
    let fd = borrow(fd);
    match option {
        BufferOption::Send => nsock::setsockopt(&fd, sockopt::SndBuf, &size),
        BufferOption::Receive => nsock::setsockopt(&fd, sockopt::RcvBuf, &size),
    }
    .map_err(io::Error::from)
}

pub(super) fn get_timeout_option(fd: RawDescriptor, option: TimeoutOption) -> io::Result<Duration> {
    let fd = borrow(fd);
    let tv = match option {
        TimeoutOption::Send => nsock::getsockopt(&fd, sockopt::SendTimeout),
        TimeoutOption::Receive => nsock::getsockopt(&fd, sockopt::ReceiveTimeout),
    }
    .map_err(io::Error::from)?;
    Ok(timeval_to_duration(&tv))
}

pub(super) fn set_timeout_option(
    fd: RawDescriptor,
    option: TimeoutOption,
    value: Duration,
) -> io::Result<()> {
    let tv = duration_to_timeval(value);
    let fd = borrow(fd);
    match option {
        TimeoutOption::Send => nsock::setsockopt(&fd, sockopt::SendTimeout, &tv),
        TimeoutOption::Receive => nsock::setsockopt(&fd, sockopt::ReceiveTimeout, &tv),
    }
    .map_err(io::Error::from)
}

pub(super) fn read(fd: RawDescriptor, buf: &mut [u8]) -> io::Result<usize> {
    nix::unistd::read(fd, buf).map_err(io::Error::from)
}

pub(super) fn write(fd: RawDescriptor, buf: &[u8]) -> io::Result<usize> {
    nix::unistd::write(borrow(fd), buf).map_err(io::Error::from)
}

pub(super) fn bytes_available(fd: RawDescriptor) -> io::Result<usize> {
    let mut pending: libc::c_int = 0;
    unsafe { fionread(fd, &mut pending) }.map_err(io::Error::from)?;
    Ok(pending.max(0) as usize)
}

fn duration_to_timeval(value: Duration) -> TimeVal {
    TimeVal::new(
        value.as_secs() as libc::time_t,
        value.subsec_micros() as libc::suseconds_t,
    )
}

fn timeval_to_duration(tv: &TimeVal) -> Duration {
    let secs = tv.tv_sec().max(0) as u64;
    let micros = tv.tv_usec().max(0) as u64;
    Duration::from_secs(secs) + Duration::from_micros(micros)
}
