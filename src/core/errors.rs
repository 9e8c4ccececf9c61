/*!
 * Error Types
 * Socket error taxonomy with thiserror and miette diagnostics
 */

use miette::Diagnostic;
use std::io;
use thiserror::Error;

/// Result alias used across the socket layer
pub type SocketResult<T> = Result<T, SocketError>;

/// Socket lifecycle and transport errors
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum SocketError {
    #[error("socket not created")]
    #[diagnostic(
        code(socket::not_created),
        help("The descriptor was never created or has already been closed.")
    )]
    NotCreated,

    #[error("socket already has a descriptor")]
    #[diagnostic(
        code(socket::already_exists),
        help("create() may only run once per endpoint; close it before creating again.")
    )]
    AlreadyExists,

    #[error("already bound")]
    #[diagnostic(code(socket::already_bound), help("bind() may only succeed once per socket."))]
    AlreadyBound,

    #[error("already connected")]
    #[diagnostic(
        code(socket::already_connected),
        help("connect() may only succeed once per socket. Open a new socket for another peer.")
    )]
    AlreadyConnected,

    #[error("invalid argument: {0}")]
    #[diagnostic(code(socket::invalid_argument))]
    InvalidArgument(String),

    #[error("unknown socket option: {0:#x}")]
    #[diagnostic(
        code(socket::unsupported_option),
        help("Supported options are the receive buffer size, send buffer size and timeout.")
    )]
    UnsupportedOption(i32),

    #[error("{op} failed: {source}")]
    #[diagnostic(code(socket::io))]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("operation not supported: {0}")]
    #[diagnostic(code(socket::unsupported))]
    Unsupported(&'static str),
}

impl SocketError {
    /// Wrap a native-boundary failure
    #[inline]
    pub fn io(op: &'static str, source: io::Error) -> Self {
        Self::Io { op, source }
    }

    /// Create an invalid argument error
    #[inline]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// OS error code carried by an I/O failure, if any
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Io { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// Whether this is a wrapped native-boundary failure
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

impl From<SocketError> for io::Error {
    fn from(err: SocketError) -> Self {
        let kind = match err {
            SocketError::Io { source, .. } => return source,
            SocketError::NotCreated => io::ErrorKind::NotConnected,
            SocketError::AlreadyExists
            | SocketError::AlreadyBound
            | SocketError::AlreadyConnected => io::ErrorKind::AlreadyExists,
            SocketError::InvalidArgument(_) | SocketError::UnsupportedOption(_) => {
                io::ErrorKind::InvalidInput
            }
            SocketError::Unsupported(_) => io::ErrorKind::Unsupported,
        };
        io::Error::new(kind, err)
    }
}
