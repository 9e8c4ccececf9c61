/*!
 * Socket Options
 * The small option set exposed by rpmsg sockets
 */

use crate::core::errors::SocketError;
use crate::core::limits::{SO_RCVBUF, SO_SNDBUF, SO_TIMEOUT};

/// Options readable and writable through an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketOption {
    /// Receive buffer size in bytes
    ReceiveBufferSize,
    /// Send buffer size in bytes
    SendBufferSize,
    /// Send and receive timeout in milliseconds, `0` blocks forever
    Timeout,
}

impl SocketOption {
    /// Conventional option identifier
    pub fn id(self) -> i32 {
        match self {
            Self::ReceiveBufferSize => SO_RCVBUF,
            Self::SendBufferSize => SO_SNDBUF,
            Self::Timeout => SO_TIMEOUT,
        }
    }
}

impl TryFrom<i32> for SocketOption {
    type Error = SocketError;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        match id {
            SO_RCVBUF => Ok(Self::ReceiveBufferSize),
            SO_SNDBUF => Ok(Self::SendBufferSize),
            SO_TIMEOUT => Ok(Self::Timeout),
            other => Err(SocketError::UnsupportedOption(other)),
        }
    }
}
