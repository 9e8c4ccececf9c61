/*!
 * Socket Kind
 */

use crate::core::errors::{SocketError, SocketResult};
use serde::{Deserialize, Serialize};

/// Socket type requested at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketType {
    /// Type not known (sockets wrapping an existing descriptor)
    Unspecified,
    Datagram,
    Stream,
}

impl SocketType {
    /// Raw identifier (0 unspecified, 1 datagram, 2 stream)
    pub fn id(self) -> i32 {
        match self {
            Self::Unspecified => 0,
            Self::Datagram => 1,
            Self::Stream => 2,
        }
    }

    /// OS socket type passed to the transport
    pub fn native_type(self) -> SocketResult<i32> {
        match self {
            Self::Stream => Ok(libc::SOCK_STREAM),
            Self::Datagram => Ok(libc::SOCK_DGRAM),
            Self::Unspecified => Err(SocketError::invalid_argument("unknown socket type")),
        }
    }
}

impl Default for SocketType {
    fn default() -> Self {
        Self::Stream
    }
}

impl TryFrom<i32> for SocketType {
    type Error = SocketError;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Self::Unspecified),
            1 => Ok(Self::Datagram),
            2 => Ok(Self::Stream),
            other => Err(SocketError::invalid_argument(format!(
                "unknown socket type {}",
                other
            ))),
        }
    }
}
