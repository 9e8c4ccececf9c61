/*!
 * Core Types
 * Common types used across the socket layer
 */

use serde::{Deserialize, Serialize};
use std::os::fd::RawFd;

/// Native descriptor handed across the transport boundary
pub type RawDescriptor = RawFd;

/// Milliseconds, as used by the timeout option
pub type Millis = i32;

/// Which transport backend carries the sockets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// The remote-processor messaging family
    Rpmsg,
    /// Filesystem AF_UNIX sockets standing in for remote processors
    Unix,
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rpmsg" => Ok(Self::Rpmsg),
            "unix" | "loopback" => Ok(Self::Unix),
            other => Err(format!("unknown transport '{}'", other)),
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rpmsg => f.write_str("rpmsg"),
            Self::Unix => f.write_str("unix"),
        }
    }
}
