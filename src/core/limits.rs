/*!
 * Socket Limits and Constants
 *
 * Centralized location for the fixed sizes and identifiers of the
 * remote-processor socket family.
 */

// =============================================================================
// LISTENING
// =============================================================================

/// Pending-connection queue length used by every listening socket
pub const LISTEN_BACKLOG: i32 = 16;

// =============================================================================
// ADDRESS LAYOUT
// =============================================================================

/// Size of the NUL-terminated cpu field of `sockaddr_rpmsg`
pub const RPMSG_SOCKET_CPU_SIZE: usize = 16;

/// Size of the NUL-terminated name field of `sockaddr_rpmsg`
pub const RPMSG_SOCKET_NAME_SIZE: usize = 32;

/// Address family number of the remote-processor socket family
/// Not assigned upstream; vendor kernels pick it, so it can be overridden
/// through `RPMSG_ADDRESS_FAMILY`.
pub const DEFAULT_AF_RPMSG: i32 = 46;

/// Usable bytes of `sockaddr_un::sun_path` (one byte reserved for NUL)
pub const UNIX_SUN_PATH_MAX: usize = 107;

// =============================================================================
// OPTION IDENTIFIERS
// =============================================================================

/// Combined send/receive timeout in milliseconds
pub const SO_TIMEOUT: i32 = 0x1006;

/// Receive buffer size
pub const SO_RCVBUF: i32 = 0x1002;

/// Send buffer size
pub const SO_SNDBUF: i32 = 0x1001;

// =============================================================================
// LOOPBACK TRANSPORT DEFAULTS
// =============================================================================

/// Directory holding the loopback transport's socket files
pub const DEFAULT_SOCKET_DIR: &str = "/tmp/rpmsg-sockets";

/// Cpu name the loopback transport answers to for the empty (local) cpu
pub const DEFAULT_LOCAL_CPU: &str = "ap";
