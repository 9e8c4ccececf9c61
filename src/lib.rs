/*!
 * Rpmsg Socket Library
 * Socket-style API over remote-processor messaging
 */

pub mod core;
pub mod monitoring;
pub mod net;

// Re-exports
pub use crate::core::errors::{SocketError, SocketResult};
pub use crate::core::limits::LISTEN_BACKLOG;
pub use crate::core::{TransportConfig, TransportKind};
pub use monitoring::{init_tracing, span_operation};
pub use net::{
    default_transport, EndpointDescriptor, RpmsgServerSocket, RpmsgSocket, RpmsgSocketAddress,
    RpmsgTransport, SocketInputStream, SocketOption, SocketOutputStream, SocketType, Transport,
    UnixTransport,
};
