/*!
 * Rpmsg Networking
 * Socket API over inter-processor messaging
 *
 * Leaves first: addresses, the native transport boundary, descriptors,
 * then the public client and server sockets.
 */

pub mod address;
pub mod descriptor;
pub mod server;
pub mod socket;
pub mod transport;

pub use address::RpmsgSocketAddress;
pub use descriptor::{
    EndpointDescriptor, SocketInputStream, SocketOption, SocketOutputStream, SocketType,
};
pub use server::RpmsgServerSocket;
pub use socket::RpmsgSocket;
pub use transport::{default_transport, RpmsgTransport, Transport, UnixTransport};
