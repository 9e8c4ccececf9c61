/*!
 * Endpoint Descriptors
 * Lifecycle and I/O of a single native socket
 */

mod endpoint;
mod guard;
mod kind;
mod options;
mod stream;

pub use endpoint::EndpointDescriptor;
pub use guard::CreationGuard;
pub use kind::SocketType;
pub use options::SocketOption;
pub use stream::{SocketInputStream, SocketOutputStream};
