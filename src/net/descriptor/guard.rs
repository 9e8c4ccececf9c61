/*!
 * Creation Guard
 *
 * RAII guard that closes a freshly created endpoint unless setup completes
 */

use super::endpoint::EndpointDescriptor;
use tracing::{debug, error};

/// Closes the endpoint on drop unless [`commit`](Self::commit) was called
///
/// # Example
///
/// ```rust,ignore
/// endpoint.create(SocketType::Stream)?;
/// let guard = CreationGuard::new(&endpoint, "server");
/// endpoint.bind(&address)?;
/// endpoint.listen(LISTEN_BACKLOG)?;
/// guard.commit();
/// ```
pub struct CreationGuard<'a> {
    endpoint: &'a EndpointDescriptor,
    context: &'static str,
    active: bool,
}

impl<'a> CreationGuard<'a> {
    pub fn new(endpoint: &'a EndpointDescriptor, context: &'static str) -> Self {
        Self {
            endpoint,
            context,
            active: true,
        }
    }

    /// Whether drop will still close the endpoint
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Keep the endpoint open
    pub fn commit(mut self) {
        self.active = false;
    }
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        match self.endpoint.release() {
            Ok(()) => debug!(context = self.context, "Closed partially set up endpoint"),
            Err(e) => error!(
                context = self.context,
                error = %e,
                "Failed to close partially set up endpoint"
            ),
        }
    }
}
