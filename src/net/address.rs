/*!
 * Endpoint Address
 * `(cpu, name)` pair identifying a socket on the local or a remote processor
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Address of an rpmsg endpoint
///
/// The empty cpu name denotes the local (abstract) namespace. Names are
/// handed to the transport as-is; length limits are enforced there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RpmsgSocketAddress {
    cpu: String,
    name: String,
}

impl RpmsgSocketAddress {
    /// Address of `name` on processor `cpu`
    pub fn new(cpu: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            cpu: cpu.into(),
            name: name.into(),
        }
    }

    /// Address of `name` in the local namespace
    pub fn local(name: impl Into<String>) -> Self {
        Self::new("", name)
    }

    #[inline]
    pub fn cpu_name(&self) -> &str {
        &self.cpu
    }

    #[inline]
    pub fn socket_name(&self) -> &str {
        &self.name
    }

    /// Whether the address targets the local namespace
    #[inline]
    pub fn is_local(&self) -> bool {
        self.cpu.is_empty()
    }
}

impl fmt::Display for RpmsgSocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            write!(f, "local:{}", self.name)
        } else {
            write!(f, "{}:{}", self.cpu, self.name)
        }
    }
}
