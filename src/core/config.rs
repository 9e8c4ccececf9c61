/*!
 * Transport Configuration
 *
 * Selects and parameterizes the native backend from the environment.
 */

use super::limits::{DEFAULT_AF_RPMSG, DEFAULT_LOCAL_CPU, DEFAULT_SOCKET_DIR};
use super::types::TransportKind;
use crate::net::transport::{RpmsgTransport, Transport, UnixTransport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Backend selection (`rpmsg` or `unix`)
pub const TRANSPORT_ENV: &str = "RPMSG_TRANSPORT";
/// Address family number override for the rpmsg backend
pub const ADDRESS_FAMILY_ENV: &str = "RPMSG_ADDRESS_FAMILY";
/// Socket directory of the unix backend
pub const SOCKET_DIR_ENV: &str = "RPMSG_SOCKET_DIR";
/// Cpu name the unix backend treats as local
pub const LOCAL_CPU_ENV: &str = "RPMSG_LOCAL_CPU";

/// Transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub kind: TransportKind,
    pub address_family: i32,
    pub socket_dir: PathBuf,
    pub local_cpu: String,
}

impl TransportConfig {
    /// Default configuration: the rpmsg family
    pub fn new() -> Self {
        Self {
            kind: TransportKind::Rpmsg,
            address_family: DEFAULT_AF_RPMSG,
            socket_dir: PathBuf::from(DEFAULT_SOCKET_DIR),
            local_cpu: DEFAULT_LOCAL_CPU.to_string(),
        }
    }

    /// Loopback configuration rooted at `dir`
    pub fn unix(dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: TransportKind::Unix,
            socket_dir: dir.into(),
            ..Self::new()
        }
    }

    /// Read configuration from the environment
    ///
    /// Environment variables:
    /// - RPMSG_TRANSPORT: `rpmsg` (default) or `unix`
    /// - RPMSG_ADDRESS_FAMILY: family number for the rpmsg backend
    /// - RPMSG_SOCKET_DIR: socket directory for the unix backend
    /// - RPMSG_LOCAL_CPU: cpu name answered by the unix backend
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Ok(value) = std::env::var(TRANSPORT_ENV) {
            match value.parse() {
                Ok(kind) => config.kind = kind,
                Err(e) => warn!(error = %e, "Ignoring {}", TRANSPORT_ENV),
            }
        }

        if let Ok(value) = std::env::var(ADDRESS_FAMILY_ENV) {
            match value.trim().parse::<i32>() {
                Ok(family) if family > 0 => config.address_family = family,
                _ => warn!(value = %value, "Ignoring invalid {}", ADDRESS_FAMILY_ENV),
            }
        }

        if let Ok(dir) = std::env::var(SOCKET_DIR_ENV) {
            if !dir.is_empty() {
                config.socket_dir = PathBuf::from(dir);
            }
        }

        if let Ok(cpu) = std::env::var(LOCAL_CPU_ENV) {
            if !cpu.is_empty() {
                config.local_cpu = cpu;
            }
        }

        config
    }

    /// Build the configured transport
    pub fn build(&self) -> Arc<dyn Transport> {
        match self.kind {
            TransportKind::Rpmsg => Arc::new(RpmsgTransport::with_family(self.address_family)),
            TransportKind::Unix => Arc::new(UnixTransport::new(
                self.socket_dir.clone(),
                self.local_cpu.clone(),
            )),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}
