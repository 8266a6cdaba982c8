//! Transport errors

use murmur_core::MurmurError;
use std::net::IpAddr;

/// Failures setting up or running an endpoint.
///
/// Per-datagram send failures are not errors: they are logged and reflected
/// in the boolean result of `send`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No port in the scanned range could be bound
    #[error("Could not bind {ip} on ports {first_port}..+{attempts}: {reason}")]
    Bind {
        /// Requested address
        ip: IpAddr,
        /// First port tried
        first_port: u16,
        /// Ports tried
        attempts: u16,
        /// Last bind failure
        reason: String,
    },

    /// Socket option or conversion failure
    #[error("Socket error: {0}")]
    Socket(#[from] std::io::Error),

    /// Receive task was started twice
    #[error("Endpoint already started")]
    AlreadyStarted,

    /// Receive task panicked or was cancelled
    #[error("Receive task failed: {reason}")]
    ReceiveTask {
        /// Join failure
        reason: String,
    },
}

impl From<TransportError> for MurmurError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::AlreadyStarted => Self::invalid(err.to_string()),
            TransportError::ReceiveTask { .. } => Self::internal(err.to_string()),
            _ => Self::network(err.to_string()),
        }
    }
}
