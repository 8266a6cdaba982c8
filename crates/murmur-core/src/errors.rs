//! Unified error type for Murmur
//!
//! Every crate keeps its own focused `thiserror` enum for the failures it can
//! produce; all of them convert into `MurmurError` so callers at the edges
//! can work with a single type.

use crate::policy::PolicyViolation;
use serde::{Deserialize, Serialize};

/// Unified error type for all Murmur operations
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum MurmurError {
    /// Invalid input or configuration
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Illegal combination of message policies
    #[error("Policy violation: {message}")]
    Policy {
        /// Rendered list of policy conflicts
        message: String,
    },

    /// Persistence collaborator failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Network or transport error
    #[error("Network error: {message}")]
    Network {
        /// Error message describing the network issue
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl MurmurError {
    /// Create an invalid input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a policy violation error
    pub fn policy(message: impl Into<String>) -> Self {
        Self::Policy {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Standard Result type for Murmur operations
pub type Result<T> = std::result::Result<T, MurmurError>;

impl From<std::io::Error> for MurmurError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            std::io::ErrorKind::AddrInUse
            | std::io::ErrorKind::AddrNotAvailable
            | std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::WouldBlock => Self::network(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<PolicyViolation> for MurmurError {
    fn from(err: PolicyViolation) -> Self {
        Self::policy(err.to_string())
    }
}

impl From<toml::de::Error> for MurmurError {
    fn from(err: toml::de::Error) -> Self {
        Self::serialization(err.to_string())
    }
}
