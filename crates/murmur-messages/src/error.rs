//! Message layer errors
//!
//! Each concern keeps its own enum. All of them convert into
//! [`MurmurError`] for callers that only need the unified type.

use murmur_core::effects::StoreError;
use murmur_core::{MurmurError, PolicyAxis, PolicyKind, PolicyViolation};

/// Failure to construct a message definition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DefinitionError {
    /// The four policies may not co-occur
    #[error("Illegal policy combination for {name}: {violation}")]
    PolicyViolation {
        /// Definition name
        name: String,
        /// Every conflict found
        violation: PolicyViolation,
    },

    /// Dynamic resolution needs an undo callback
    #[error("{name} uses dynamic resolution and must provide an undo callback")]
    MissingUndoCallback {
        /// Definition name
        name: String,
    },

    /// Batch parameters are out of range
    #[error("Invalid batch configuration: {reason}")]
    InvalidBatchConfiguration {
        /// What is wrong
        reason: String,
    },

    /// Persisting the definition name failed
    #[error("Failed to register {name}: {source}")]
    Store {
        /// Definition name
        name: String,
        /// Underlying store failure
        source: StoreError,
    },
}

/// Wire encode/decode failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Fewer bytes than prefix plus type byte
    #[error("Packet truncated: {len} bytes")]
    Truncated {
        /// Received length
        len: usize,
    },

    /// No conversion is registered for the version prefix
    #[error("No conversion for prefix {prefix}")]
    UnknownConversion {
        /// Hex rendering of the prefix
        prefix: String,
    },

    /// The prefix belongs to a different conversion
    #[error("Prefix does not match this conversion")]
    PrefixMismatch,

    /// The message-type byte is not in the conversion's table
    #[error("Unknown message type byte {byte}")]
    UnknownType {
        /// Type byte read from the packet
        byte: u8,
    },

    /// The definition name is not in the conversion's table
    #[error("No type byte assigned to {name}")]
    UnknownDefinition {
        /// Definition name
        name: String,
    },

    /// A type byte or name was assigned twice
    #[error("Type byte {byte} or name {name} already assigned")]
    DuplicateType {
        /// Requested byte
        byte: u8,
        /// Requested name
        name: String,
    },

    /// The type byte maps to a name the community does not define
    #[error("Community has no definition named {name}")]
    UndefinedMessage {
        /// Definition name
        name: String,
    },

    /// The body could not be (de)serialized
    #[error("Malformed body: {reason}")]
    Body {
        /// Serializer error
        reason: String,
    },
}

impl From<bincode::Error> for CodecError {
    fn from(err: bincode::Error) -> Self {
        Self::Body {
            reason: err.to_string(),
        }
    }
}

/// Failure to build, decode or mutate a message instance.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MessageError {
    /// A policy value does not belong to the definition's policy
    #[error("Expected {expected} on the {axis} axis, found {found}")]
    PolicyMismatch {
        /// Axis of the mismatching value
        axis: PolicyAxis,
        /// Kind the definition declares
        expected: PolicyKind,
        /// Kind of the supplied value
        found: PolicyKind,
    },

    /// Multi-member value has the wrong number of signers or signature slots
    #[error("Expected {expected} signers, found {found}")]
    SignerCount {
        /// Count the definition declares
        expected: usize,
        /// Count supplied
        found: usize,
    },

    /// Sequence number presence disagrees with the definition
    #[error("Sequence number presence mismatch (required: {required})")]
    SequenceNumber {
        /// Whether the definition enables sequence numbers
        required: bool,
    },

    /// Signature offered by a member that is not a signer of this message
    #[error("Member {member} is not a signer of this message")]
    UnknownSigner {
        /// Hex rendering of the member id
        member: String,
    },

    /// Definition belongs to another community
    #[error("Definition {name} belongs to another community")]
    ForeignDefinition {
        /// Definition name
        name: String,
    },

    /// The community has no default conversion
    #[error("Community has no default conversion")]
    NoDefaultConversion,

    /// Undo requested for a definition without an undo callback
    #[error("{name} has no undo callback")]
    NotUndoable {
        /// Definition name
        name: String,
    },

    /// Wire encode/decode failed
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Persistence collaborator failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DefinitionError> for MurmurError {
    fn from(err: DefinitionError) -> Self {
        match err {
            DefinitionError::PolicyViolation { .. } => Self::policy(err.to_string()),
            DefinitionError::Store { .. } => Self::storage(err.to_string()),
            _ => Self::invalid(err.to_string()),
        }
    }
}

impl From<CodecError> for MurmurError {
    fn from(err: CodecError) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<MessageError> for MurmurError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::Codec(codec) => codec.into(),
            MessageError::Store(store) => store.into(),
            other => Self::invalid(other.to_string()),
        }
    }
}
