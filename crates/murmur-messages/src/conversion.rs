//! Wire codecs
//!
//! Every packet starts with a 22-byte prefix (two version bytes and the
//! community cid) that selects its [`Conversion`]. The byte after the prefix
//! names the message type; the rest is the body.
//!
//! ```text
//! | protocol_version:u8 | community_version:u8 | cid:[u8;20] | type:u8 | body |
//! ```

use crate::definition::MessageDefinition;
use crate::error::CodecError;
use crate::instance::MessageInstance;
use crate::values::PolicyValues;
use murmur_core::identifiers::IDENTIFIER_LEN;
use murmur_core::CommunityId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Length of the version prefix.
pub const PREFIX_LEN: usize = 2 + IDENTIFIER_LEN;

/// Length of the prefix plus the message-type byte.
pub const HEADER_LEN: usize = PREFIX_LEN + 1;

/// Version prefix selecting a conversion.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversionPrefix([u8; PREFIX_LEN]);

impl ConversionPrefix {
    /// Prefix for a community at the given versions.
    pub fn new(protocol_version: u8, community_version: u8, community: CommunityId) -> Self {
        let mut bytes = [0u8; PREFIX_LEN];
        bytes[0] = protocol_version;
        bytes[1] = community_version;
        bytes[2..].copy_from_slice(&community.cid);
        Self(bytes)
    }

    /// Read the prefix from the start of a packet.
    pub fn read(packet: &[u8]) -> Result<Self, CodecError> {
        let bytes = packet
            .get(..PREFIX_LEN)
            .ok_or(CodecError::Truncated { len: packet.len() })?;
        let mut prefix = [0u8; PREFIX_LEN];
        prefix.copy_from_slice(bytes);
        Ok(Self(prefix))
    }

    /// Raw prefix bytes.
    pub fn as_bytes(&self) -> &[u8; PREFIX_LEN] {
        &self.0
    }
}

impl fmt::Debug for ConversionPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConversionPrefix({self})")
    }
}

impl fmt::Display for ConversionPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Decoded body of a packet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedBody {
    /// Policy values
    pub values: PolicyValues,
    /// Opaque application payload
    pub payload: Vec<u8>,
}

/// Codec between message instances and wire bytes.
pub trait Conversion: Send + Sync {
    /// Prefix this conversion writes and accepts.
    fn prefix(&self) -> ConversionPrefix;

    /// Encode `message` including prefix and type byte.
    fn encode(&self, message: &MessageInstance) -> Result<Vec<u8>, CodecError>;

    /// Name of the definition the packet's type byte refers to.
    fn decode_definition_name(&self, packet: &[u8]) -> Result<String, CodecError>;

    /// Decode policy values and payload of a packet of `definition`.
    fn decode(
        &self,
        definition: &MessageDefinition,
        packet: &[u8],
    ) -> Result<DecodedBody, CodecError>;
}

#[derive(Serialize)]
struct BodyRef<'a> {
    values: &'a PolicyValues,
    payload: &'a [u8],
}

/// Prefix, type byte, then a bincode body.
pub struct BinaryConversion {
    prefix: ConversionPrefix,
    types_by_name: HashMap<String, u8>,
    names_by_type: HashMap<u8, String>,
}

impl BinaryConversion {
    /// Conversion for `community` with an empty type table.
    pub fn new(community: CommunityId, protocol_version: u8, community_version: u8) -> Self {
        Self {
            prefix: ConversionPrefix::new(protocol_version, community_version, community),
            types_by_name: HashMap::new(),
            names_by_type: HashMap::new(),
        }
    }

    /// Assign wire type `byte` to the definition called `name`.
    pub fn define(&mut self, name: impl Into<String>, byte: u8) -> Result<(), CodecError> {
        let name = name.into();
        if self.types_by_name.contains_key(&name) || self.names_by_type.contains_key(&byte) {
            return Err(CodecError::DuplicateType { byte, name });
        }
        self.types_by_name.insert(name.clone(), byte);
        self.names_by_type.insert(byte, name);
        Ok(())
    }

    /// Builder form of [`define`](Self::define).
    pub fn with_type(mut self, name: impl Into<String>, byte: u8) -> Result<Self, CodecError> {
        self.define(name, byte)?;
        Ok(self)
    }

    /// Type byte assigned to `name`.
    pub fn type_of(&self, name: &str) -> Option<u8> {
        self.types_by_name.get(name).copied()
    }

    fn check_header(&self, packet: &[u8]) -> Result<u8, CodecError> {
        if packet.len() < HEADER_LEN {
            return Err(CodecError::Truncated { len: packet.len() });
        }
        if ConversionPrefix::read(packet)? != self.prefix {
            return Err(CodecError::PrefixMismatch);
        }
        Ok(packet[PREFIX_LEN])
    }
}

impl Conversion for BinaryConversion {
    fn prefix(&self) -> ConversionPrefix {
        self.prefix
    }

    fn encode(&self, message: &MessageInstance) -> Result<Vec<u8>, CodecError> {
        let byte = self
            .type_of(message.name())
            .ok_or_else(|| CodecError::UnknownDefinition {
                name: message.name().to_string(),
            })?;
        let body = bincode::serialize(&BodyRef {
            values: message.values(),
            payload: message.payload(),
        })?;

        let mut packet = Vec::with_capacity(HEADER_LEN + body.len());
        packet.extend_from_slice(self.prefix.as_bytes());
        packet.push(byte);
        packet.extend_from_slice(&body);
        Ok(packet)
    }

    fn decode_definition_name(&self, packet: &[u8]) -> Result<String, CodecError> {
        let byte = self.check_header(packet)?;
        self.names_by_type
            .get(&byte)
            .cloned()
            .ok_or(CodecError::UnknownType { byte })
    }

    fn decode(
        &self,
        definition: &MessageDefinition,
        packet: &[u8],
    ) -> Result<DecodedBody, CodecError> {
        let byte = self.check_header(packet)?;
        if self.type_of(definition.name()) != Some(byte) {
            return Err(CodecError::UnknownType { byte });
        }
        Ok(bincode::deserialize(&packet[HEADER_LEN..])?)
    }
}
