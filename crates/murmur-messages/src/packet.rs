//! Undecoded inbound packets

use crate::batch::BatchConfiguration;
use crate::conversion::Conversion;
use crate::definition::MessageDefinition;
use crate::error::MessageError;
use crate::instance::MessageInstance;
use murmur_core::Candidate;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Packet whose definition is known but whose body is decoded only when
/// first needed. Name, database id and callbacks come from the definition.
pub struct RawPacket {
    definition: Arc<MessageDefinition>,
    bytes: Vec<u8>,
    conversion: Arc<dyn Conversion>,
    candidate: Option<Candidate>,
    message: OnceCell<MessageInstance>,
}

impl RawPacket {
    /// Wrap `bytes` of `definition`; nothing is decoded yet.
    pub fn parse(
        definition: Arc<MessageDefinition>,
        bytes: Vec<u8>,
        conversion: Arc<dyn Conversion>,
        candidate: Option<Candidate>,
    ) -> Self {
        Self {
            definition,
            bytes,
            conversion,
            candidate,
            message: OnceCell::new(),
        }
    }

    /// Definition of this packet.
    pub fn definition(&self) -> &Arc<MessageDefinition> {
        &self.definition
    }

    /// Definition name.
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// Persistence id of the definition.
    pub fn database_id(&self) -> u32 {
        self.definition.database_id()
    }

    /// Batching parameters of the definition.
    pub fn batch(&self) -> &BatchConfiguration {
        self.definition.batch()
    }

    /// Raw wire bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Peer the packet came from.
    pub fn candidate(&self) -> Option<Candidate> {
        self.candidate
    }

    /// Give up the packet, keeping only its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Whether the body has been decoded.
    pub fn is_decoded(&self) -> bool {
        self.message.get().is_some()
    }

    /// Decoded message, decoding on first access.
    pub fn message(&self) -> Result<&MessageInstance, MessageError> {
        self.message.get_or_try_init(|| self.decode())
    }

    /// Take the decoded message, decoding if needed.
    pub fn into_message(self) -> Result<MessageInstance, MessageError> {
        match self.message.into_inner() {
            Some(message) => Ok(message),
            None => {
                let body = self.conversion.decode(&self.definition, &self.bytes)?;
                MessageInstance::from_packet(
                    self.definition,
                    body,
                    self.conversion,
                    self.bytes,
                    self.candidate,
                )
            }
        }
    }

    fn decode(&self) -> Result<MessageInstance, MessageError> {
        let body = self.conversion.decode(&self.definition, &self.bytes)?;
        MessageInstance::from_packet(
            self.definition.clone(),
            body,
            self.conversion.clone(),
            self.bytes.clone(),
            self.candidate,
        )
    }
}

impl fmt::Debug for RawPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawPacket")
            .field("name", &self.name())
            .field("len", &self.bytes.len())
            .field("candidate", &self.candidate)
            .field("decoded", &self.is_decoded())
            .finish()
    }
}
