//! Per-community message context
//!
//! A `Community` is the explicit handle through which definitions find their
//! store, their cached database ids and the community's conversions. Nothing
//! in the message layer reaches for global state.

use crate::conversion::{Conversion, ConversionPrefix};
use crate::definition::MessageDefinition;
use crate::error::{CodecError, MessageError};
use crate::packet::RawPacket;
use murmur_core::effects::{MessageStore, StoreError};
use murmur_core::{Candidate, CommunityId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Message context of one community.
pub struct Community {
    id: CommunityId,
    store: Arc<dyn MessageStore>,
    meta_messages: Mutex<HashMap<String, u32>>,
    definitions: RwLock<HashMap<String, Arc<MessageDefinition>>>,
    conversions: RwLock<HashMap<ConversionPrefix, Arc<dyn Conversion>>>,
    default_conversion: RwLock<Option<Arc<dyn Conversion>>>,
}

impl Community {
    /// Empty context backed by `store`.
    pub fn new(id: CommunityId, store: Arc<dyn MessageStore>) -> Self {
        Self {
            id,
            store,
            meta_messages: Mutex::new(HashMap::new()),
            definitions: RwLock::new(HashMap::new()),
            conversions: RwLock::new(HashMap::new()),
            default_conversion: RwLock::new(None),
        }
    }

    /// Community identity.
    pub fn id(&self) -> CommunityId {
        self.id
    }

    /// Persistence collaborator.
    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Register a conversion; the first one, or any added with
    /// `make_default`, becomes the default for outgoing messages.
    pub fn add_conversion(&self, conversion: Arc<dyn Conversion>, make_default: bool) {
        let prefix = conversion.prefix();
        self.conversions.write().insert(prefix, conversion.clone());

        let mut default = self.default_conversion.write();
        if make_default || default.is_none() {
            *default = Some(conversion);
        }
        tracing::debug!(community = %self.id, prefix = %prefix, make_default, "Added conversion");
    }

    /// Conversion used for messages created without an explicit one.
    pub fn default_conversion(&self) -> Result<Arc<dyn Conversion>, MessageError> {
        self.default_conversion
            .read()
            .clone()
            .ok_or(MessageError::NoDefaultConversion)
    }

    /// Conversion selected by the packet's version prefix.
    pub fn conversion_for(&self, packet: &[u8]) -> Result<Arc<dyn Conversion>, CodecError> {
        let prefix = ConversionPrefix::read(packet)?;
        self.conversions
            .read()
            .get(&prefix)
            .cloned()
            .ok_or_else(|| CodecError::UnknownConversion {
                prefix: prefix.to_string(),
            })
    }

    /// Database id of the message type `name`, inserting it on first use.
    ///
    /// The lock is held across the insert so concurrent first uses of the
    /// same name still insert once.
    pub fn meta_message_id(&self, name: &str) -> Result<u32, StoreError> {
        let mut cache = self.meta_messages.lock();
        if let Some(id) = cache.get(name) {
            return Ok(*id);
        }
        let id = self.store.insert_meta_message(self.id, name)?;
        tracing::debug!(community = %self.id, definition = name, id, "Registered message type");
        cache.insert(name.to_string(), id);
        Ok(id)
    }

    /// Make `definition` discoverable by name for inbound packets.
    pub fn register_definition(&self, definition: Arc<MessageDefinition>) {
        self.definitions
            .write()
            .insert(definition.name().to_string(), definition);
    }

    /// Definition registered under `name`.
    pub fn definition(&self, name: &str) -> Option<Arc<MessageDefinition>> {
        self.definitions.read().get(name).cloned()
    }

    /// Select conversion and definition for inbound bytes without decoding
    /// the body.
    pub fn packet_from_bytes(
        &self,
        bytes: Vec<u8>,
        candidate: Option<Candidate>,
    ) -> Result<RawPacket, CodecError> {
        let conversion = self.conversion_for(&bytes)?;
        let name = conversion.decode_definition_name(&bytes)?;
        let definition = self
            .definition(&name)
            .ok_or(CodecError::UndefinedMessage { name })?;
        Ok(RawPacket::parse(definition, bytes, conversion, candidate))
    }
}

impl std::fmt::Debug for Community {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Community")
            .field("id", &self.id)
            .field("definitions", &self.definitions.read().len())
            .finish_non_exhaustive()
    }
}
