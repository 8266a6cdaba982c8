//! Concrete messages
//!
//! An instance binds policy values and a payload to its definition. Wire
//! bytes are produced lazily by the instance's conversion and cached until
//! something that affects them changes; `regenerate` drops the cache.

use crate::community::Community;
use crate::conversion::{Conversion, DecodedBody};
use crate::definition::MessageDefinition;
use crate::error::MessageError;
use crate::values::{AuthenticationValue, DestinationValue, DistributionValue, PolicyValues, ResolutionValue};
use murmur_core::effects::MessageStore;
use murmur_core::{Candidate, MemberId};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// One message of a definition.
#[derive(Clone)]
pub struct MessageInstance {
    definition: Arc<MessageDefinition>,
    values: PolicyValues,
    payload: Vec<u8>,
    conversion: Arc<dyn Conversion>,
    candidate: Option<Candidate>,
    packet: OnceCell<Vec<u8>>,
    packet_id: OnceCell<u64>,
}

impl MessageInstance {
    /// Build a message from its policy values.
    ///
    /// Without an explicit `conversion` the community's default is used.
    /// Values that do not match the definition's policies are rejected.
    pub fn from_values(
        community: &Community,
        definition: Arc<MessageDefinition>,
        values: PolicyValues,
        payload: Vec<u8>,
        conversion: Option<Arc<dyn Conversion>>,
    ) -> Result<Self, MessageError> {
        if definition.community() != community.id() {
            return Err(MessageError::ForeignDefinition {
                name: definition.name().to_string(),
            });
        }
        values.check(definition.policies())?;
        let conversion = match conversion {
            Some(conversion) => conversion,
            None => community.default_conversion()?,
        };

        Ok(Self {
            definition,
            values,
            payload,
            conversion,
            candidate: None,
            packet: OnceCell::new(),
            packet_id: OnceCell::new(),
        })
    }

    /// Rebuild a message decoded from `packet`; the bytes are kept as-is.
    pub(crate) fn from_packet(
        definition: Arc<MessageDefinition>,
        body: DecodedBody,
        conversion: Arc<dyn Conversion>,
        packet: Vec<u8>,
        candidate: Option<Candidate>,
    ) -> Result<Self, MessageError> {
        body.values.check(definition.policies())?;
        Ok(Self {
            definition,
            values: body.values,
            payload: body.payload,
            conversion,
            candidate,
            packet: OnceCell::with_value(packet),
            packet_id: OnceCell::new(),
        })
    }

    /// Record the peer this message came from or goes to.
    pub fn with_candidate(mut self, candidate: Candidate) -> Self {
        self.candidate = Some(candidate);
        self
    }

    /// Definition of this message.
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

    /// All four policy values.
    pub fn values(&self) -> &PolicyValues {
        &self.values
    }

    /// Signers and signatures.
    pub fn authentication(&self) -> &AuthenticationValue {
        &self.values.authentication
    }

    /// Resolution value.
    pub fn resolution(&self) -> &ResolutionValue {
        &self.values.resolution
    }

    /// Distribution value.
    pub fn distribution(&self) -> &DistributionValue {
        &self.values.distribution
    }

    /// Destination value.
    pub fn destination(&self) -> &DestinationValue {
        &self.values.destination
    }

    /// Opaque payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Codec used for this message.
    pub fn conversion(&self) -> &Arc<dyn Conversion> {
        &self.conversion
    }

    /// Peer this message came from, if any.
    pub fn candidate(&self) -> Option<Candidate> {
        self.candidate
    }

    /// Wire bytes, encoded on first access.
    pub fn packet(&self) -> Result<&[u8], MessageError> {
        let bytes = self
            .packet
            .get_or_try_init(|| self.conversion.encode(self))?;
        Ok(bytes)
    }

    /// Whether wire bytes are currently cached.
    pub fn is_encoded(&self) -> bool {
        self.packet.get().is_some()
    }

    /// Drop cached bytes so the next access re-encodes.
    pub fn regenerate(&mut self) {
        self.packet = OnceCell::new();
    }

    /// Replace cached bytes with externally produced ones.
    pub fn regenerate_with(&mut self, packet: Vec<u8>) {
        self.packet = OnceCell::with_value(packet);
    }

    /// Attach `member`'s signature. Cached bytes are left untouched; call
    /// [`regenerate`](Self::regenerate) once all signatures are in.
    pub fn sign_with(&mut self, member: MemberId, signature: Vec<u8>) -> Result<(), MessageError> {
        self.values.authentication.attach_signature(member, signature)
    }

    /// Storage position, once assigned.
    pub fn packet_id(&self) -> Option<u64> {
        self.packet_id.get().copied()
    }

    /// Persist the message and record its position. The store is asked at
    /// most once; later calls return the recorded position.
    pub fn assign_sequence_position(&self, store: &dyn MessageStore) -> Result<u64, MessageError> {
        let id = self.packet_id.get_or_try_init(|| {
            let packet = self.packet()?;
            store
                .assign_sequence_position(self.definition.community(), self.database_id(), packet)
                .map_err(MessageError::from)
        })?;
        Ok(*id)
    }
}

impl fmt::Debug for MessageInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageInstance")
            .field("name", &self.name())
            .field("values", &self.values)
            .field("payload_len", &self.payload.len())
            .field("candidate", &self.candidate)
            .field("packet_id", &self.packet_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{community_with_vote, vote_message, vote_values, CountingStore};
    use crate::values::ResolutionValue;
    use assert_matches::assert_matches;

    #[test]
    fn test_packet_is_cached() {
        let (community, vote) = community_with_vote();
        let message = vote_message(&community, &vote, 1);

        assert!(!message.is_encoded());
        let first = message.packet().unwrap().to_vec();
        assert!(message.is_encoded());
        assert_eq!(message.packet().unwrap(), first.as_slice());
    }

    #[test]
    fn test_regenerate_after_signing_changes_bytes() {
        let (community, vote) = community_with_vote();
        let mut message = vote_message(&community, &vote, 1);
        let unsigned = message.packet().unwrap().to_vec();

        let signer = message.authentication().members()[0];
        message.sign_with(signer, vec![7; 64]).unwrap();
        assert_eq!(message.packet().unwrap(), unsigned.as_slice());

        message.regenerate();
        assert_ne!(message.packet().unwrap(), unsigned.as_slice());
        assert!(message.authentication().is_signed());
    }

    #[test]
    fn test_regenerate_with_external_bytes() {
        let (community, vote) = community_with_vote();
        let mut message = vote_message(&community, &vote, 1);
        message.regenerate_with(vec![1, 2, 3]);
        assert_eq!(message.packet().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_mismatched_values_rejected() {
        let (community, vote) = community_with_vote();
        let mut values = vote_values(1);
        values.resolution = ResolutionValue::Public;

        assert_matches!(
            MessageInstance::from_values(&community, vote, values, Vec::new(), None),
            Err(MessageError::PolicyMismatch { .. })
        );
    }

    #[test]
    fn test_sequence_position_assigned_once() {
        let (community, vote) = community_with_vote();
        let message = vote_message(&community, &vote, 1);
        let store = CountingStore::default();

        assert_eq!(message.packet_id(), None);
        let first = message.assign_sequence_position(&store).unwrap();
        let second = message.assign_sequence_position(&store).unwrap();
        assert_eq!(first, second);
        assert_eq!(message.packet_id(), Some(first));
        assert_eq!(store.positions(), 1);
    }
}
