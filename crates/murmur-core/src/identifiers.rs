//! Member and community identifiers

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// Length in bytes of member and community identifiers.
pub const IDENTIFIER_LEN: usize = 20;

/// 20-byte member identifier.
///
/// Members are identified by the SHA-1 digest of their public key, so the
/// identifier can be computed by anyone holding the key and carried on the
/// wire without the key itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(pub [u8; IDENTIFIER_LEN]);

impl MemberId {
    /// Derive the identifier of the member owning `public_key`.
    pub fn from_public_key(public_key: &[u8]) -> Self {
        let digest = Sha1::digest(public_key);
        let mut bytes = [0u8; IDENTIFIER_LEN];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; IDENTIFIER_LEN] {
        &self.0
    }
}

impl fmt::Debug for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberId({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Identity of a protocol community.
///
/// `database_id` is the local persistence key, `cid` the globally shared
/// 20-byte community identifier that appears in every packet prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommunityId {
    /// Local persistence key of the community
    pub database_id: u64,
    /// Network-wide community identifier
    pub cid: [u8; IDENTIFIER_LEN],
}

impl CommunityId {
    /// Create a community identity.
    pub fn new(database_id: u64, cid: [u8; IDENTIFIER_LEN]) -> Self {
        Self { database_id, cid }
    }

    /// Derive the cid from the master member's public key.
    pub fn from_master_key(database_id: u64, master_public_key: &[u8]) -> Self {
        Self::new(database_id, MemberId::from_public_key(master_public_key).0)
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", hex::encode(&self.cid[..4]), self.database_id)
    }
}
