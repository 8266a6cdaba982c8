//! # Murmur Core - Layer 1: Policies, Identifiers and Effect Interfaces
//!
//! Foundation types shared by every Murmur crate:
//! - The four policy axes (authentication, resolution, distribution, destination)
//!   and the compatibility validator that decides which combinations are legal
//! - Identifiers for members and communities, and the `Candidate` peer handle
//! - Effect traits for the external collaborators (scheduler, persistence,
//!   candidate resolution)
//! - Configuration types and the unified error type
//!
//! ## Design Principles
//!
//! - **Sum types per axis**: an illegal policy is unrepresentable, an illegal
//!   combination is rejected at exactly one validation boundary
//! - **Explicit handles**: collaborators are passed in as `Arc<dyn Trait>`,
//!   never reached through globals
//! - **No runtime here**: this crate has no async runtime dependency; handlers
//!   live in `murmur-effects`

pub mod candidate;
pub mod config;
pub mod effects;
pub mod errors;
pub mod identifiers;
pub mod policy;

pub use candidate::Candidate;
pub use config::{EndpointConfig, MurmurConfig, SchedulerConfig, SuspensionConfig};
pub use errors::{MurmurError, Result};
pub use identifiers::{CommunityId, MemberId};
pub use policy::{
    validate, Authentication, Destination, Distribution, PolicyAxis, PolicyConflict, PolicyKind,
    PolicySet, PolicyViolation, Resolution,
};
