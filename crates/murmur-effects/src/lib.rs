//! # Murmur Effects - Layer 3: Effect Handlers
//!
//! Production implementations of the collaborator traits declared in
//! `murmur-core::effects`:
//! - [`TaskLoop`]: the cooperative single-consumer scheduler backed by tokio
//! - [`StaticResolver`]: candidate addressing from the local node's known
//!   LAN/WAN addresses

pub mod resolver;
pub mod scheduler;

pub use resolver::StaticResolver;
pub use scheduler::TaskLoop;
