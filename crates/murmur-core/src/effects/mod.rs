//! Effect interfaces for external collaborators
//!
//! Murmur never reaches its collaborators through globals. Everything that
//! needs deferred execution, persistence or candidate addressing receives an
//! explicit handle implementing one of these traits.
//!
//! Production handlers live in `murmur-effects`; deterministic test handlers
//! live in `murmur-testkit`.

pub mod resolver;
pub mod scheduler;
pub mod store;

pub use resolver::CandidateResolver;
pub use scheduler::{Scheduler, Task};
pub use store::{MessageStore, StoreError};
