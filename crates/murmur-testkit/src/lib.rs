//! Murmur Testing Infrastructure
//!
//! Deterministic stand-ins for every external collaborator, so tests never
//! depend on wall-clock time, real storage or the network.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! Add this to your crate's `Cargo.toml` dev-dependencies:
//! ```toml
//! [dev-dependencies]
//! murmur-testkit = { path = "../murmur-testkit" }
//! ```
//!
//! Then in your tests:
//! ```rust,ignore
//! use murmur_testkit::*;
//!
//! #[test]
//! fn my_test() {
//!     let scheduler = Arc::new(ManualScheduler::new());
//!     let community = test_community(Arc::new(MemoryStore::new()));
//!     scheduler.advance(Duration::from_secs(10));
//! }
//! ```

pub mod fixtures;
pub mod logging;
pub mod requests;
pub mod scheduler;
pub mod store;
pub mod transport;

pub use fixtures::*;
pub use logging::init_test_tracing;
pub use requests::RecordingSink;
pub use scheduler::ManualScheduler;
pub use store::MemoryStore;
pub use transport::{MockHost, RecordingTunnel, ScriptedSocket};
