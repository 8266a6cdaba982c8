//! # Murmur Messages - Layer 4: Message Protocol
//!
//! Everything between policy validation and the wire:
//! - [`MessageDefinition`]: a message type, validated once at construction
//!   and registered with its [`Community`]
//! - [`MessageInstance`] and [`RawPacket`]: concrete messages with lazily
//!   encoded or lazily decoded bytes
//! - [`Conversion`] and [`BinaryConversion`]: the prefixed wire codec
//! - [`suspension`]: the delay/drop outcome type and the suspend/resume
//!   protocol for messages with missing dependencies
//! - [`MessageProcessor`]: the single-threaded validate/apply pipeline
//!
//! ## Usage
//!
//! ```rust,ignore
//! let community = Arc::new(Community::new(id, store));
//! community.add_conversion(Arc::new(BinaryConversion::new(id, 0, 1).with_type("vote", 1)?), true);
//!
//! let vote = MessageDefinition::new(&community, "vote", policies, callbacks, None)?;
//! let message = MessageInstance::from_values(&community, vote, values, payload, None)?;
//! let bytes = message.packet()?;
//! ```

pub mod batch;
pub mod community;
pub mod conversion;
pub mod definition;
pub mod error;
pub mod instance;
pub mod packet;
pub mod processor;
pub mod suspension;
pub mod values;

#[cfg(test)]
mod test_support;

pub use batch::BatchConfiguration;
pub use community::Community;
pub use conversion::{BinaryConversion, Conversion, ConversionPrefix, DecodedBody};
pub use definition::{MessageCallbacks, MessageDefinition};
pub use error::{CodecError, DefinitionError, MessageError};
pub use instance::MessageInstance;
pub use packet::RawPacket;
pub use processor::{MessageProcessor, ProcessorStats, RequestSink};
pub use suspension::{
    Delay, DelayId, Dependency, DependencyKind, DependencyRequest, RequestBody, Suspended,
    SuspensionError, SuspensionRegistry, Verdict,
};
pub use values::{
    AuthenticationValue, DestinationValue, DistributionValue, EffectiveResolution, PolicyValues,
    ResolutionValue,
};
