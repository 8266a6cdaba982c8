//! # Murmur Transport - Layer 2: UDP Endpoints
//!
//! Endpoints move opaque packets between this node and candidates:
//! - [`DirectEndpoint`]: owns a UDP socket and a tokio receive task,
//!   queueing sends until the socket is writable again
//! - [`HostEndpoint`]: uses a host application's socket layer, queueing
//!   sends while the kernel buffer is full
//! - [`TunnelEndpoint`]: delegates to a tunnel transport
//! - [`DiscardEndpoint`]: placeholder that drops everything
//!
//! Received datagrams reach the processing side only through the bounded
//! [`inbound_channel`]. Tunneled candidates get the four byte
//! [`TUNNEL_PREFIX`] on the wire.

pub mod counters;
pub mod endpoint;
pub mod error;
pub mod inbound;
mod send_queue;
pub mod tunnel;

pub use counters::ByteCounters;
pub use endpoint::{
    DatagramReceiver, DirectEndpoint, DiscardEndpoint, Endpoint, HostEndpoint, HostSocket,
    TransportHost, TunnelEndpoint, TunnelTransport,
};
pub use error::TransportError;
pub use inbound::{inbound_channel, InboundBatch, InboundReceiver, InboundSink};
pub use tunnel::{TUNNEL_PREFIX, TUNNEL_SESSION};
