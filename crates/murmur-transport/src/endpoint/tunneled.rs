//! Endpoint riding on an external tunnel transport

use super::{resolve, Endpoint};
use crate::counters::ByteCounters;
use crate::inbound::{InboundBatch, InboundSink};
use crate::tunnel::TUNNEL_SESSION;
use murmur_core::effects::CandidateResolver;
use murmur_core::Candidate;
use parking_lot::Mutex;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

/// Tunnel transport that carries overlay datagrams in a reserved session.
pub trait TunnelTransport: Send + Sync {
    /// Send `data` to `address` over `session`.
    fn send_tunnel(&self, session: u32, address: SocketAddr, data: &[u8]) -> io::Result<()>;

    /// Port the tunnel listens on.
    fn listen_port(&self) -> u16;
}

/// Endpoint delegating all transmission to a [`TunnelTransport`].
///
/// Packets are handed over unframed; the tunnel marks them itself. Everything
/// this endpoint receives arrived through the tunnel, so every inbound
/// candidate is tunneled.
pub struct TunnelEndpoint {
    tunnel: Arc<dyn TunnelTransport>,
    resolver: Arc<dyn CandidateResolver>,
    counters: ByteCounters,
    sink: InboundSink,
    send_lock: Mutex<()>,
}

impl TunnelEndpoint {
    /// Wrap `tunnel`, delivering inbound data to `sink`.
    pub fn new(
        tunnel: Arc<dyn TunnelTransport>,
        resolver: Arc<dyn CandidateResolver>,
        sink: InboundSink,
    ) -> Self {
        Self {
            tunnel,
            resolver,
            counters: ByteCounters::default(),
            sink,
            send_lock: Mutex::new(()),
        }
    }

    /// Called by the tunnel for each datagram received in the overlay session.
    pub fn data_came_in(&self, session: u32, address: SocketAddr, data: Vec<u8>) {
        if session != TUNNEL_SESSION {
            tracing::debug!(session, "Ignoring datagram from foreign tunnel session");
            return;
        }
        self.counters.add_down(data.len());
        self.sink.try_deliver(
            InboundBatch {
                packets: vec![(Candidate::new(address, true), data)],
            },
            &self.counters,
        );
    }
}

impl Endpoint for TunnelEndpoint {
    fn address(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.tunnel.listen_port()))
    }

    fn send(&self, candidates: &[Candidate], packets: &[Vec<u8>]) -> bool {
        if candidates.is_empty() || packets.is_empty() {
            return false;
        }

        let _guard = self.send_lock.lock();
        let mut ok = true;
        for candidate in candidates {
            let Some(address) = resolve(self.resolver.as_ref(), candidate) else {
                continue;
            };
            for packet in packets {
                match self.tunnel.send_tunnel(TUNNEL_SESSION, address, packet) {
                    Ok(()) => self.counters.add_up(packet.len()),
                    Err(e) => {
                        tracing::warn!(%address, error = %e, "Tunnel send failed");
                        ok = false;
                    }
                }
            }
        }
        ok
    }

    fn total_up(&self) -> u64 {
        self.counters.total_up()
    }

    fn total_down(&self) -> u64 {
        self.counters.total_down()
    }

    fn total_dropped(&self) -> u64 {
        self.counters.total_dropped()
    }
}
