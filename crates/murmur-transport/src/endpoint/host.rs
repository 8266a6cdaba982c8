//! Endpoint running on a host application's socket layer
//!
//! The host owns the event loop: it creates the socket, calls back with
//! received datagrams and runs deferred tasks. When the kernel send buffer
//! is full, datagrams go into a FIFO send queue that a deferred task drains.
//! Once anything is queued, later sends queue behind it so ordering holds.

use super::{resolve, Endpoint};
use crate::counters::ByteCounters;
use crate::error::TransportError;
use crate::inbound::{InboundBatch, InboundSink};
use crate::send_queue::{Offer, SendQueue};
use crate::tunnel;
use murmur_core::effects::{CandidateResolver, Task};
use murmur_core::{Candidate, EndpointConfig};
use parking_lot::Mutex;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Non-blocking datagram socket provided by the host.
pub trait HostSocket: Send + Sync {
    /// Send one datagram; `WouldBlock` means the send buffer is full.
    fn send_to(&self, data: &[u8], address: SocketAddr) -> io::Result<usize>;

    /// Bound address.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// Callback the host invokes with received datagrams.
pub trait DatagramReceiver: Send + Sync {
    /// Datagrams received since the last call.
    fn data_came_in(&self, datagrams: Vec<(SocketAddr, Vec<u8>)>);
}

/// Socket factory, listener registration and timer of the host.
pub trait TransportHost: Send + Sync {
    /// Bind a UDP socket on `port`.
    fn create_udp_socket(&self, port: u16, address: IpAddr) -> io::Result<Arc<dyn HostSocket>>;

    /// Deliver datagrams received on `socket` to `receiver`.
    fn start_listening(&self, socket: Arc<dyn HostSocket>, receiver: Arc<dyn DatagramReceiver>);

    /// Run `task` once after `delay`.
    fn schedule(&self, task: Task, delay: Duration);
}

struct InboundPath {
    counters: Arc<ByteCounters>,
    sink: InboundSink,
}

impl DatagramReceiver for InboundPath {
    fn data_came_in(&self, datagrams: Vec<(SocketAddr, Vec<u8>)>) {
        // Some hosts call back with nothing
        if datagrams.is_empty() {
            return;
        }
        let batch = InboundBatch::from_datagrams(datagrams, &self.counters);
        self.sink.try_deliver(batch, &self.counters);
    }
}

/// Endpoint driven by a [`TransportHost`].
pub struct HostEndpoint {
    host: Arc<dyn TransportHost>,
    socket: Arc<dyn HostSocket>,
    address: SocketAddr,
    resolver: Arc<dyn CandidateResolver>,
    counters: Arc<ByteCounters>,
    queue: Mutex<SendQueue>,
    retry_delay: Duration,
    this: Weak<HostEndpoint>,
}

impl std::fmt::Debug for HostEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostEndpoint")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl HostEndpoint {
    /// Create a socket through the host, scanning upward from `config.port`,
    /// and register for its datagrams.
    pub fn bind(
        host: Arc<dyn TransportHost>,
        config: &EndpointConfig,
        resolver: Arc<dyn CandidateResolver>,
        sink: InboundSink,
    ) -> Result<Arc<Self>, TransportError> {
        let socket = create_with_scan(host.as_ref(), config)?;
        let address = socket.local_addr()?;
        let counters = Arc::new(ByteCounters::default());

        host.start_listening(
            socket.clone(),
            Arc::new(InboundPath {
                counters: counters.clone(),
                sink,
            }),
        );

        Ok(Arc::new_cyclic(|this| Self {
            host,
            socket,
            address,
            resolver,
            counters,
            queue: Mutex::new(SendQueue::default()),
            retry_delay: config.sendqueue_retry_delay,
            this: this.clone(),
        }))
    }

    /// Datagrams waiting for send-buffer space.
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    fn process_send_queue(&self) {
        let drained = self
            .queue
            .lock()
            .drain(&self.counters, |data, address| self.socket.send_to(data, address));
        if !drained {
            self.schedule_retry();
        }
    }

    fn schedule_retry(&self) {
        let this = self.this.clone();
        self.host.schedule(
            Box::new(move || {
                if let Some(endpoint) = this.upgrade() {
                    endpoint.process_send_queue();
                }
            }),
            self.retry_delay,
        );
    }
}

impl Endpoint for HostEndpoint {
    fn address(&self) -> SocketAddr {
        self.address
    }

    fn send(&self, candidates: &[Candidate], packets: &[Vec<u8>]) -> bool {
        if candidates.is_empty() || packets.is_empty() {
            return false;
        }

        let mut first_block = false;
        {
            let mut queue = self.queue.lock();
            for candidate in candidates {
                let Some(address) = resolve(self.resolver.as_ref(), candidate) else {
                    continue;
                };
                for packet in packets {
                    let data = tunnel::frame(packet, candidate.is_tunneled());
                    match queue.offer(data, address, packet.len(), &self.counters, |data, address| {
                        self.socket.send_to(data, address)
                    }) {
                        Offer::Sent | Offer::Queued { first: false } => {}
                        Offer::Queued { first: true } => {
                            first_block = true;
                            tracing::warn!("Send queue overflowing, first retry scheduled");
                        }
                        Offer::Failed(e) => {
                            tracing::warn!(%address, error = %e, "Send failed, datagram dropped");
                        }
                    }
                }
            }
        }

        if first_block {
            self.schedule_retry();
        }
        true
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

fn create_with_scan(
    host: &dyn TransportHost,
    config: &EndpointConfig,
) -> Result<Arc<dyn HostSocket>, TransportError> {
    let mut last_error = None;
    for offset in 0..config.port_scan_limit {
        let Some(port) = config.port.checked_add(offset) else {
            break;
        };
        match host.create_udp_socket(port, config.bind_ip) {
            Ok(socket) => {
                tracing::info!(port, "Listening through host");
                return Ok(socket);
            }
            Err(e) => {
                tracing::debug!(port, error = %e, "Host bind failed, trying next port");
                last_error = Some(e);
            }
        }
    }

    Err(TransportError::Bind {
        ip: config.bind_ip,
        first_port: config.port,
        attempts: config.port_scan_limit,
        reason: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}
