//! Endpoint owning its own UDP socket

use super::{resolve, Endpoint};
use crate::counters::ByteCounters;
use crate::error::TransportError;
use crate::inbound::{InboundBatch, InboundSink};
use crate::send_queue::{Offer, SendQueue};
use crate::tunnel;
use murmur_core::effects::CandidateResolver;
use murmur_core::{Candidate, EndpointConfig};
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

enum ReceiveState {
    Idle,
    Running(JoinHandle<()>),
    Stopped,
}

/// UDP endpoint with a dedicated receive task.
///
/// The receive task drains every datagram available per wake and hands the
/// batch to the processing side through the inbound channel. Sends are
/// non-blocking writes from the caller's thread; when the kernel buffer is
/// full they queue in order and a flush task drains them once the socket is
/// writable again.
pub struct DirectEndpoint {
    socket: Arc<UdpSocket>,
    address: SocketAddr,
    config: EndpointConfig,
    resolver: Arc<dyn CandidateResolver>,
    counters: Arc<ByteCounters>,
    queue: Arc<Mutex<SendQueue>>,
    runtime: Handle,
    sink: InboundSink,
    shutdown: watch::Sender<bool>,
    state: Mutex<ReceiveState>,
}

impl DirectEndpoint {
    /// Bind a socket, scanning upward from `config.port` until a port is free.
    ///
    /// Must be called within a tokio runtime.
    pub fn bind(
        config: EndpointConfig,
        resolver: Arc<dyn CandidateResolver>,
        sink: InboundSink,
    ) -> Result<Self, TransportError> {
        let runtime = Handle::current();
        let socket = UdpSocket::from_std(bind_with_scan(&config)?)?;
        let address = socket.local_addr()?;
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            socket: Arc::new(socket),
            address,
            config,
            resolver,
            counters: Arc::new(ByteCounters::default()),
            queue: Arc::new(Mutex::new(SendQueue::default())),
            runtime,
            sink,
            shutdown,
            state: Mutex::new(ReceiveState::Idle),
        })
    }

    /// Spawn the receive task.
    pub fn start(&self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if !matches!(*state, ReceiveState::Idle) {
            return Err(TransportError::AlreadyStarted);
        }
        let task = tokio::spawn(receive_loop(
            self.socket.clone(),
            self.counters.clone(),
            self.sink.clone(),
            self.config.max_datagram_size,
            self.shutdown.subscribe(),
        ));
        *state = ReceiveState::Running(task);
        tracing::debug!(address = %self.address, "Receive task started");
        Ok(())
    }

    /// Signal the receive task to stop and wait for it.
    pub async fn stop(&self) -> Result<(), TransportError> {
        let previous = std::mem::replace(&mut *self.state.lock(), ReceiveState::Stopped);
        let ReceiveState::Running(task) = previous else {
            return Ok(());
        };
        let _ = self.shutdown.send(true);
        task.await.map_err(|e| TransportError::ReceiveTask {
            reason: e.to_string(),
        })?;
        tracing::debug!(address = %self.address, "Receive task stopped");
        Ok(())
    }

    /// Datagrams waiting for send-buffer space.
    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    fn spawn_flush(&self) {
        self.runtime.spawn(flush_send_queue(
            self.socket.clone(),
            self.queue.clone(),
            self.counters.clone(),
        ));
    }
}

impl Endpoint for DirectEndpoint {
    fn address(&self) -> SocketAddr {
        self.address
    }

    fn send(&self, candidates: &[Candidate], packets: &[Vec<u8>]) -> bool {
        if candidates.is_empty() || packets.is_empty() {
            return false;
        }

        let mut ok = true;
        let mut first_block = false;
        {
            let mut queue = self.queue.lock();
            'candidates: for candidate in candidates {
                let Some(address) = resolve(self.resolver.as_ref(), candidate) else {
                    continue;
                };
                for packet in packets {
                    let data = tunnel::frame(packet, candidate.is_tunneled());
                    match queue.offer(data, address, packet.len(), &self.counters, |data, address| {
                        self.socket.try_send_to(data, address)
                    }) {
                        Offer::Sent | Offer::Queued { first: false } => {}
                        Offer::Queued { first: true } => {
                            first_block = true;
                            tracing::debug!(%address, "Send buffer full, queueing");
                        }
                        Offer::Failed(e) => {
                            tracing::warn!(%address, error = %e, "Send failed");
                            ok = false;
                            if self.config.abort_on_send_error {
                                break 'candidates;
                            }
                        }
                    }
                }
            }
        }

        if first_block {
            self.spawn_flush();
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

fn bind_with_scan(config: &EndpointConfig) -> Result<std::net::UdpSocket, TransportError> {
    // Port 0 asks the kernel for any free port; scanning is pointless
    let attempts = if config.port == 0 {
        1
    } else {
        config.port_scan_limit
    };

    let mut last_error = None;
    for offset in 0..attempts {
        let Some(port) = config.port.checked_add(offset) else {
            break;
        };
        let address = SocketAddr::new(config.bind_ip, port);
        match bind_once(address, config.receive_buffer_size) {
            Ok(socket) => {
                tracing::info!(%address, "Listening");
                return Ok(socket);
            }
            Err(e) => {
                tracing::debug!(%address, error = %e, "Bind failed, trying next port");
                last_error = Some(e);
            }
        }
    }

    Err(TransportError::Bind {
        ip: config.bind_ip,
        first_port: config.port,
        attempts,
        reason: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

fn bind_once(address: SocketAddr, receive_buffer_size: usize) -> io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::for_address(address), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_recv_buffer_size(receive_buffer_size)?;
    socket.set_nonblocking(true)?;
    socket.bind(&address.into())?;
    Ok(socket.into())
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    counters: Arc<ByteCounters>,
    sink: InboundSink,
    max_datagram_size: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut buffer = vec![0u8; max_datagram_size];
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            ready = socket.readable() => {
                if let Err(e) = ready {
                    tracing::warn!(error = %e, "Socket no longer readable");
                    break;
                }
                let datagrams = drain(&socket, &mut buffer);
                if datagrams.is_empty() {
                    continue;
                }
                let batch = InboundBatch::from_datagrams(datagrams, &counters);
                if !sink.deliver(batch, &counters).await {
                    break;
                }
            }
        }
    }
}

/// Drain the send queue whenever the socket reports it is writable.
async fn flush_send_queue(
    socket: Arc<UdpSocket>,
    queue: Arc<Mutex<SendQueue>>,
    counters: Arc<ByteCounters>,
) {
    loop {
        if let Err(e) = socket.writable().await {
            let dropped = queue.lock().clear();
            tracing::warn!(error = %e, dropped, "Socket no longer writable, send queue discarded");
            return;
        }
        let drained = queue
            .lock()
            .drain(&counters, |data, address| socket.try_send_to(data, address));
        if drained {
            return;
        }
    }
}

/// Read until the socket would block.
fn drain(socket: &UdpSocket, buffer: &mut [u8]) -> Vec<(SocketAddr, Vec<u8>)> {
    let mut datagrams = Vec::new();
    loop {
        match socket.try_recv_from(buffer) {
            Ok((len, from)) => datagrams.push((from, buffer[..len].to_vec())),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => {
                tracing::debug!(error = %e, "Receive error");
                break;
            }
        }
    }
    datagrams
}
