//! Scripted host sockets and tunnels

use crate::scheduler::ManualScheduler;
use murmur_core::effects::{Scheduler, Task};
use murmur_transport::{DatagramReceiver, HostSocket, TransportHost, TunnelTransport};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Socket that records sends and fails chosen datagrams on demand.
pub struct ScriptedSocket {
    address: SocketAddr,
    sent: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
    failures: Mutex<Vec<(Vec<u8>, io::ErrorKind)>>,
}

impl ScriptedSocket {
    /// Socket bound at `address`.
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            sent: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next attempt to send exactly `data` with `kind`.
    pub fn fail_once(&self, data: impl Into<Vec<u8>>, kind: io::ErrorKind) {
        self.failures.lock().push((data.into(), kind));
    }

    /// Datagrams transmitted so far, in order.
    pub fn sent(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        self.sent.lock().clone()
    }

    /// Payloads transmitted so far, in order.
    pub fn sent_payloads(&self) -> Vec<Vec<u8>> {
        self.sent.lock().iter().map(|(_, data)| data.clone()).collect()
    }
}

impl HostSocket for ScriptedSocket {
    fn send_to(&self, data: &[u8], address: SocketAddr) -> io::Result<usize> {
        {
            let mut failures = self.failures.lock();
            if let Some(index) = failures.iter().position(|(scripted, _)| scripted == data) {
                let (_, kind) = failures.remove(index);
                return Err(io::Error::new(kind, "scripted failure"));
            }
        }
        self.sent.lock().push((address, data.to_vec()));
        Ok(data.len())
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.address)
    }
}

/// Host whose sockets are [`ScriptedSocket`]s and whose timer is a
/// [`ManualScheduler`].
pub struct MockHost {
    scheduler: Arc<ManualScheduler>,
    taken_ports: Mutex<HashSet<u16>>,
    socket: Mutex<Option<Arc<ScriptedSocket>>>,
    receiver: Mutex<Option<Arc<dyn DatagramReceiver>>>,
}

impl MockHost {
    /// Host scheduling deferred work on `scheduler`.
    pub fn new(scheduler: Arc<ManualScheduler>) -> Self {
        Self {
            scheduler,
            taken_ports: Mutex::new(HashSet::new()),
            socket: Mutex::new(None),
            receiver: Mutex::new(None),
        }
    }

    /// Make socket creation on `port` fail as if it were in use.
    pub fn take_port(&self, port: u16) {
        self.taken_ports.lock().insert(port);
    }

    /// Most recently created socket.
    pub fn socket(&self) -> Arc<ScriptedSocket> {
        self.socket.lock().clone().expect("no socket created yet")
    }

    /// Hand `datagrams` to the registered receiver as the host would.
    pub fn inject(&self, datagrams: Vec<(SocketAddr, Vec<u8>)>) {
        let receiver = self.receiver.lock().clone().expect("nothing listening");
        receiver.data_came_in(datagrams);
    }
}

impl TransportHost for MockHost {
    fn create_udp_socket(&self, port: u16, address: IpAddr) -> io::Result<Arc<dyn HostSocket>> {
        if self.taken_ports.lock().contains(&port) {
            return Err(io::Error::new(io::ErrorKind::AddrInUse, "port taken"));
        }
        let socket = Arc::new(ScriptedSocket::new(SocketAddr::new(address, port)));
        *self.socket.lock() = Some(socket.clone());
        Ok(socket)
    }

    fn start_listening(&self, _socket: Arc<dyn HostSocket>, receiver: Arc<dyn DatagramReceiver>) {
        *self.receiver.lock() = Some(receiver);
    }

    fn schedule(&self, task: Task, delay: Duration) {
        self.scheduler.register_delayed(task, delay);
    }
}

/// Tunnel recording everything sent through it.
pub struct RecordingTunnel {
    port: u16,
    sent: Mutex<Vec<(u32, SocketAddr, Vec<u8>)>>,
    failing: AtomicBool,
}

impl RecordingTunnel {
    /// Tunnel listening on `port`.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            sent: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every later send fail.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Session, address and data of each send, in order.
    pub fn sent(&self) -> Vec<(u32, SocketAddr, Vec<u8>)> {
        self.sent.lock().clone()
    }
}

impl TunnelTransport for RecordingTunnel {
    fn send_tunnel(&self, session: u32, address: SocketAddr, data: &[u8]) -> io::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "tunnel closed"));
        }
        self.sent.lock().push((session, address, data.to_vec()));
        Ok(())
    }

    fn listen_port(&self) -> u16 {
        self.port
    }
}
