//! Host-integrated endpoint: send queue ordering, accounting and framing

use assert_matches::assert_matches;
use murmur_core::{Candidate, EndpointConfig};
use murmur_testkit::{candidate, tunneled_candidate, ManualScheduler, MockHost, OpenResolver};
use murmur_transport::{
    inbound_channel, Endpoint, HostEndpoint, InboundReceiver, TransportError, TUNNEL_PREFIX,
};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    scheduler: Arc<ManualScheduler>,
    host: Arc<MockHost>,
    endpoint: Arc<HostEndpoint>,
    inbound: InboundReceiver,
}

fn config() -> EndpointConfig {
    EndpointConfig {
        bind_ip: "127.0.0.1".parse().unwrap(),
        port: 6421,
        port_scan_limit: 10,
        ..EndpointConfig::default()
    }
}

fn harness() -> Harness {
    murmur_testkit::init_test_tracing();
    let scheduler = Arc::new(ManualScheduler::new());
    let host = Arc::new(MockHost::new(scheduler.clone()));
    let (sink, inbound) = inbound_channel(8);
    let endpoint = HostEndpoint::bind(host.clone(), &config(), Arc::new(OpenResolver), sink).unwrap();
    Harness {
        scheduler,
        host,
        endpoint,
        inbound,
    }
}

fn numbered(count: u8) -> Vec<Vec<u8>> {
    (1..=count).map(|n| vec![n; 10]).collect()
}

#[test]
fn test_backpressure_keeps_order() {
    let h = harness();
    let socket = h.host.socket();
    let packets = numbered(4);
    socket.fail_once(packets[1].clone(), ErrorKind::WouldBlock);
    socket.fail_once(packets[3].clone(), ErrorKind::WouldBlock);

    assert!(h.endpoint.send(&[candidate(2)], &packets));
    assert_eq!(socket.sent_payloads(), packets[..1].to_vec());
    assert_eq!(h.endpoint.queued(), 3);
    assert_eq!(h.endpoint.total_up(), 10);

    // First retry sends #2 and #3, then #4 blocks again and goes back to the head
    h.scheduler.advance(Duration::from_millis(100));
    assert_eq!(socket.sent_payloads(), packets[..3].to_vec());
    assert_eq!(h.endpoint.queued(), 1);

    h.scheduler.advance(Duration::from_millis(100));
    assert_eq!(socket.sent_payloads(), packets);
    assert_eq!(h.endpoint.queued(), 0);
    assert_eq!(h.endpoint.total_up(), 40);
    assert_eq!(h.scheduler.pending(), 0);
}

#[test]
fn test_later_sends_queue_behind_blocked_ones() {
    let h = harness();
    let socket = h.host.socket();
    let first = numbered(2);
    socket.fail_once(first[0].clone(), ErrorKind::WouldBlock);

    assert!(h.endpoint.send(&[candidate(2)], &first));
    // Socket would accept this one, but it must not overtake the queue
    assert!(h.endpoint.send(&[candidate(3)], &[vec![9; 10]]));
    assert!(socket.sent().is_empty());
    assert_eq!(h.endpoint.queued(), 3);

    h.scheduler.advance(Duration::from_millis(100));
    let sent = socket.sent();
    assert_eq!(
        sent.iter().map(|(_, data)| data[0]).collect::<Vec<_>>(),
        vec![1, 2, 9]
    );
    assert_eq!(sent[2].0, candidate(3).wan_address());
}

#[test]
fn test_hard_send_error_drops_only_that_datagram() {
    let h = harness();
    let socket = h.host.socket();
    let packets = numbered(3);
    socket.fail_once(packets[1].clone(), ErrorKind::ConnectionRefused);

    assert!(h.endpoint.send(&[candidate(2)], &packets));
    assert_eq!(socket.sent_payloads(), vec![packets[0].clone(), packets[2].clone()]);
    assert_eq!(h.endpoint.queued(), 0);
    assert_eq!(h.endpoint.total_up(), 20);
}

#[test]
fn test_counts_every_packet_to_every_candidate() {
    let h = harness();
    let packets = vec![vec![0xAA; 100], vec![0xBB; 100]];
    let candidates = [candidate(2), candidate(3), tunneled_candidate(4)];

    assert!(h.endpoint.send(&candidates, &packets));
    assert_eq!(h.endpoint.total_up(), 600);
    assert_eq!(h.host.socket().sent().len(), 6);
}

#[test]
fn test_nothing_to_send() {
    let h = harness();
    assert!(!h.endpoint.send(&[], &numbered(1)));
    assert!(!h.endpoint.send(&[candidate(2)], &[]));
    assert_eq!(h.endpoint.total_up(), 0);
}

#[test]
fn test_invalid_address_is_skipped() {
    let h = harness();
    let unroutable = Candidate::new(SocketAddr::from(([10, 0, 0, 5], 0)), false);

    assert!(h.endpoint.send(&[unroutable, candidate(2)], &numbered(1)));
    let sent = h.host.socket().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, candidate(2).wan_address());
    assert_eq!(h.endpoint.total_up(), 10);
}

#[test]
fn test_tunneled_candidates_are_framed() {
    let h = harness();
    assert!(h
        .endpoint
        .send(&[tunneled_candidate(2), candidate(3)], &[b"hello".to_vec()]));

    let sent = h.host.socket().sent();
    assert_eq!(&sent[0].1[..4], &TUNNEL_PREFIX);
    assert_eq!(&sent[0].1[4..], b"hello");
    assert_eq!(sent[1].1, b"hello".to_vec());
    // Framing is not counted
    assert_eq!(h.endpoint.total_up(), 10);
}

#[test]
fn test_receive_counts_and_strips() {
    let mut h = harness();
    let from: SocketAddr = "10.0.0.9:6421".parse().unwrap();
    let mut tunneled = TUNNEL_PREFIX.to_vec();
    tunneled.extend_from_slice(&[7; 146]);

    h.host
        .inject(vec![(from, vec![1; 150]), (from, tunneled), (from, vec![2; 150])]);

    assert_eq!(h.endpoint.total_down(), 450);
    let batch = h.inbound.try_recv().unwrap();
    assert_eq!(batch.len(), 3);
    assert!(!batch.packets[0].0.is_tunneled());
    assert!(batch.packets[1].0.is_tunneled());
    assert_eq!(batch.packets[1].1, vec![7; 146]);
    assert_eq!(batch.packets[2].0.wan_address(), from);
}

#[test]
fn test_inbound_overflow_is_counted() {
    let mut h = harness();
    let from: SocketAddr = "10.0.0.9:6421".parse().unwrap();

    // The harness channel holds eight batches
    for _ in 0..8 {
        h.host.inject(vec![(from, vec![1; 10])]);
    }
    h.host.inject(vec![(from, vec![2; 10]), (from, vec![3; 10])]);

    assert_eq!(h.endpoint.total_down(), 100);
    assert_eq!(h.endpoint.total_dropped(), 2);

    let mut delivered = 0;
    while let Ok(batch) = h.inbound.try_recv() {
        assert_eq!(batch.packets, vec![(Candidate::new(from, false), vec![1; 10])]);
        delivered += 1;
    }
    assert_eq!(delivered, 8);
}

#[test]
fn test_bind_scans_past_taken_ports() {
    let scheduler = Arc::new(ManualScheduler::new());
    let host = Arc::new(MockHost::new(scheduler));
    host.take_port(6421);
    host.take_port(6422);
    let (sink, _inbound) = inbound_channel(1);

    let endpoint = HostEndpoint::bind(host, &config(), Arc::new(OpenResolver), sink).unwrap();
    assert_eq!(endpoint.address().port(), 6423);
}

#[test]
fn test_bind_gives_up_after_scan_limit() {
    let scheduler = Arc::new(ManualScheduler::new());
    let host = Arc::new(MockHost::new(scheduler));
    for port in 6421..6431 {
        host.take_port(port);
    }
    let (sink, _inbound) = inbound_channel(1);

    assert_matches!(
        HostEndpoint::bind(host, &config(), Arc::new(OpenResolver), sink),
        Err(TransportError::Bind { first_port: 6421, attempts: 10, .. })
    );
}

#[test]
fn test_retry_after_endpoint_dropped_is_harmless() {
    let h = harness();
    let socket = h.host.socket();
    let packets = numbered(1);
    socket.fail_once(packets[0].clone(), ErrorKind::WouldBlock);
    assert!(h.endpoint.send(&[candidate(2)], &packets));

    drop(h.endpoint);
    assert_eq!(h.scheduler.advance(Duration::from_millis(100)), 1);
    assert!(socket.sent().is_empty());
}
