//! Tunnel endpoint and the discard placeholder

use murmur_testkit::{candidate, tunneled_candidate, OpenResolver, RecordingTunnel};
use murmur_transport::{
    inbound_channel, DiscardEndpoint, Endpoint, TunnelEndpoint, TUNNEL_SESSION,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[test]
fn test_sends_unframed_in_reserved_session() {
    let tunnel = Arc::new(RecordingTunnel::new(7759));
    let (sink, _inbound) = inbound_channel(4);
    let endpoint = TunnelEndpoint::new(tunnel.clone(), Arc::new(OpenResolver), sink);

    assert_eq!(endpoint.address(), "0.0.0.0:7759".parse::<SocketAddr>().unwrap());
    assert!(endpoint.send(
        &[candidate(2), tunneled_candidate(3)],
        &[vec![1; 100], vec![2; 100]]
    ));

    let sent = tunnel.sent();
    assert_eq!(sent.len(), 4);
    assert!(sent.iter().all(|(session, _, data)| *session == TUNNEL_SESSION && data.len() == 100));
    assert_eq!(sent[0].1, candidate(2).wan_address());
    assert_eq!(endpoint.total_up(), 400);
}

#[test]
fn test_failed_tunnel_send_reports_false() {
    let tunnel = Arc::new(RecordingTunnel::new(7759));
    let (sink, _inbound) = inbound_channel(4);
    let endpoint = TunnelEndpoint::new(tunnel.clone(), Arc::new(OpenResolver), sink);
    tunnel.fail();

    assert!(!endpoint.send(&[candidate(2)], &[vec![1; 10]]));
    assert_eq!(endpoint.total_up(), 0);
}

#[test]
fn test_inbound_is_always_tunneled() {
    let tunnel = Arc::new(RecordingTunnel::new(7759));
    let (sink, mut inbound) = inbound_channel(4);
    let endpoint = TunnelEndpoint::new(tunnel, Arc::new(OpenResolver), sink);
    let from: SocketAddr = "10.0.0.9:7759".parse().unwrap();

    endpoint.data_came_in(TUNNEL_SESSION, from, vec![5; 120]);
    endpoint.data_came_in(42, from, vec![6; 80]);

    assert_eq!(endpoint.total_down(), 120);
    let batch = inbound.try_recv().unwrap();
    assert_eq!(batch.packets.len(), 1);
    assert!(batch.packets[0].0.is_tunneled());
    assert_eq!(batch.packets[0].0.wan_address(), from);
    assert!(inbound.try_recv().is_err());
}

#[test]
fn test_discard_endpoint_never_counts() {
    let endpoint = DiscardEndpoint;
    assert!(endpoint.send(&[candidate(2), candidate(3)], &[vec![1; 100]]));
    assert_eq!(endpoint.total_up(), 0);
    assert_eq!(endpoint.total_down(), 0);
}
